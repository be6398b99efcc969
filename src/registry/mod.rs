// Apartment registry: the single source of truth for apartment records

use crate::apartment::Apartment;
use crate::error::EconomyError;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::info;
use uuid::Uuid;

#[cfg(test)]
mod tests;

/// Concurrent apartment store.
///
/// Every read-modify-write goes through [`ApartmentRegistry::modify`], which
/// holds that apartment's own mutex for the whole closure, so at most one
/// mutation per apartment runs at a time. Reads are served from a published
/// copy refreshed at the end of each mutation and never wait on writers.
pub struct ApartmentRegistry {
    /// Per-apartment exclusive sections
    slots: DashMap<String, Arc<Mutex<Apartment>>>,

    /// Last committed copy of each apartment, for lock-free reads
    published: DashMap<String, Apartment>,

    /// Set on every mutation, cleared by the flush cycle
    dirty: AtomicBool,
}

impl ApartmentRegistry {
    pub fn new() -> Self {
        Self {
            slots: DashMap::new(),
            published: DashMap::new(),
            dirty: AtomicBool::new(false),
        }
    }

    /// Replace the registry contents with loaded records (startup)
    pub fn load(&self, apartments: Vec<Apartment>) {
        self.slots.clear();
        self.published.clear();

        for apartment in apartments {
            self.published.insert(apartment.id.clone(), apartment.clone());
            self.slots
                .insert(apartment.id.clone(), Arc::new(Mutex::new(apartment)));
        }

        self.dirty.store(false, Ordering::SeqCst);
        info!(apartments = self.slots.len(), "Loaded apartments into registry");
    }

    /// Admin creation. Fails if the id is taken.
    pub fn insert(&self, apartment: Apartment) -> Result<(), EconomyError> {
        match self.slots.entry(apartment.id.clone()) {
            Entry::Occupied(_) => Err(EconomyError::AlreadyExists(apartment.id)),
            Entry::Vacant(slot) => {
                self.published.insert(apartment.id.clone(), apartment.clone());
                slot.insert(Arc::new(Mutex::new(apartment)));
                self.mark_dirty();
                Ok(())
            }
        }
    }

    /// Admin deletion. Waits for any in-flight mutation of that apartment.
    pub fn remove(&self, id: &str) -> Option<Apartment> {
        let (_, slot) = self.slots.remove(id)?;
        let apartment = slot.lock().unwrap_or_else(PoisonError::into_inner);
        self.published.remove(id);
        self.mark_dirty();
        info!(apartment_id = %id, "Apartment removed");
        Some(apartment.clone())
    }

    /// Run `f` inside the apartment's exclusive section and publish the result.
    ///
    /// Returns None if the apartment does not exist.
    pub fn modify<R>(&self, id: &str, f: impl FnOnce(&mut Apartment) -> R) -> Option<R> {
        // Clone the Arc out so the map shard is not held while `f` runs
        let slot = self.slots.get(id).map(|s| Arc::clone(s.value()))?;
        let mut apartment = slot.lock().unwrap_or_else(PoisonError::into_inner);

        let result = f(&mut apartment);

        // Skip publishing if the apartment was removed while we waited
        let still_registered = self
            .slots
            .get(id)
            .map(|s| Arc::ptr_eq(s.value(), &slot))
            .unwrap_or(false);
        if still_registered {
            self.published.insert(id.to_string(), apartment.clone());
            self.mark_dirty();
        }

        Some(result)
    }

    /// Snapshot of one apartment
    pub fn get(&self, id: &str) -> Option<Apartment> {
        self.published.get(id).map(|a| a.clone())
    }

    /// Snapshot of all apartments
    pub fn all(&self) -> Vec<Apartment> {
        self.published.iter().map(|a| a.value().clone()).collect()
    }

    pub fn ids(&self) -> Vec<String> {
        self.slots.iter().map(|s| s.key().clone()).collect()
    }

    pub fn owned_by(&self, owner: &Uuid) -> Vec<Apartment> {
        self.published
            .iter()
            .filter(|a| a.is_owned_by(owner))
            .map(|a| a.value().clone())
            .collect()
    }

    pub fn count_owned_by(&self, owner: &Uuid) -> usize {
        self.published.iter().filter(|a| a.is_owned_by(owner)).count()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.slots.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Release);
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Clear the dirty flag, returning whether it was set
    pub fn take_dirty(&self) -> bool {
        self.dirty.swap(false, Ordering::AcqRel)
    }
}

impl Default for ApartmentRegistry {
    fn default() -> Self {
        Self::new()
    }
}
