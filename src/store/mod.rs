//! JSON persistence of the apartment registry.
//!
//! The document is `{"apartments": {"<id>": {<record>}}}`. Loading is
//! lenient: a record that does not parse is logged and skipped so one bad
//! entry never takes the others down with it. Saving writes a temp file,
//! fsyncs it and renames it over the target.

use crate::apartment::Apartment;
use crate::registry::ApartmentRegistry;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};


#[derive(Deserialize)]
struct RawDocument {
    #[serde(default)]
    apartments: BTreeMap<String, Value>,
}

#[derive(Serialize)]
struct Document<'a> {
    apartments: BTreeMap<&'a str, &'a Apartment>,
}

pub struct ApartmentStore {
    path: PathBuf,
}

impl ApartmentStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every valid record. A missing file is an empty registry.
    pub fn load(&self) -> Result<Vec<Apartment>> {
        if !self.path.exists() {
            info!(path = %self.path.display(), "No apartment data found, starting empty");
            return Ok(Vec::new());
        }

        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        let apartments = parse(&contents)
            .with_context(|| format!("Failed to parse {}", self.path.display()))?;

        info!(
            path = %self.path.display(),
            count = apartments.len(),
            "Loaded apartments"
        );
        Ok(apartments)
    }

    /// Write all records atomically
    pub fn save(&self, apartments: &[Apartment]) -> Result<()> {
        let document = Document {
            apartments: apartments.iter().map(|a| (a.id.as_str(), a)).collect(),
        };
        let json = serde_json::to_string_pretty(&document)
            .context("Failed to serialize apartments to JSON")?;

        let tmp_path = self.path.with_extension("tmp");
        {
            let mut tmp_file = File::create(&tmp_path)
                .with_context(|| format!("Failed to create {}", tmp_path.display()))?;
            tmp_file
                .write_all(json.as_bytes())
                .context("Failed to write apartment data")?;
            tmp_file
                .sync_all()
                .context("Failed to sync apartment data to disk")?;
        }

        fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("Failed to rename {} into place", tmp_path.display()))?;

        debug!(path = %self.path.display(), count = apartments.len(), "Saved apartments");
        Ok(())
    }

    /// Save the registry if anything changed since the last flush.
    ///
    /// Returns whether a write happened. On failure the registry stays dirty
    /// so the next flush retries.
    pub fn flush(&self, registry: &ApartmentRegistry) -> Result<bool> {
        if !registry.take_dirty() {
            return Ok(false);
        }

        if let Err(e) = self.save(&registry.all()) {
            registry.mark_dirty();
            return Err(e);
        }
        Ok(true)
    }
}

/// Parse a document, skipping records that fail to deserialize
pub fn parse(contents: &str) -> Result<Vec<Apartment>> {
    let document: RawDocument = serde_json::from_str(contents)?;
    let mut apartments = Vec::with_capacity(document.apartments.len());

    for (id, raw) in document.apartments {
        let mut apartment: Apartment = match serde_json::from_value(raw) {
            Ok(apartment) => apartment,
            Err(e) => {
                warn!(apartment_id = %id, error = %e, "Skipping malformed apartment record");
                continue;
            }
        };
        apartment.id = id;

        if apartment.normalize() {
            warn!(
                apartment_id = %apartment.id,
                "Unowned apartment carried invoices or income, cleared"
            );
        }
        apartments.push(apartment);
    }

    Ok(apartments)
}
