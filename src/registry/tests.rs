use super::*;
use std::thread;

fn apartment(id: &str) -> Apartment {
    Apartment::new(id, "region", "world", 1000.0, 1)
}

#[test]
fn test_insert_and_get() {
    let registry = ApartmentRegistry::new();
    registry.insert(apartment("apt_1")).unwrap();

    let snapshot = registry.get("apt_1").unwrap();
    assert_eq!(snapshot.id, "apt_1");
    assert_eq!(registry.len(), 1);
    assert!(registry.is_dirty());
}

#[test]
fn test_insert_duplicate_fails() {
    let registry = ApartmentRegistry::new();
    registry.insert(apartment("apt_1")).unwrap();

    let result = registry.insert(apartment("apt_1"));
    assert_eq!(result, Err(EconomyError::AlreadyExists("apt_1".to_string())));
}

#[test]
fn test_modify_publishes_snapshot() {
    let registry = ApartmentRegistry::new();
    registry.insert(apartment("apt_1")).unwrap();

    let before = registry.get("apt_1").unwrap();
    let returned = registry.modify("apt_1", |a| {
        a.pending_income = 12.0;
        a.pending_income
    });

    assert_eq!(returned, Some(12.0));
    assert_eq!(before.pending_income, 0.0);
    assert_eq!(registry.get("apt_1").unwrap().pending_income, 12.0);
}

#[test]
fn test_modify_missing_apartment() {
    let registry = ApartmentRegistry::new();
    assert!(registry.modify("nope", |a| a.level).is_none());
    assert!(registry.get("nope").is_none());
}

#[test]
fn test_remove() {
    let registry = ApartmentRegistry::new();
    registry.insert(apartment("apt_1")).unwrap();

    let removed = registry.remove("apt_1").unwrap();
    assert_eq!(removed.id, "apt_1");
    assert!(registry.get("apt_1").is_none());
    assert!(!registry.contains("apt_1"));
    assert!(registry.remove("apt_1").is_none());
}

#[test]
fn test_load_replaces_contents_and_clears_dirty() {
    let registry = ApartmentRegistry::new();
    registry.insert(apartment("old")).unwrap();

    registry.load(vec![apartment("a"), apartment("b")]);

    assert_eq!(registry.len(), 2);
    assert!(registry.get("old").is_none());
    assert!(!registry.is_dirty());
}

#[test]
fn test_take_dirty() {
    let registry = ApartmentRegistry::new();
    assert!(!registry.take_dirty());

    registry.insert(apartment("a")).unwrap();
    assert!(registry.take_dirty());
    assert!(!registry.take_dirty());
}

#[test]
fn test_owned_by() {
    let registry = ApartmentRegistry::new();
    let owner = Uuid::new_v4();
    for id in ["a", "b", "c"] {
        registry.insert(apartment(id)).unwrap();
    }
    registry.modify("a", |a| a.owner = Some(owner));
    registry.modify("c", |a| a.owner = Some(owner));

    let mut owned: Vec<String> = registry.owned_by(&owner).into_iter().map(|a| a.id).collect();
    owned.sort();
    assert_eq!(owned, vec!["a".to_string(), "c".to_string()]);
    assert_eq!(registry.count_owned_by(&owner), 2);
    assert_eq!(registry.count_owned_by(&Uuid::new_v4()), 0);
}

#[test]
fn test_concurrent_read_modify_write_same_apartment() {
    let registry = Arc::new(ApartmentRegistry::new());
    registry.insert(apartment("shared")).unwrap();

    let mut handles = vec![];

    // 8 writers each add 1.0 a hundred times; lost updates would show up as a short total
    for _ in 0..8 {
        let registry = Arc::clone(&registry);
        handles.push(thread::spawn(move || {
            for _ in 0..100 {
                registry.modify("shared", |a| {
                    let current = a.pending_income;
                    thread::yield_now();
                    a.pending_income = current + 1.0;
                });
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(registry.get("shared").unwrap().pending_income, 800.0);
}

#[test]
fn test_concurrent_access_different_apartments() {
    let registry = Arc::new(ApartmentRegistry::new());
    let mut handles = vec![];

    for i in 0..10 {
        let registry = Arc::clone(&registry);
        handles.push(thread::spawn(move || {
            let id = format!("apt_{}", i);
            registry.insert(apartment(&id)).unwrap();
            registry.modify(&id, |a| a.level = 2);
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(registry.len(), 10);
    assert!(registry.all().iter().all(|a| a.level == 2));
}
