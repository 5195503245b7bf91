//! Storage locations: hierarchy, usage kinds, exclusion flag, store.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use wareflow_core::{CompanyId, DomainError, DomainResult, Entity, LocationId};
use wareflow_domain::{Expr, FieldValue, Record};

/// What a location is used for. Only `Internal` and `Transit` locations hold
/// company stock; the rest are counterpart locations for moves.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationUsage {
    Internal,
    Transit,
    View,
    Customer,
    Supplier,
    Inventory,
    Production,
}

impl LocationUsage {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocationUsage::Internal => "internal",
            LocationUsage::Transit => "transit",
            LocationUsage::View => "view",
            LocationUsage::Customer => "customer",
            LocationUsage::Supplier => "supplier",
            LocationUsage::Inventory => "inventory",
            LocationUsage::Production => "production",
        }
    }
}

/// A storage location.
///
/// `parent_path` is the materialized ancestor chain, root first, self last;
/// descendant queries are resolved against it without walking the tree.
///
/// `exclude_from_immediately_usable_qty` marks stock in this location as not
/// immediately sellable (quality hold, quarantine, ...). The flag is per
/// location and is **not** inherited by children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub company_id: CompanyId,
    pub name: String,
    pub usage: LocationUsage,
    pub parent_id: Option<LocationId>,
    pub parent_path: Vec<LocationId>,
    pub exclude_from_immediately_usable_qty: bool,
}

impl Location {
    pub fn new(company_id: CompanyId, name: impl Into<String>, usage: LocationUsage) -> Self {
        let id = LocationId::new();
        Self {
            id,
            company_id,
            name: name.into(),
            usage,
            parent_id: None,
            parent_path: vec![id],
            exclude_from_immediately_usable_qty: false,
        }
    }

    /// Attach under `parent`, rebuilding the materialized path.
    pub fn under(mut self, parent: &Location) -> Self {
        self.parent_id = Some(parent.id);
        self.parent_path = parent.parent_path.clone();
        self.parent_path.push(self.id);
        self
    }

    pub fn excluded_from_immediately_usable_qty(mut self) -> Self {
        self.exclude_from_immediately_usable_qty = true;
        self
    }
}

impl Entity for Location {
    type Id = LocationId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Record for Location {
    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "id" => Some(FieldValue::Id(*self.id.as_uuid())),
            "company_id" => Some(FieldValue::Id(*self.company_id.as_uuid())),
            "usage" => Some(FieldValue::Str(self.usage.as_str().to_string())),
            "parent_id" => Some(match self.parent_id {
                Some(parent) => FieldValue::Id(*parent.as_uuid()),
                None => FieldValue::Nothing,
            }),
            "exclude_from_immediately_usable_qty" => {
                Some(FieldValue::Bool(self.exclude_from_immediately_usable_qty))
            }
            _ => None,
        }
    }
}

/// Read side of the location store.
pub trait LocationSearch: Send + Sync {
    fn get(&self, id: LocationId) -> Option<Location>;

    /// All locations matching `expr`. `child_of` leaves are expanded against
    /// the stored hierarchy before evaluation.
    fn search(&self, expr: &Expr) -> DomainResult<Vec<Location>>;

    /// Ids of the given locations and all their descendants.
    fn descendants_of(&self, roots: &[Uuid]) -> Vec<Uuid>;
}

/// Notified synchronously from the location write path.
pub trait LocationObserver: Send + Sync {
    /// The exclusion flag of `location_id` changed (create with the flag set,
    /// or an update in either direction). Fired after the write is visible.
    fn exclusion_flag_changed(&self, location_id: LocationId, now_excluded: bool);
}

/// In-memory location store for tests/dev.
#[derive(Default)]
pub struct InMemoryLocationStore {
    inner: RwLock<HashMap<LocationId, Location>>,
    observers: RwLock<Vec<Arc<dyn LocationObserver>>>,
}

impl InMemoryLocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_observer(&self, observer: Arc<dyn LocationObserver>) {
        if let Ok(mut observers) = self.observers.write() {
            observers.push(observer);
        }
    }

    /// Create a location. Observers see the flag when it is set on creation.
    pub fn insert(&self, location: Location) -> LocationId {
        let id = *location.id();
        let flagged = location.exclude_from_immediately_usable_qty;
        if let Ok(mut map) = self.inner.write() {
            map.insert(id, location);
        }
        if flagged {
            self.notify(id, true);
        }
        id
    }

    /// Write path for the exclusion flag. Observers are notified on any
    /// actual change, in both directions.
    pub fn set_exclusion_flag(&self, id: LocationId, excluded: bool) -> DomainResult<()> {
        let changed = {
            let mut map = self
                .inner
                .write()
                .map_err(|_| DomainError::configuration("location store lock poisoned"))?;
            let location = map.get_mut(&id).ok_or_else(DomainError::not_found)?;
            let changed = location.exclude_from_immediately_usable_qty != excluded;
            location.exclude_from_immediately_usable_qty = excluded;
            changed
        };
        if changed {
            self.notify(id, excluded);
        }
        Ok(())
    }

    fn notify(&self, id: LocationId, now_excluded: bool) {
        let observers = match self.observers.read() {
            Ok(observers) => observers.clone(),
            Err(_) => return,
        };
        for observer in observers {
            observer.exclusion_flag_changed(id, now_excluded);
        }
    }
}

impl LocationSearch for InMemoryLocationStore {
    fn get(&self, id: LocationId) -> Option<Location> {
        self.inner.read().ok()?.get(&id).cloned()
    }

    fn search(&self, expr: &Expr) -> DomainResult<Vec<Location>> {
        let expanded = expr.expand_child_of(&|roots: &[Uuid]| self.descendants_of(roots))?;
        let map = self
            .inner
            .read()
            .map_err(|_| DomainError::configuration("location store lock poisoned"))?;
        let mut found = Vec::new();
        for location in map.values() {
            if expanded.matches(location)? {
                found.push(location.clone());
            }
        }
        Ok(found)
    }

    fn descendants_of(&self, roots: &[Uuid]) -> Vec<Uuid> {
        let map = match self.inner.read() {
            Ok(map) => map,
            Err(_) => return Vec::new(),
        };
        map.values()
            .filter(|location| {
                location
                    .parent_path
                    .iter()
                    .any(|ancestor| roots.contains(ancestor.as_uuid()))
            })
            .map(|location| *location.id.as_uuid())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn company() -> CompanyId {
        CompanyId::new()
    }

    #[test]
    fn descendants_include_the_roots_themselves() {
        let store = InMemoryLocationStore::new();
        let company = company();
        let root = Location::new(company, "Stock", LocationUsage::View);
        let child = Location::new(company, "Shelf A", LocationUsage::Internal).under(&root);
        let grandchild = Location::new(company, "Bin A1", LocationUsage::Internal).under(&child);
        let unrelated = Location::new(company, "Quality", LocationUsage::Internal);

        let root_id = store.insert(root);
        let child_id = store.insert(child);
        let grandchild_id = store.insert(grandchild);
        store.insert(unrelated);

        let mut ids = store.descendants_of(&[*root_id.as_uuid()]);
        ids.sort();
        let mut expected = vec![
            *root_id.as_uuid(),
            *child_id.as_uuid(),
            *grandchild_id.as_uuid(),
        ];
        expected.sort();
        assert_eq!(ids, expected);
    }

    #[test]
    fn search_expands_child_of_against_the_hierarchy() {
        let store = InMemoryLocationStore::new();
        let company = company();
        let root = Location::new(company, "Stock", LocationUsage::View);
        let child = Location::new(company, "Shelf", LocationUsage::Internal).under(&root);
        let root_id = store.insert(root);
        let child_id = store.insert(child);
        store.insert(Location::new(company, "Elsewhere", LocationUsage::Internal));

        let found = store
            .search(&Expr::child_of("id", vec![*root_id.as_uuid()]))
            .unwrap();
        let mut ids: Vec<LocationId> = found.into_iter().map(|l| l.id).collect();
        ids.sort();
        let mut expected = vec![root_id, child_id];
        expected.sort();
        assert_eq!(ids, expected);
    }

    struct CountingObserver {
        calls: AtomicUsize,
        last_excluded: RwLock<Option<bool>>,
    }

    impl CountingObserver {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                last_excluded: RwLock::new(None),
            }
        }
    }

    impl LocationObserver for CountingObserver {
        fn exclusion_flag_changed(&self, _location_id: LocationId, now_excluded: bool) {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_excluded.write().unwrap() = Some(now_excluded);
        }
    }

    #[test]
    fn flag_writes_notify_in_both_directions_but_only_on_change() {
        let store = InMemoryLocationStore::new();
        let observer = Arc::new(CountingObserver::new());
        store.register_observer(observer.clone());

        let id = store.insert(Location::new(company(), "Hold", LocationUsage::Internal));
        assert_eq!(observer.calls.load(Ordering::SeqCst), 0);

        store.set_exclusion_flag(id, true).unwrap();
        assert_eq!(observer.calls.load(Ordering::SeqCst), 1);
        assert_eq!(*observer.last_excluded.read().unwrap(), Some(true));

        // Same value again: no change, no notification.
        store.set_exclusion_flag(id, true).unwrap();
        assert_eq!(observer.calls.load(Ordering::SeqCst), 1);

        store.set_exclusion_flag(id, false).unwrap();
        assert_eq!(observer.calls.load(Ordering::SeqCst), 2);
        assert_eq!(*observer.last_excluded.read().unwrap(), Some(false));
    }

    #[test]
    fn creating_a_flagged_location_notifies() {
        let store = InMemoryLocationStore::new();
        let observer = Arc::new(CountingObserver::new());
        store.register_observer(observer.clone());

        store.insert(
            Location::new(company(), "Quarantine", LocationUsage::Internal)
                .excluded_from_immediately_usable_qty(),
        );
        assert_eq!(observer.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn flag_write_on_unknown_location_is_not_found() {
        let store = InMemoryLocationStore::new();
        let err = store.set_exclusion_flag(LocationId::new(), true).unwrap_err();
        assert_eq!(err, DomainError::NotFound);
    }
}
