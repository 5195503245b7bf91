//! Warehouses: a named root over a view location.

use std::collections::HashMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use wareflow_core::{CompanyId, Entity, LocationId, WarehouseId};

/// A warehouse. `view_location_id` is the root of its location subtree;
/// warehouse-scoped stock queries run over that subtree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warehouse {
    pub id: WarehouseId,
    pub company_id: CompanyId,
    pub name: String,
    pub code: String,
    pub view_location_id: LocationId,
}

impl Warehouse {
    pub fn new(
        company_id: CompanyId,
        name: impl Into<String>,
        code: impl Into<String>,
        view_location_id: LocationId,
    ) -> Self {
        Self {
            id: WarehouseId::new(),
            company_id,
            name: name.into(),
            code: code.into(),
            view_location_id,
        }
    }
}

impl Entity for Warehouse {
    type Id = WarehouseId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Read side of the warehouse store.
pub trait WarehouseSearch: Send + Sync {
    /// View locations of the given warehouses, in input order, skipping
    /// unknown ids.
    fn view_locations_of(&self, warehouses: &[WarehouseId]) -> Vec<LocationId>;
}

/// In-memory warehouse store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryWarehouseStore {
    inner: RwLock<HashMap<WarehouseId, Warehouse>>,
}

impl InMemoryWarehouseStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, warehouse: Warehouse) -> WarehouseId {
        let id = *warehouse.id();
        if let Ok(mut map) = self.inner.write() {
            map.insert(id, warehouse);
        }
        id
    }
}

impl WarehouseSearch for InMemoryWarehouseStore {
    fn view_locations_of(&self, warehouses: &[WarehouseId]) -> Vec<LocationId> {
        let map = match self.inner.read() {
            Ok(map) => map,
            Err(_) => return Vec::new(),
        };
        warehouses
            .iter()
            .filter_map(|id| map.get(id))
            .map(|warehouse| warehouse.view_location_id)
            .collect()
    }
}
