//! Quants: stock on hand per product/location, with grouped summation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use wareflow_core::{
    CompanyId, DomainError, DomainResult, Entity, LocationId, LotId, OwnerId, PackageId,
    ProductId, QuantId,
};
use wareflow_domain::{Expr, FieldValue, Record};

use crate::location::LocationSearch;

/// A quantity of a product held at a location, optionally split by lot,
/// owner and package. Reflects current state only; history lives in moves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quant {
    pub id: QuantId,
    pub company_id: CompanyId,
    pub product_id: ProductId,
    pub location_id: LocationId,
    pub lot_id: Option<LotId>,
    pub owner_id: Option<OwnerId>,
    pub package_id: Option<PackageId>,
    pub quantity: Decimal,
    pub reserved_quantity: Decimal,
}

impl Quant {
    pub fn new(
        company_id: CompanyId,
        product_id: ProductId,
        location_id: LocationId,
        quantity: Decimal,
    ) -> Self {
        Self {
            id: QuantId::new(),
            company_id,
            product_id,
            location_id,
            lot_id: None,
            owner_id: None,
            package_id: None,
            quantity,
            reserved_quantity: Decimal::ZERO,
        }
    }

    pub fn with_lot(mut self, lot_id: LotId) -> Self {
        self.lot_id = Some(lot_id);
        self
    }

    pub fn with_owner(mut self, owner_id: OwnerId) -> Self {
        self.owner_id = Some(owner_id);
        self
    }

    pub fn with_package(mut self, package_id: PackageId) -> Self {
        self.package_id = Some(package_id);
        self
    }
}

impl Entity for Quant {
    type Id = QuantId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

fn optional_id<T: Into<Uuid> + Copy>(value: Option<T>) -> FieldValue {
    match value {
        Some(id) => FieldValue::Id(id.into()),
        None => FieldValue::Nothing,
    }
}

/// A quant joined with its location for dotted-field evaluation
/// (`location_id.usage`, `location_id.company_id`, ...).
struct QuantView<'a> {
    quant: &'a Quant,
    locations: &'a dyn LocationSearch,
}

impl Record for QuantView<'_> {
    fn field(&self, name: &str) -> Option<FieldValue> {
        if let Some(suffix) = name.strip_prefix("location_id.") {
            return match self.locations.get(self.quant.location_id) {
                Some(location) => location.field(suffix),
                // Dangling relation: treated as unset, matches nothing.
                None => Some(FieldValue::Nothing),
            };
        }
        match name {
            "id" => Some(FieldValue::Id(*self.quant.id.as_uuid())),
            "company_id" => Some(FieldValue::Id(*self.quant.company_id.as_uuid())),
            "product_id" => Some(FieldValue::Id(*self.quant.product_id.as_uuid())),
            "location_id" => Some(FieldValue::Id(*self.quant.location_id.as_uuid())),
            "lot_id" => Some(optional_id(self.quant.lot_id)),
            "owner_id" => Some(optional_id(self.quant.owner_id)),
            "package_id" => Some(optional_id(self.quant.package_id)),
            _ => None,
        }
    }
}

/// Grouped quant summation (the host's `read_group` facility).
pub trait QuantAggregation: Send + Sync {
    /// Sum of `quantity` grouped by product over quants matching `expr`.
    /// Products without matching quants are absent from the result.
    fn group_quantity_by_product(&self, expr: &Expr) -> DomainResult<HashMap<ProductId, Decimal>>;
}

/// In-memory quant store for tests/dev.
pub struct InMemoryQuantStore {
    inner: RwLock<HashMap<QuantId, Quant>>,
    locations: Arc<dyn LocationSearch>,
}

impl InMemoryQuantStore {
    pub fn new(locations: Arc<dyn LocationSearch>) -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
            locations,
        }
    }

    pub fn insert(&self, quant: Quant) -> QuantId {
        let id = *quant.id();
        if let Ok(mut map) = self.inner.write() {
            map.insert(id, quant);
        }
        id
    }
}

impl QuantAggregation for InMemoryQuantStore {
    fn group_quantity_by_product(&self, expr: &Expr) -> DomainResult<HashMap<ProductId, Decimal>> {
        let expanded =
            expr.expand_child_of(&|roots: &[Uuid]| self.locations.descendants_of(roots))?;
        let map = self
            .inner
            .read()
            .map_err(|_| DomainError::configuration("quant store lock poisoned"))?;
        let mut grouped: HashMap<ProductId, Decimal> = HashMap::new();
        for quant in map.values() {
            let view = QuantView {
                quant,
                locations: self.locations.as_ref(),
            };
            if expanded.matches(&view)? {
                *grouped.entry(quant.product_id).or_default() += quant.quantity;
            }
        }
        Ok(grouped)
    }
}
