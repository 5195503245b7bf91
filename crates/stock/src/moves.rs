//! Stock moves: dated transfers between locations, with grouped summation
//! over done history and pending flows.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use wareflow_core::{
    CompanyId, DomainError, DomainResult, Entity, LocationId, LotId, MoveId, OwnerId, PackageId,
    ProductId,
};
use wareflow_domain::{Expr, FieldValue, Record};

use crate::location::LocationSearch;

/// Lifecycle state of a move. Only `Done` moves changed stock; `Waiting`,
/// `Confirmed` and `Assigned` moves are pending in/out flows.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveState {
    Draft,
    Waiting,
    Confirmed,
    Assigned,
    Done,
    Cancelled,
}

impl MoveState {
    pub fn is_pending(self) -> bool {
        matches!(
            self,
            MoveState::Waiting | MoveState::Confirmed | MoveState::Assigned
        )
    }
}

/// A movement of `quantity` of a product from `location_id` to
/// `location_dest_id` at `date`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMove {
    pub id: MoveId,
    pub company_id: CompanyId,
    pub product_id: ProductId,
    pub location_id: LocationId,
    pub location_dest_id: LocationId,
    pub quantity: Decimal,
    pub state: MoveState,
    pub date: DateTime<Utc>,
    pub lot_id: Option<LotId>,
    pub owner_id: Option<OwnerId>,
    pub package_id: Option<PackageId>,
}

impl StockMove {
    pub fn new(
        company_id: CompanyId,
        product_id: ProductId,
        location_id: LocationId,
        location_dest_id: LocationId,
        quantity: Decimal,
        state: MoveState,
        date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MoveId::new(),
            company_id,
            product_id,
            location_id,
            location_dest_id,
            quantity,
            state,
            date,
            lot_id: None,
            owner_id: None,
            package_id: None,
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

impl Entity for StockMove {
    type Id = MoveId;

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

/// A move joined with its source/destination locations for dotted-field
/// evaluation (`location_id.usage`, `location_dest_id.usage`, ...).
struct MoveView<'a> {
    stock_move: &'a StockMove,
    locations: &'a dyn LocationSearch,
}

impl MoveView<'_> {
    fn related(&self, location_id: LocationId, suffix: &str) -> Option<FieldValue> {
        match self.locations.get(location_id) {
            Some(location) => location.field(suffix),
            None => Some(FieldValue::Nothing),
        }
    }
}

impl Record for MoveView<'_> {
    fn field(&self, name: &str) -> Option<FieldValue> {
        if let Some(suffix) = name.strip_prefix("location_id.") {
            return self.related(self.stock_move.location_id, suffix);
        }
        if let Some(suffix) = name.strip_prefix("location_dest_id.") {
            return self.related(self.stock_move.location_dest_id, suffix);
        }
        match name {
            "id" => Some(FieldValue::Id(*self.stock_move.id.as_uuid())),
            "company_id" => Some(FieldValue::Id(*self.stock_move.company_id.as_uuid())),
            "product_id" => Some(FieldValue::Id(*self.stock_move.product_id.as_uuid())),
            "location_id" => Some(FieldValue::Id(*self.stock_move.location_id.as_uuid())),
            "location_dest_id" => {
                Some(FieldValue::Id(*self.stock_move.location_dest_id.as_uuid()))
            }
            "lot_id" => Some(optional_id(self.stock_move.lot_id)),
            "owner_id" => Some(optional_id(self.stock_move.owner_id)),
            "package_id" => Some(optional_id(self.stock_move.package_id)),
            _ => None,
        }
    }
}

/// Grouped move summation (the host's move `read_group` facility).
pub trait MoveAggregation: Send + Sync {
    /// Sum of `quantity` grouped by product over `Done` moves strictly after
    /// `cutoff` that match `expr`. Used to reconstruct past stock levels
    /// from the current quant snapshot.
    fn done_quantity_since(
        &self,
        expr: &Expr,
        cutoff: DateTime<Utc>,
    ) -> DomainResult<HashMap<ProductId, Decimal>>;

    /// Sum of `quantity` grouped by product over pending moves matching
    /// `expr`, dated within the inclusive `[from, to]` window (either bound
    /// optional).
    fn pending_quantity_between(
        &self,
        expr: &Expr,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> DomainResult<HashMap<ProductId, Decimal>>;
}

/// In-memory move store for tests/dev.
pub struct InMemoryMoveStore {
    inner: RwLock<HashMap<MoveId, StockMove>>,
    locations: Arc<dyn LocationSearch>,
}

impl InMemoryMoveStore {
    pub fn new(locations: Arc<dyn LocationSearch>) -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
            locations,
        }
    }

    pub fn insert(&self, stock_move: StockMove) -> MoveId {
        let id = *stock_move.id();
        if let Ok(mut map) = self.inner.write() {
            map.insert(id, stock_move);
        }
        id
    }

    fn group<F>(&self, expr: &Expr, keep: F) -> DomainResult<HashMap<ProductId, Decimal>>
    where
        F: Fn(&StockMove) -> bool,
    {
        let expanded =
            expr.expand_child_of(&|roots: &[Uuid]| self.locations.descendants_of(roots))?;
        let map = self
            .inner
            .read()
            .map_err(|_| DomainError::configuration("move store lock poisoned"))?;
        let mut grouped: HashMap<ProductId, Decimal> = HashMap::new();
        for stock_move in map.values() {
            if !keep(stock_move) {
                continue;
            }
            let view = MoveView {
                stock_move,
                locations: self.locations.as_ref(),
            };
            if expanded.matches(&view)? {
                *grouped.entry(stock_move.product_id).or_default() += stock_move.quantity;
            }
        }
        Ok(grouped)
    }
}

impl MoveAggregation for InMemoryMoveStore {
    fn done_quantity_since(
        &self,
        expr: &Expr,
        cutoff: DateTime<Utc>,
    ) -> DomainResult<HashMap<ProductId, Decimal>> {
        self.group(expr, |m| m.state == MoveState::Done && m.date > cutoff)
    }

    fn pending_quantity_between(
        &self,
        expr: &Expr,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> DomainResult<HashMap<ProductId, Decimal>> {
        self.group(expr, |m| {
            m.state.is_pending()
                && from.is_none_or(|from| m.date >= from)
                && to.is_none_or(|to| m.date <= to)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::{InMemoryLocationStore, Location, LocationUsage};
    use chrono::Duration;
    use rust_decimal::prelude::FromPrimitive;

    fn dec(value: i64) -> Decimal {
        Decimal::from_i64(value).unwrap()
    }

    struct Fixture {
        locations: Arc<InMemoryLocationStore>,
        moves: InMemoryMoveStore,
        company: CompanyId,
        stock: LocationId,
        suppliers: LocationId,
        product: ProductId,
    }

    fn fixture() -> Fixture {
        let locations = Arc::new(InMemoryLocationStore::new());
        let company = CompanyId::new();
        let stock = locations.insert(Location::new(company, "Stock", LocationUsage::Internal));
        let suppliers =
            locations.insert(Location::new(company, "Vendors", LocationUsage::Supplier));
        Fixture {
            moves: InMemoryMoveStore::new(locations.clone()),
            locations,
            company,
            stock,
            suppliers,
            product: ProductId::new(),
        }
    }

    fn into_stock(fx: &Fixture) -> Expr {
        Expr::and(vec![
            Expr::any_of(
                "location_dest_id",
                FieldValue::Ids(vec![*fx.stock.as_uuid()]),
            ),
            Expr::any_of("location_id", FieldValue::Ids(vec![*fx.stock.as_uuid()])).negate(),
        ])
    }

    #[test]
    fn done_since_only_counts_done_moves_strictly_after_the_cutoff() {
        let fx = fixture();
        let now = Utc::now();
        let cutoff = now - Duration::days(30);

        fx.moves.insert(StockMove::new(
            fx.company,
            fx.product,
            fx.suppliers,
            fx.stock,
            dec(5),
            MoveState::Done,
            cutoff - Duration::days(1),
        ));
        fx.moves.insert(StockMove::new(
            fx.company,
            fx.product,
            fx.suppliers,
            fx.stock,
            dec(3),
            MoveState::Done,
            cutoff + Duration::days(2),
        ));
        fx.moves.insert(StockMove::new(
            fx.company,
            fx.product,
            fx.suppliers,
            fx.stock,
            dec(11),
            MoveState::Confirmed,
            cutoff + Duration::days(3),
        ));

        let grouped = fx.moves.done_quantity_since(&into_stock(&fx), cutoff).unwrap();
        assert_eq!(grouped[&fx.product], dec(3));
    }

    #[test]
    fn pending_between_honors_both_window_bounds() {
        let fx = fixture();
        let now = Utc::now();

        fx.moves.insert(StockMove::new(
            fx.company,
            fx.product,
            fx.suppliers,
            fx.stock,
            dec(4),
            MoveState::Assigned,
            now + Duration::days(1),
        ));
        fx.moves.insert(StockMove::new(
            fx.company,
            fx.product,
            fx.suppliers,
            fx.stock,
            dec(6),
            MoveState::Waiting,
            now + Duration::days(10),
        ));

        let window_all = fx
            .moves
            .pending_quantity_between(&into_stock(&fx), None, None)
            .unwrap();
        assert_eq!(window_all[&fx.product], dec(10));

        let window_near = fx
            .moves
            .pending_quantity_between(&into_stock(&fx), None, Some(now + Duration::days(5)))
            .unwrap();
        assert_eq!(window_near[&fx.product], dec(4));
    }

    #[test]
    fn internal_relocations_match_neither_direction() {
        let fx = fixture();
        let bin = fx
            .locations
            .insert(Location::new(fx.company, "Bin", LocationUsage::Internal));
        // A move from stock to another in-scope internal location is filtered
        // out by the source-not-in-scope leg.
        let scope_ids = vec![*fx.stock.as_uuid(), *bin.as_uuid()];
        let into_scope = Expr::and(vec![
            Expr::any_of("location_dest_id", FieldValue::Ids(scope_ids.clone())),
            Expr::any_of("location_id", FieldValue::Ids(scope_ids)).negate(),
        ]);

        fx.moves.insert(StockMove::new(
            fx.company,
            fx.product,
            fx.stock,
            bin,
            dec(2),
            MoveState::Assigned,
            Utc::now() + Duration::days(1),
        ));

        let grouped = fx
            .moves
            .pending_quantity_between(&into_scope, None, None)
            .unwrap();
        assert!(grouped.is_empty());
    }
}
