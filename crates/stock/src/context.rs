//! Explicit query context for availability computations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use wareflow_core::{CompanyId, LocationId, LotId, OwnerId, PackageId, WarehouseId};
use wareflow_domain::{Expr, FieldValue};

/// Everything a per-product availability query depends on, carried as an
/// explicit parameter instead of ambient state.
///
/// Field effects:
/// - `companies`: active company set; every scoping predicate is restricted
///   to it. Must not be empty.
/// - `location_filter`: when non-empty, stock is scoped to these locations
///   (and their descendants when `include_children` is set) instead of the
///   company-wide internal/transit locations.
/// - `warehouse_filter`: when `location_filter` is empty and this is not,
///   stock is scoped to the subtrees under the warehouses' view locations.
/// - `include_children`: whether an explicit `location_filter` covers child
///   locations too. Defaults to `true`.
/// - `from_date`/`to_date`: window for pending in/out flows; a `to_date`
///   strictly in the past switches `qty_available` to the move-reconstructed
///   historical figure.
/// - `lot_id`/`owner_id`/`package_id`: narrow every quantity read to the
///   matching stock split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityContext {
    pub companies: Vec<CompanyId>,
    pub location_filter: Vec<LocationId>,
    pub warehouse_filter: Vec<WarehouseId>,
    pub include_children: bool,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
    pub lot_id: Option<LotId>,
    pub owner_id: Option<OwnerId>,
    pub package_id: Option<PackageId>,
}

impl AvailabilityContext {
    pub fn for_companies(companies: Vec<CompanyId>) -> Self {
        Self {
            companies,
            location_filter: Vec::new(),
            warehouse_filter: Vec::new(),
            include_children: true,
            from_date: None,
            to_date: None,
            lot_id: None,
            owner_id: None,
            package_id: None,
        }
    }

    pub fn with_location_filter(mut self, locations: Vec<LocationId>) -> Self {
        self.location_filter = locations;
        self
    }

    pub fn with_warehouse_filter(mut self, warehouses: Vec<WarehouseId>) -> Self {
        self.warehouse_filter = warehouses;
        self
    }

    pub fn without_child_locations(mut self) -> Self {
        self.include_children = false;
        self
    }

    pub fn with_date_range(
        mut self,
        from_date: Option<DateTime<Utc>>,
        to_date: Option<DateTime<Utc>>,
    ) -> Self {
        self.from_date = from_date;
        self.to_date = to_date;
        self
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

    /// Same companies, dates and stock-split narrowing, but scoped to
    /// exactly the given locations: no child expansion, no warehouse filter.
    pub fn restricted_to_locations(&self, locations: Vec<LocationId>) -> Self {
        let mut restricted = self.clone();
        restricted.location_filter = locations;
        restricted.warehouse_filter = Vec::new();
        restricted.include_children = false;
        restricted
    }

    /// Whether the query's upper date bound lies strictly in the past.
    pub fn is_past_dated(&self, now: DateTime<Utc>) -> bool {
        self.to_date.is_some_and(|to_date| to_date < now)
    }

    /// Leaf predicates for the lot/owner/package narrowing, applicable to
    /// quant and move reads alike.
    pub fn stock_split_filters(&self) -> Vec<Expr> {
        let mut filters = Vec::new();
        if let Some(lot_id) = self.lot_id {
            filters.push(Expr::eq("lot_id", FieldValue::Id(lot_id.into())));
        }
        if let Some(owner_id) = self.owner_id {
            filters.push(Expr::eq("owner_id", FieldValue::Id(owner_id.into())));
        }
        if let Some(package_id) = self.package_id {
            filters.push(Expr::eq("package_id", FieldValue::Id(package_id.into())));
        }
        filters
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn past_dating_is_strict() {
        let now = Utc::now();
        let ctx = AvailabilityContext::for_companies(vec![CompanyId::new()]);
        assert!(!ctx.is_past_dated(now));

        let at_now = ctx.clone().with_date_range(None, Some(now));
        assert!(!at_now.is_past_dated(now));

        let past = ctx.clone().with_date_range(None, Some(now - Duration::seconds(1)));
        assert!(past.is_past_dated(now));

        let future = ctx.with_date_range(None, Some(now + Duration::days(1)));
        assert!(!future.is_past_dated(now));
    }

    #[test]
    fn location_restriction_drops_warehouses_and_children() {
        let ctx = AvailabilityContext::for_companies(vec![CompanyId::new()])
            .with_warehouse_filter(vec![WarehouseId::new()])
            .with_lot(LotId::new());
        let held = vec![LocationId::new()];
        let restricted = ctx.restricted_to_locations(held.clone());

        assert_eq!(restricted.location_filter, held);
        assert!(restricted.warehouse_filter.is_empty());
        assert!(!restricted.include_children);
        assert_eq!(restricted.lot_id, ctx.lot_id);
        assert_eq!(restricted.companies, ctx.companies);
    }

    #[test]
    fn stock_split_filters_cover_only_set_options() {
        let ctx = AvailabilityContext::for_companies(vec![CompanyId::new()]);
        assert!(ctx.stock_split_filters().is_empty());

        let narrowed = ctx.with_lot(LotId::new()).with_package(PackageId::new());
        assert_eq!(narrowed.stock_split_filters().len(), 2);
    }
}
