//! Location orderpoints: replenishment rules between a source and a
//! destination location, and the location-restriction predicate used to
//! select them.

use std::collections::HashMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use wareflow_core::{CompanyId, DomainError, DomainResult, Entity, LocationId, OrderpointId};
use wareflow_domain::{Expr, FieldValue, Record};

/// A replenishment rule for a destination location.
///
/// `use_to_compute_available_quantities` opts the rule into availability
/// computations: callers asking for opt-in rules only get their
/// location-selection predicate narrowed to flagged rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationOrderpoint {
    pub id: OrderpointId,
    pub company_id: CompanyId,
    pub name: String,
    pub location_id: LocationId,
    pub location_src_id: Option<LocationId>,
    pub active: bool,
    pub use_to_compute_available_quantities: bool,
}

impl LocationOrderpoint {
    pub fn new(
        company_id: CompanyId,
        name: impl Into<String>,
        location_id: LocationId,
    ) -> Self {
        Self {
            id: OrderpointId::new(),
            company_id,
            name: name.into(),
            location_id,
            location_src_id: None,
            active: true,
            use_to_compute_available_quantities: false,
        }
    }

    pub fn replenished_from(mut self, location_src_id: LocationId) -> Self {
        self.location_src_id = Some(location_src_id);
        self
    }

    pub fn used_for_available_quantities(mut self) -> Self {
        self.use_to_compute_available_quantities = true;
        self
    }
}

impl Entity for LocationOrderpoint {
    type Id = OrderpointId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Record for LocationOrderpoint {
    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "id" => Some(FieldValue::Id(*self.id.as_uuid())),
            "company_id" => Some(FieldValue::Id(*self.company_id.as_uuid())),
            "location_id" => Some(FieldValue::Id(*self.location_id.as_uuid())),
            "location_src_id" => Some(match self.location_src_id {
                Some(src) => FieldValue::Id(*src.as_uuid()),
                None => FieldValue::Nothing,
            }),
            "active" => Some(FieldValue::Bool(self.active)),
            "use_to_compute_available_quantities" => {
                Some(FieldValue::Bool(self.use_to_compute_available_quantities))
            }
            _ => None,
        }
    }
}

/// Which location column of the orderpoint the predicate restricts.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderpointLocationField {
    Destination,
    Source,
}

impl OrderpointLocationField {
    fn as_str(self) -> &'static str {
        match self {
            OrderpointLocationField::Destination => "location_id",
            OrderpointLocationField::Source => "location_src_id",
        }
    }
}

/// Location-restriction predicate for orderpoint selection. `only_opt_in`
/// additionally narrows the selection to rules opted into availability
/// computations.
pub fn orderpoint_location_expr(
    location_ids: &[LocationId],
    location_field: OrderpointLocationField,
    only_opt_in: bool,
) -> Expr {
    let base = Expr::and(vec![
        Expr::eq("active", FieldValue::Bool(true)),
        Expr::any_of(
            location_field.as_str(),
            FieldValue::Ids(location_ids.iter().map(|id| *id.as_uuid()).collect()),
        ),
    ]);
    narrow_to_available_quantity_orderpoints(base, only_opt_in)
}

/// Narrow an orderpoint-selection predicate to opt-in rules.
///
/// With `only_opt_in` unset the input is returned unchanged; set, the result
/// is the input AND `use_to_compute_available_quantities = true`.
pub fn narrow_to_available_quantity_orderpoints(expr: Expr, only_opt_in: bool) -> Expr {
    if !only_opt_in {
        return expr;
    }
    Expr::and(vec![
        expr,
        Expr::eq("use_to_compute_available_quantities", FieldValue::Bool(true)),
    ])
}

/// In-memory orderpoint store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryOrderpointStore {
    inner: RwLock<HashMap<OrderpointId, LocationOrderpoint>>,
}

impl InMemoryOrderpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, orderpoint: LocationOrderpoint) -> OrderpointId {
        let id = *orderpoint.id();
        if let Ok(mut map) = self.inner.write() {
            map.insert(id, orderpoint);
        }
        id
    }

    pub fn search(&self, expr: &Expr) -> DomainResult<Vec<LocationOrderpoint>> {
        let map = self
            .inner
            .read()
            .map_err(|_| DomainError::configuration("orderpoint store lock poisoned"))?;
        let mut found = Vec::new();
        for orderpoint in map.values() {
            if expr.matches(orderpoint)? {
                found.push(orderpoint.clone());
            }
        }
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn without_the_flag_the_predicate_is_returned_unchanged() {
        let shelf = LocationId::new();
        let base =
            orderpoint_location_expr(&[shelf], OrderpointLocationField::Destination, false);
        let narrowed = narrow_to_available_quantity_orderpoints(base.clone(), false);
        assert_eq!(narrowed, base);
    }

    #[test]
    fn with_the_flag_the_predicate_gains_the_opt_in_leaf() {
        let shelf = LocationId::new();
        let base =
            orderpoint_location_expr(&[shelf], OrderpointLocationField::Destination, false);
        assert_eq!(
            orderpoint_location_expr(&[shelf], OrderpointLocationField::Destination, true),
            Expr::and(vec![
                base,
                Expr::eq("use_to_compute_available_quantities", FieldValue::Bool(true)),
            ])
        );
    }

    #[test]
    fn narrowed_search_returns_only_opt_in_rules() {
        let store = InMemoryOrderpointStore::new();
        let company = CompanyId::new();
        let shelf = LocationId::new();

        store.insert(LocationOrderpoint::new(company, "Refill shelf", shelf));
        let opted = store.insert(
            LocationOrderpoint::new(company, "Refill shelf from bulk", shelf)
                .used_for_available_quantities(),
        );

        let base = orderpoint_location_expr(&[shelf], OrderpointLocationField::Destination, false);
        let all = store.search(&base).unwrap();
        assert_eq!(all.len(), 2);

        let narrowed = orderpoint_location_expr(&[shelf], OrderpointLocationField::Destination, true);
        let found = store.search(&narrowed).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, opted);
    }

    #[test]
    fn source_column_selection_matches_the_source_location() {
        let store = InMemoryOrderpointStore::new();
        let company = CompanyId::new();
        let shelf = LocationId::new();
        let bulk = LocationId::new();

        store.insert(
            LocationOrderpoint::new(company, "From bulk", shelf).replenished_from(bulk),
        );
        store.insert(LocationOrderpoint::new(company, "No source", shelf));

        let expr = orderpoint_location_expr(&[bulk], OrderpointLocationField::Source, false);
        let found = store.search(&expr).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].location_src_id, Some(bulk));
    }

    #[test]
    fn inactive_rules_never_match() {
        let store = InMemoryOrderpointStore::new();
        let company = CompanyId::new();
        let shelf = LocationId::new();
        let mut rule = LocationOrderpoint::new(company, "Archived", shelf);
        rule.active = false;
        store.insert(rule);

        let expr = orderpoint_location_expr(&[shelf], OrderpointLocationField::Destination, false);
        assert!(store.search(&expr).unwrap().is_empty());
    }
}
