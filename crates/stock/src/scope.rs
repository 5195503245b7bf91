//! The shared location-scoping predicate.
//!
//! Every stock quantity read (quants, incoming moves, outgoing moves) is
//! scoped through this single builder so that callers layering extra
//! restrictions on top (the excluded-location overlay among them) observe
//! exactly the same location semantics as the baseline computation.

use wareflow_core::{DomainError, DomainResult};
use wareflow_domain::{Expr, FieldValue};

use crate::context::AvailabilityContext;
use crate::warehouse::WarehouseSearch;

/// Scoping predicates for the three stock read paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationScope {
    /// Over quants: `location_id` within scope.
    pub quant_expr: Expr,
    /// Over moves: destination within scope, source outside it.
    pub move_in_expr: Expr,
    /// Over moves: source within scope, destination outside it.
    pub move_out_expr: Expr,
}

/// Build the location scope for a context.
///
/// Precedence: an explicit `location_filter` wins over `warehouse_filter`;
/// with neither, scope is every internal/transit location of the active
/// companies. Fails with a configuration error when no predicate can be
/// constructed (empty company set).
pub fn location_scope(
    ctx: &AvailabilityContext,
    warehouses: &dyn WarehouseSearch,
) -> DomainResult<LocationScope> {
    if ctx.companies.is_empty() {
        return Err(DomainError::configuration(
            "cannot scope stock reads without an active company",
        ));
    }
    let company_leaf = Expr::any_of(
        "company_id",
        FieldValue::Ids(ctx.companies.iter().map(|id| *id.as_uuid()).collect()),
    );

    let location_ids = if !ctx.location_filter.is_empty() {
        Some(ctx.location_filter.iter().map(|id| *id.as_uuid()).collect::<Vec<_>>())
    } else if !ctx.warehouse_filter.is_empty() {
        Some(
            warehouses
                .view_locations_of(&ctx.warehouse_filter)
                .iter()
                .map(|id| *id.as_uuid())
                .collect(),
        )
    } else {
        None
    };

    let scope = match location_ids {
        Some(ids) => {
            let member = |field: &str| {
                if ctx.include_children {
                    Expr::child_of(field, ids.clone())
                } else {
                    Expr::any_of(field, FieldValue::Ids(ids.clone()))
                }
            };
            LocationScope {
                quant_expr: Expr::and(vec![company_leaf.clone(), member("location_id")]),
                move_in_expr: Expr::and(vec![
                    company_leaf.clone(),
                    member("location_dest_id"),
                    member("location_id").negate(),
                ]),
                move_out_expr: Expr::and(vec![
                    company_leaf,
                    member("location_id"),
                    member("location_dest_id").negate(),
                ]),
            }
        }
        None => {
            let usages = FieldValue::Strs(vec!["internal".to_string(), "transit".to_string()]);
            let held = |field: &str| Expr::any_of(format!("{field}.usage"), usages.clone());
            LocationScope {
                quant_expr: Expr::and(vec![company_leaf.clone(), held("location_id")]),
                move_in_expr: Expr::and(vec![
                    company_leaf.clone(),
                    held("location_dest_id"),
                    held("location_id").negate(),
                ]),
                move_out_expr: Expr::and(vec![
                    company_leaf,
                    held("location_id"),
                    held("location_dest_id").negate(),
                ]),
            }
        }
    };
    Ok(scope)
}
