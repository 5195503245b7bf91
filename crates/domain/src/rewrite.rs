//! Rewrites between record levels.
//!
//! Quant-level scoping predicates constrain `location_id` / `location_id.x`
//! and `company_id`. Searching locations themselves needs the same predicate
//! expressed at the location level: `location_id` becomes `id`,
//! `location_id.x` becomes `x`, `company_id` is kept as-is.

use wareflow_core::{DomainError, DomainResult};

use crate::expr::{Condition, Expr};

/// Convert a predicate over records carrying a `relation` field into a
/// predicate over the related records themselves.
///
/// Precondition: the source expression only constrains the relation field
/// and `company_id`; any other field is an error, never silently kept.
pub fn strip_relation_prefix(expr: &Expr, relation: &str) -> DomainResult<Expr> {
    match expr {
        Expr::Leaf(condition) => Ok(Expr::Leaf(strip_condition(condition, relation)?)),
        Expr::And(children) => Ok(Expr::And(strip_all(children, relation)?)),
        Expr::Or(children) => Ok(Expr::Or(strip_all(children, relation)?)),
        Expr::Not(inner) => Ok(strip_relation_prefix(inner, relation)?.negate()),
    }
}

fn strip_all(children: &[Expr], relation: &str) -> DomainResult<Vec<Expr>> {
    children
        .iter()
        .map(|child| strip_relation_prefix(child, relation))
        .collect()
}

fn strip_condition(condition: &Condition, relation: &str) -> DomainResult<Condition> {
    let field = if condition.field == relation {
        "id".to_string()
    } else if let Some(suffix) = condition.field.strip_prefix(relation).and_then(|rest| rest.strip_prefix('.')) {
        suffix.to_string()
    } else if condition.field == "company_id" {
        condition.field.clone()
    } else {
        return Err(DomainError::invalid_predicate(format!(
            "cannot rewrite field `{}`: expected `{relation}`, `{relation}.*` or `company_id`",
            condition.field
        )));
    };
    Ok(Condition {
        field,
        operator: condition.operator,
        value: condition.value.clone(),
    })
}
