//! Expression tree: leaf conditions and logical combinators.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use wareflow_core::{DomainError, DomainResult};

/// A field value as seen by the expression evaluator.
///
/// `Nothing` stands for an unset relation field (e.g. a quant without an
/// owner); comparing it against an id yields `false`, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldValue {
    Bool(bool),
    Id(Uuid),
    Ids(Vec<Uuid>),
    Str(String),
    Strs(Vec<String>),
    Nothing,
}

impl FieldValue {
    fn kind(&self) -> &'static str {
        match self {
            FieldValue::Bool(_) => "bool",
            FieldValue::Id(_) => "id",
            FieldValue::Ids(_) => "ids",
            FieldValue::Str(_) => "str",
            FieldValue::Strs(_) => "strs",
            FieldValue::Nothing => "nothing",
        }
    }
}

/// Comparison operator of a leaf condition.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Eq,
    In,
    /// Hierarchical membership: the field's location is one of the given
    /// locations or any of their descendants. Must be expanded to `In` via
    /// [`Expr::expand_child_of`] before evaluation; only a location store
    /// knows the hierarchy.
    ChildOf,
}

/// Leaf condition: `(field, operator, value)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    pub operator: Operator,
    pub value: FieldValue,
}

/// A record that can be evaluated against an expression.
pub trait Record {
    /// Value of the named field, or `None` if the record has no such field.
    fn field(&self, name: &str) -> Option<FieldValue>;
}

/// Structured filter expression over records.
///
/// An empty `And` matches every record; an empty `Or` matches none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    Leaf(Condition),
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Not(Box<Expr>),
}

impl Expr {
    /// Leaf constructor.
    pub fn leaf(field: impl Into<String>, operator: Operator, value: FieldValue) -> Self {
        Expr::Leaf(Condition {
            field: field.into(),
            operator,
            value,
        })
    }

    /// `field = value`.
    pub fn eq(field: impl Into<String>, value: FieldValue) -> Self {
        Self::leaf(field, Operator::Eq, value)
    }

    /// `field in values`.
    pub fn any_of(field: impl Into<String>, value: FieldValue) -> Self {
        Self::leaf(field, Operator::In, value)
    }

    /// `field child_of locations`.
    pub fn child_of(field: impl Into<String>, ids: Vec<Uuid>) -> Self {
        Self::leaf(field, Operator::ChildOf, FieldValue::Ids(ids))
    }

    /// Expression that matches every record.
    pub fn all() -> Self {
        Expr::And(Vec::new())
    }

    /// Logical conjunction. Nested `And` nodes are flattened.
    pub fn and(parts: Vec<Expr>) -> Self {
        let mut flat = Vec::with_capacity(parts.len());
        for part in parts {
            match part {
                Expr::And(children) => flat.extend(children),
                other => flat.push(other),
            }
        }
        Expr::And(flat)
    }

    /// Logical disjunction. Nested `Or` nodes are flattened.
    pub fn or(parts: Vec<Expr>) -> Self {
        let mut flat = Vec::with_capacity(parts.len());
        for part in parts {
            match part {
                Expr::Or(children) => flat.extend(children),
                other => flat.push(other),
            }
        }
        Expr::Or(flat)
    }

    /// Logical negation.
    pub fn negate(self) -> Self {
        Expr::Not(Box::new(self))
    }

    /// Evaluate this expression against a record.
    pub fn matches<R: Record + ?Sized>(&self, record: &R) -> DomainResult<bool> {
        match self {
            Expr::Leaf(condition) => condition.matches(record),
            Expr::And(children) => {
                for child in children {
                    if !child.matches(record)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Expr::Or(children) => {
                for child in children {
                    if child.matches(record)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Expr::Not(inner) => Ok(!inner.matches(record)?),
        }
    }

    /// Replace every `child_of` leaf with `in` over the ids the resolver
    /// returns for it (the resolver is expected to be self-inclusive).
    pub fn expand_child_of<F>(&self, resolve: &F) -> DomainResult<Expr>
    where
        F: Fn(&[Uuid]) -> Vec<Uuid>,
    {
        match self {
            Expr::Leaf(condition) => {
                if condition.operator != Operator::ChildOf {
                    return Ok(Expr::Leaf(condition.clone()));
                }
                let roots = match &condition.value {
                    FieldValue::Id(id) => vec![*id],
                    FieldValue::Ids(ids) => ids.clone(),
                    other => {
                        return Err(DomainError::invalid_predicate(format!(
                            "child_of on `{}` requires ids, got {}",
                            condition.field,
                            other.kind()
                        )));
                    }
                };
                Ok(Expr::any_of(
                    condition.field.clone(),
                    FieldValue::Ids(resolve(&roots)),
                ))
            }
            Expr::And(children) => Ok(Expr::And(
                children
                    .iter()
                    .map(|c| c.expand_child_of(resolve))
                    .collect::<DomainResult<Vec<_>>>()?,
            )),
            Expr::Or(children) => Ok(Expr::Or(
                children
                    .iter()
                    .map(|c| c.expand_child_of(resolve))
                    .collect::<DomainResult<Vec<_>>>()?,
            )),
            Expr::Not(inner) => Ok(inner.expand_child_of(resolve)?.negate()),
        }
    }

    /// Visit every leaf condition.
    pub fn for_each_leaf<F>(&self, visit: &mut F)
    where
        F: FnMut(&Condition),
    {
        match self {
            Expr::Leaf(condition) => visit(condition),
            Expr::And(children) | Expr::Or(children) => {
                for child in children {
                    child.for_each_leaf(visit);
                }
            }
            Expr::Not(inner) => inner.for_each_leaf(visit),
        }
    }
}

impl Condition {
    fn matches<R: Record + ?Sized>(&self, record: &R) -> DomainResult<bool> {
        let actual = record.field(&self.field).ok_or_else(|| {
            DomainError::invalid_predicate(format!("record has no field `{}`", self.field))
        })?;
        match self.operator {
            Operator::Eq => eq_values(&self.field, &actual, &self.value),
            Operator::In => in_values(&self.field, &actual, &self.value),
            Operator::ChildOf => Err(DomainError::invalid_predicate(format!(
                "child_of on `{}` must be expanded before evaluation",
                self.field
            ))),
        }
    }
}

fn eq_values(field: &str, actual: &FieldValue, expected: &FieldValue) -> DomainResult<bool> {
    match (actual, expected) {
        (FieldValue::Bool(a), FieldValue::Bool(b)) => Ok(a == b),
        (FieldValue::Id(a), FieldValue::Id(b)) => Ok(a == b),
        (FieldValue::Str(a), FieldValue::Str(b)) => Ok(a == b),
        (FieldValue::Nothing, FieldValue::Nothing) => Ok(true),
        (FieldValue::Nothing, FieldValue::Id(_)) | (FieldValue::Id(_), FieldValue::Nothing) => {
            Ok(false)
        }
        (a, b) => Err(DomainError::invalid_predicate(format!(
            "`{field}`: cannot compare {} with {}",
            a.kind(),
            b.kind()
        ))),
    }
}

fn in_values(field: &str, actual: &FieldValue, expected: &FieldValue) -> DomainResult<bool> {
    match (actual, expected) {
        (FieldValue::Id(a), FieldValue::Ids(set)) => Ok(set.contains(a)),
        (FieldValue::Str(a), FieldValue::Strs(set)) => Ok(set.contains(a)),
        (FieldValue::Nothing, FieldValue::Ids(_)) | (FieldValue::Nothing, FieldValue::Strs(_)) => {
            Ok(false)
        }
        (a, b) => Err(DomainError::invalid_predicate(format!(
            "`{field}`: `in` cannot test {} against {}",
            a.kind(),
            b.kind()
        ))),
    }
}
