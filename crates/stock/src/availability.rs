//! Baseline per-product availability.
//!
//! `qty_available` comes from the quant snapshot; when the query is dated in
//! the past the snapshot is corrected backwards through done moves. Pending
//! moves feed `incoming_qty`/`outgoing_qty`, and `immediately_usable_qty`
//! starts out equal to `virtual_available`; overlays may reduce it further.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use wareflow_core::{DomainResult, ProductId};
use wareflow_domain::{Expr, FieldValue};

use crate::context::AvailabilityContext;
use crate::moves::MoveAggregation;
use crate::quant::QuantAggregation;
use crate::scope::location_scope;
use crate::warehouse::WarehouseSearch;

/// Per-product quantity breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableQuantities {
    pub qty_available: Decimal,
    pub incoming_qty: Decimal,
    pub outgoing_qty: Decimal,
    pub virtual_available: Decimal,
    pub immediately_usable_qty: Decimal,
}

impl AvailableQuantities {
    /// Derive the virtual and immediately-usable figures from the raw parts.
    pub fn from_parts(qty_available: Decimal, incoming_qty: Decimal, outgoing_qty: Decimal) -> Self {
        let virtual_available = qty_available + incoming_qty - outgoing_qty;
        Self {
            qty_available,
            incoming_qty,
            outgoing_qty,
            virtual_available,
            immediately_usable_qty: virtual_available,
        }
    }

    pub fn zero() -> Self {
        Self::from_parts(Decimal::ZERO, Decimal::ZERO, Decimal::ZERO)
    }
}

/// The per-product available-quantity hook. Overlays decorate this trait,
/// returning the same structure with adjusted values.
pub trait AvailableQuantityProvider: Send + Sync {
    /// Quantity breakdown for each requested product under `ctx`. Every
    /// requested product has an entry (zeroed when it has no stock records).
    fn available_quantities(
        &self,
        products: &[ProductId],
        ctx: &AvailabilityContext,
    ) -> DomainResult<HashMap<ProductId, AvailableQuantities>>;
}

/// Baseline availability engine over the quant and move stores.
#[derive(Clone)]
pub struct StockAvailability {
    warehouses: Arc<dyn WarehouseSearch>,
    quants: Arc<dyn QuantAggregation>,
    moves: Arc<dyn MoveAggregation>,
}

impl StockAvailability {
    pub fn new(
        warehouses: Arc<dyn WarehouseSearch>,
        quants: Arc<dyn QuantAggregation>,
        moves: Arc<dyn MoveAggregation>,
    ) -> Self {
        Self {
            warehouses,
            quants,
            moves,
        }
    }
}

fn narrowed(base: Expr, products: &Expr, split: &[Expr]) -> Expr {
    let mut parts = vec![base, products.clone()];
    parts.extend(split.iter().cloned());
    Expr::and(parts)
}

impl AvailableQuantityProvider for StockAvailability {
    fn available_quantities(
        &self,
        products: &[ProductId],
        ctx: &AvailabilityContext,
    ) -> DomainResult<HashMap<ProductId, AvailableQuantities>> {
        let scope = location_scope(ctx, self.warehouses.as_ref())?;
        let product_leaf = Expr::any_of(
            "product_id",
            FieldValue::Ids(products.iter().map(|id| *id.as_uuid()).collect()),
        );
        let split = ctx.stock_split_filters();
        let quant_expr = narrowed(scope.quant_expr, &product_leaf, &split);
        let move_in_expr = narrowed(scope.move_in_expr, &product_leaf, &split);
        let move_out_expr = narrowed(scope.move_out_expr, &product_leaf, &split);

        let mut qty_available = self.quants.group_quantity_by_product(&quant_expr)?;

        let now = Utc::now();
        if let Some(to_date) = ctx.to_date {
            if to_date < now {
                // The snapshot reflects current state; undo everything done
                // after the cutoff to land on the historical figure.
                let done_in = self.moves.done_quantity_since(&move_in_expr, to_date)?;
                let done_out = self.moves.done_quantity_since(&move_out_expr, to_date)?;
                for (product_id, quantity) in done_in {
                    *qty_available.entry(product_id).or_default() -= quantity;
                }
                for (product_id, quantity) in done_out {
                    *qty_available.entry(product_id).or_default() += quantity;
                }
            }
        }

        let incoming = self
            .moves
            .pending_quantity_between(&move_in_expr, ctx.from_date, ctx.to_date)?;
        let outgoing = self
            .moves
            .pending_quantity_between(&move_out_expr, ctx.from_date, ctx.to_date)?;

        let mut result = HashMap::with_capacity(products.len());
        for product_id in products {
            let entry = AvailableQuantities::from_parts(
                qty_available.get(product_id).copied().unwrap_or_default(),
                incoming.get(product_id).copied().unwrap_or_default(),
                outgoing.get(product_id).copied().unwrap_or_default(),
            );
            result.insert(*product_id, entry);
        }
        tracing::debug!(
            products = products.len(),
            past_dated = ctx.is_past_dated(now),
            "computed baseline availability"
        );
        Ok(result)
    }
}
