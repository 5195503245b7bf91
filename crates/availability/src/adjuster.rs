//! The availability adjustment: subtract stock held in excluded locations
//! from each product's immediately usable quantity.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use wareflow_core::{DomainResult, ProductId};
use wareflow_domain::{Expr, FieldValue};
use wareflow_stock::{
    location_scope, AvailabilityContext, AvailableQuantities, AvailableQuantityProvider,
    QuantAggregation, WarehouseSearch,
};

use crate::resolver::ExcludedLocationResolver;

/// Decorates a baseline [`AvailableQuantityProvider`]: the baseline result
/// is returned with `immediately_usable_qty` reduced by the quantity held in
/// excluded locations, under the same company/date/lot/owner/package
/// filters. Read-only; no other field is touched.
pub struct ExcludedLocationAdjuster<P> {
    inner: P,
    resolver: ExcludedLocationResolver,
    quants: Arc<dyn QuantAggregation>,
    warehouses: Arc<dyn WarehouseSearch>,
}

impl<P> ExcludedLocationAdjuster<P>
where
    P: AvailableQuantityProvider,
{
    pub fn new(
        inner: P,
        resolver: ExcludedLocationResolver,
        quants: Arc<dyn QuantAggregation>,
        warehouses: Arc<dyn WarehouseSearch>,
    ) -> Self {
        Self {
            inner,
            resolver,
            quants,
            warehouses,
        }
    }

    /// Quantity per product held in the excluded locations, under the same
    /// stock-split and date filters as the baseline. Empty when nothing is
    /// excluded.
    fn excluded_quantities(
        &self,
        products: &[ProductId],
        ctx: &AvailabilityContext,
    ) -> DomainResult<HashMap<ProductId, Decimal>> {
        let excluded = self.resolver.excluded_location_ids(ctx)?;
        if excluded.is_empty() {
            return Ok(HashMap::new());
        }
        let excluded_ctx = ctx.restricted_to_locations(excluded.to_vec());

        if ctx.is_past_dated(Utc::now()) {
            // Quants only describe current state; a past-dated figure needs
            // the full move-reconstructed computation.
            let historical = self.inner.available_quantities(products, &excluded_ctx)?;
            return Ok(historical
                .into_iter()
                .map(|(product_id, quantities)| (product_id, quantities.qty_available))
                .collect());
        }

        // Present/future: the on-hand sum in the excluded locations is a
        // single grouped quant read; the pending-move aggregations the full
        // computation would issue are irrelevant here.
        let scope = location_scope(&excluded_ctx, self.warehouses.as_ref())?;
        let mut parts = vec![
            scope.quant_expr,
            Expr::any_of(
                "product_id",
                FieldValue::Ids(products.iter().map(|id| *id.as_uuid()).collect()),
            ),
        ];
        parts.extend(excluded_ctx.stock_split_filters());
        self.quants.group_quantity_by_product(&Expr::and(parts))
    }
}

impl<P> AvailableQuantityProvider for ExcludedLocationAdjuster<P>
where
    P: AvailableQuantityProvider,
{
    fn available_quantities(
        &self,
        products: &[ProductId],
        ctx: &AvailabilityContext,
    ) -> DomainResult<HashMap<ProductId, AvailableQuantities>> {
        let mut baseline = self.inner.available_quantities(products, ctx)?;
        let excluded = self.excluded_quantities(products, ctx)?;
        if excluded.is_empty() {
            return Ok(baseline);
        }
        tracing::debug!(products = excluded.len(), "deducting excluded-location stock");
        for (product_id, quantity) in excluded {
            if let Some(entry) = baseline.get_mut(&product_id) {
                entry.immediately_usable_qty -= quantity;
            }
        }
        Ok(baseline)
    }
}
