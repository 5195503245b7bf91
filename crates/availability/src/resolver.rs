//! Excluded-location resolution and the cache-invalidation write hook.

use std::sync::Arc;

use wareflow_core::{DomainResult, LocationId};
use wareflow_domain::{strip_relation_prefix, Expr, FieldValue};
use wareflow_stock::{
    location_scope, AvailabilityContext, LocationObserver, LocationSearch, WarehouseSearch,
};

use crate::cache::{CacheKey, ExcludedLocationCache};

/// Resolves the set of location ids currently flagged for exclusion within
/// the context's company/location/warehouse scope. Results are cached per
/// context key until an exclusion flag changes somewhere.
pub struct ExcludedLocationResolver {
    locations: Arc<dyn LocationSearch>,
    warehouses: Arc<dyn WarehouseSearch>,
    cache: Arc<ExcludedLocationCache>,
}

impl ExcludedLocationResolver {
    pub fn new(
        locations: Arc<dyn LocationSearch>,
        warehouses: Arc<dyn WarehouseSearch>,
        cache: Arc<ExcludedLocationCache>,
    ) -> Self {
        Self {
            locations,
            warehouses,
            cache,
        }
    }

    /// Sorted ids of in-scope locations flagged for exclusion.
    pub fn excluded_location_ids(
        &self,
        ctx: &AvailabilityContext,
    ) -> DomainResult<Arc<[LocationId]>> {
        let key = CacheKey::from_context(ctx);
        self.cache.get_or_try_insert(key, || {
            let expr = self.excluded_location_expr(ctx)?;
            let mut ids: Vec<LocationId> = self
                .locations
                .search(&expr)?
                .into_iter()
                .map(|location| location.id)
                .collect();
            ids.sort();
            tracing::debug!(count = ids.len(), "resolved excluded locations");
            Ok(ids)
        })
    }

    /// The location-level predicate: the context's quant scope predicate
    /// rewritten to the location level, AND the exclusion flag.
    fn excluded_location_expr(&self, ctx: &AvailabilityContext) -> DomainResult<Expr> {
        let scope = location_scope(ctx, self.warehouses.as_ref())?;
        let location_level = strip_relation_prefix(&scope.quant_expr, "location_id")?;
        Ok(Expr::and(vec![
            location_level,
            Expr::eq("exclude_from_immediately_usable_qty", FieldValue::Bool(true)),
        ]))
    }
}

/// Location write hook: clears the excluded-location cache whenever an
/// exclusion flag changes, in either direction, before the write returns.
pub struct ExclusionFlagInvalidation {
    cache: Arc<ExcludedLocationCache>,
}

impl ExclusionFlagInvalidation {
    pub fn new(cache: Arc<ExcludedLocationCache>) -> Self {
        Self { cache }
    }
}

impl LocationObserver for ExclusionFlagInvalidation {
    fn exclusion_flag_changed(&self, location_id: LocationId, now_excluded: bool) {
        tracing::debug!(%location_id, now_excluded, "exclusion flag changed, clearing cache");
        self.cache.invalidate_all();
    }
}
