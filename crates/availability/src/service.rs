//! Wiring: stores, cache, resolver, invalidation hook and adjuster composed
//! into one ready-to-use stack.

use std::collections::HashMap;
use std::sync::Arc;

use wareflow_core::{DomainResult, ProductId};
use wareflow_stock::{
    AvailabilityContext, AvailableQuantities, AvailableQuantityProvider, InMemoryLocationStore,
    InMemoryMoveStore, InMemoryOrderpointStore, InMemoryQuantStore, InMemoryWarehouseStore,
    StockAvailability,
};

use crate::adjuster::ExcludedLocationAdjuster;
use crate::cache::ExcludedLocationCache;
use crate::resolver::{ExcludedLocationResolver, ExclusionFlagInvalidation};

/// The composed availability stack over in-memory stores.
///
/// The invalidation hook is registered on the location store at
/// construction, so any exclusion-flag write is reflected by the next read
/// with no further plumbing.
pub struct AdjustedStock {
    locations: Arc<InMemoryLocationStore>,
    warehouses: Arc<InMemoryWarehouseStore>,
    quants: Arc<InMemoryQuantStore>,
    moves: Arc<InMemoryMoveStore>,
    orderpoints: Arc<InMemoryOrderpointStore>,
    cache: Arc<ExcludedLocationCache>,
    baseline: StockAvailability,
    provider: ExcludedLocationAdjuster<StockAvailability>,
}

impl AdjustedStock {
    pub fn new() -> Self {
        let locations = Arc::new(InMemoryLocationStore::new());
        let warehouses = Arc::new(InMemoryWarehouseStore::new());
        let quants = Arc::new(InMemoryQuantStore::new(locations.clone()));
        let moves = Arc::new(InMemoryMoveStore::new(locations.clone()));
        let orderpoints = Arc::new(InMemoryOrderpointStore::new());
        let cache = Arc::new(ExcludedLocationCache::new());

        locations.register_observer(Arc::new(ExclusionFlagInvalidation::new(cache.clone())));

        let baseline =
            StockAvailability::new(warehouses.clone(), quants.clone(), moves.clone());
        let resolver =
            ExcludedLocationResolver::new(locations.clone(), warehouses.clone(), cache.clone());
        let provider = ExcludedLocationAdjuster::new(
            baseline.clone(),
            resolver,
            quants.clone(),
            warehouses.clone(),
        );

        Self {
            locations,
            warehouses,
            quants,
            moves,
            orderpoints,
            cache,
            baseline,
            provider,
        }
    }

    pub fn locations(&self) -> &InMemoryLocationStore {
        &self.locations
    }

    pub fn warehouses(&self) -> &InMemoryWarehouseStore {
        &self.warehouses
    }

    pub fn quants(&self) -> &InMemoryQuantStore {
        &self.quants
    }

    pub fn moves(&self) -> &InMemoryMoveStore {
        &self.moves
    }

    pub fn orderpoints(&self) -> &InMemoryOrderpointStore {
        &self.orderpoints
    }

    pub fn cache(&self) -> &ExcludedLocationCache {
        &self.cache
    }

    /// Adjusted per-product quantities (baseline minus excluded stock).
    pub fn available_quantities(
        &self,
        products: &[ProductId],
        ctx: &AvailabilityContext,
    ) -> DomainResult<HashMap<ProductId, AvailableQuantities>> {
        self.provider.available_quantities(products, ctx)
    }

    /// The unadjusted baseline, for comparison.
    pub fn baseline_quantities(
        &self,
        products: &[ProductId],
        ctx: &AvailabilityContext,
    ) -> DomainResult<HashMap<ProductId, AvailableQuantities>> {
        self.baseline.available_quantities(products, ctx)
    }
}

impl Default for AdjustedStock {
    fn default() -> Self {
        Self::new()
    }
}
