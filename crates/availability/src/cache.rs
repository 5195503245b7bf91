//! Excluded-location cache: an explicit service with a defined lifecycle.
//!
//! One instance is created when the process is composed and injected into
//! the resolver; invalidation is an explicit API called from the location
//! write path, never a side channel.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use wareflow_core::{CompanyId, DomainError, DomainResult, LocationId, WarehouseId};
use wareflow_stock::AvailabilityContext;

/// Cache key: the parts of the context that change which locations are in
/// scope. Id sets are sorted so permuted but equivalent contexts share an
/// entry, and `include_children` keeps child-inclusive and exact location
/// filters apart.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    companies: Vec<CompanyId>,
    location_filter: Vec<LocationId>,
    warehouse_filter: Vec<WarehouseId>,
    include_children: bool,
}

impl CacheKey {
    pub fn from_context(ctx: &AvailabilityContext) -> Self {
        let mut companies = ctx.companies.clone();
        companies.sort();
        let mut location_filter = ctx.location_filter.clone();
        location_filter.sort();
        let mut warehouse_filter = ctx.warehouse_filter.clone();
        warehouse_filter.sort();
        Self {
            companies,
            location_filter,
            warehouse_filter,
            include_children: ctx.include_children,
        }
    }
}

/// Process-local cache of excluded-location id sets per context key.
#[derive(Debug, Default)]
pub struct ExcludedLocationCache {
    inner: RwLock<HashMap<CacheKey, Arc<[LocationId]>>>,
}

impl ExcludedLocationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached ids for `key`, or compute, store and return them. The compute
    /// closure's error is propagated and nothing is stored.
    pub fn get_or_try_insert<F>(&self, key: CacheKey, compute: F) -> DomainResult<Arc<[LocationId]>>
    where
        F: FnOnce() -> DomainResult<Vec<LocationId>>,
    {
        if let Some(hit) = self.get(&key) {
            return Ok(hit);
        }
        let ids: Arc<[LocationId]> = compute()?.into();
        let mut map = self
            .inner
            .write()
            .map_err(|_| DomainError::configuration("excluded-location cache lock poisoned"))?;
        Ok(map.entry(key).or_insert(ids).clone())
    }

    pub fn get(&self, key: &CacheKey) -> Option<Arc<[LocationId]>> {
        self.inner.read().ok()?.get(key).cloned()
    }

    /// Drop every entry. Called from the location write path whenever an
    /// exclusion flag changes; the next read recomputes lazily.
    pub fn invalidate_all(&self) {
        if let Ok(mut map) = self.inner.write() {
            map.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|map| map.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
