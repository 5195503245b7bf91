//! Strongly-typed identifiers used across the stock domain.
//!
//! All identifiers are UUID newtypes. They derive `Ord` so id sets can be
//! sorted into a canonical order (cache keys, deterministic test output).

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

macro_rules! impl_uuid_newtype {
    ($(#[$meta:meta])* $t:ident, $name:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $t(Uuid);

        impl $t {
            /// Create a new identifier.
            ///
            /// Uses UUIDv7 (time-ordered). Prefer passing IDs explicitly in tests
            /// for determinism.
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<Uuid> for $t {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl From<$t> for Uuid {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let uuid = Uuid::from_str(s)
                    .map_err(|e| DomainError::invalid_id(format!("{}: {}", $name, e)))?;
                Ok(Self(uuid))
            }
        }
    };
}

impl_uuid_newtype!(
    /// Identifier of a company (multi-tenant boundary).
    CompanyId,
    "CompanyId"
);
impl_uuid_newtype!(
    /// Identifier of a warehouse.
    WarehouseId,
    "WarehouseId"
);
impl_uuid_newtype!(
    /// Identifier of a storage location.
    LocationId,
    "LocationId"
);
impl_uuid_newtype!(
    /// Identifier of a product variant.
    ProductId,
    "ProductId"
);
impl_uuid_newtype!(
    /// Identifier of a lot/serial number.
    LotId,
    "LotId"
);
impl_uuid_newtype!(
    /// Identifier of a stock owner (consignment partner).
    OwnerId,
    "OwnerId"
);
impl_uuid_newtype!(
    /// Identifier of a stock package.
    PackageId,
    "PackageId"
);
impl_uuid_newtype!(
    /// Identifier of a location orderpoint (replenishment rule).
    OrderpointId,
    "OrderpointId"
);
impl_uuid_newtype!(
    /// Identifier of a quant (stock-on-hand record).
    QuantId,
    "QuantId"
);
impl_uuid_newtype!(
    /// Identifier of a stock move.
    MoveId,
    "MoveId"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_from_canonical_uuid_string() {
        let id = LocationId::new();
        let parsed: LocationId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn rejects_malformed_uuid_string() {
        let err = "not-a-uuid".parse::<CompanyId>().unwrap_err();
        match err {
            DomainError::InvalidId(msg) => assert!(msg.contains("CompanyId")),
            other => panic!("expected InvalidId, got {other:?}"),
        }
    }

    #[test]
    fn ids_sort_in_uuid_order() {
        let mut ids: Vec<ProductId> = (0..8).map(|_| ProductId::new()).collect();
        let mut shuffled = ids.clone();
        shuffled.reverse();
        shuffled.sort();
        ids.sort();
        assert_eq!(shuffled, ids);
    }
}
