//! Host inventory machinery: locations, warehouses, quants, stock moves,
//! location orderpoints, and the baseline per-product availability engine.
//!
//! Everything here is deterministic in-process logic behind trait seams; the
//! in-memory stores stand in for the persistence layer (an explicit
//! non-goal) and are what the tests and the availability overlay run
//! against.

pub mod availability;
pub mod context;
pub mod location;
pub mod moves;
pub mod quant;
pub mod replenishment;
pub mod scope;
pub mod warehouse;

pub use availability::{AvailableQuantities, AvailableQuantityProvider, StockAvailability};
pub use context::AvailabilityContext;
pub use location::{
    InMemoryLocationStore, Location, LocationObserver, LocationSearch, LocationUsage,
};
pub use moves::{InMemoryMoveStore, MoveAggregation, MoveState, StockMove};
pub use quant::{InMemoryQuantStore, Quant, QuantAggregation};
pub use replenishment::{
    narrow_to_available_quantity_orderpoints, orderpoint_location_expr, InMemoryOrderpointStore,
    LocationOrderpoint, OrderpointLocationField,
};
pub use scope::{location_scope, LocationScope};
pub use warehouse::{InMemoryWarehouseStore, Warehouse, WarehouseSearch};
