//! Reference band store and facility directory implementations.

pub mod shared;
pub mod static_provider;

pub use shared::SharedBandStore;
pub use static_provider::{StaticBandStore, StaticFacilityDirectory};
