//! Band geometry encoding and containment.

pub mod codec;
pub mod contains;

pub use codec::{decode, encode, EncodedGeometry, GeometryFormat};
pub use contains::{contains, ring_contains};
