//! Spatial indexing over band bounding boxes.

pub mod index;

pub use index::{envelope_of, BandNode};
