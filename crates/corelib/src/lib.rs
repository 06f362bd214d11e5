//! Core types: math re-exports, bounds and normal helpers.

pub use glam::{DVec2, DVec3, dvec2, dvec3};

pub mod bounds;
pub mod normals;
