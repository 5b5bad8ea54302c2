//! Core data structures and traits for meshbridge
//!
//! This crate provides the value types shared by every stage of the mesh
//! interchange pipeline: the engine-facing [`GeometrySnapshot`], the host-side
//! [`PolygonMesh`], the [`TransformState`] captured around destructive edits,
//! and the error taxonomy.

pub mod point;
pub mod mesh;
pub mod polygon;
pub mod traits;
pub mod transform;
pub mod error;

pub use point::*;
pub use mesh::*;
pub use polygon::*;
pub use traits::*;
pub use transform::*;
pub use error::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Point3, Vector3, Matrix4};
