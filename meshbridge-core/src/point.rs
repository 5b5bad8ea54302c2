//! Point, vector and colour types

use nalgebra::{Point3, Vector3};

/// A 3D point with floating point coordinates
pub type Point3f = Point3<f32>;

/// A 3D vector with floating point components
pub type Vector3f = Vector3<f32>;

/// Linear RGBA colour, each channel in `[0, 1]`
pub type Rgba = [f32; 4];
