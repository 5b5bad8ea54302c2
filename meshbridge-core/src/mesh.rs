//! Canonical geometric snapshot handed to the geometry engine

use crate::error::{Error, Result};
use crate::point::*;
use serde::{Deserialize, Serialize};

/// Immutable flat representation of a triangulated mesh.
///
/// Vertex order is the handle faces reference by; face order only matters for
/// one-to-one correspondence with per-face result arrays such as segment ids.
/// Every face index is guaranteed to be `< vertices.len()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSnapshot")]
pub struct GeometrySnapshot {
    vertices: Vec<Point3f>,
    faces: Vec<[usize; 3]>,
}

#[derive(Deserialize)]
struct RawSnapshot {
    vertices: Vec<Point3f>,
    faces: Vec<[usize; 3]>,
}

impl TryFrom<RawSnapshot> for GeometrySnapshot {
    type Error = Error;

    fn try_from(raw: RawSnapshot) -> Result<Self> {
        GeometrySnapshot::new(raw.vertices, raw.faces)
    }
}

impl GeometrySnapshot {
    /// Build a snapshot, checking that every face references an existing vertex
    pub fn new(vertices: Vec<Point3f>, faces: Vec<[usize; 3]>) -> Result<Self> {
        let vertex_count = vertices.len();
        if let Some((face, corner)) = faces.iter().enumerate().find_map(|(fi, face)| {
            face.iter().find(|&&v| v >= vertex_count).map(|&v| (fi, v))
        }) {
            return Err(Error::InvalidData(format!(
                "face {} references vertex {} but only {} vertices exist",
                face, corner, vertex_count
            )));
        }
        Ok(Self { vertices, faces })
    }

    /// Build a snapshot from flat coordinate and index buffers
    /// (`3 * N` coordinates, `3 * F` indices).
    pub fn from_flat(coordinates: &[f64], indices: &[u32]) -> Result<Self> {
        if coordinates.len() % 3 != 0 {
            return Err(Error::InvalidData(format!(
                "vertex buffer length {} is not a multiple of 3",
                coordinates.len()
            )));
        }
        if indices.len() % 3 != 0 {
            return Err(Error::InvalidData(format!(
                "face buffer length {} is not a multiple of 3",
                indices.len()
            )));
        }
        if let Some(bad) = coordinates.iter().find(|c| !c.is_finite()) {
            return Err(Error::InvalidData(format!("non-finite coordinate {}", bad)));
        }

        let vertices = coordinates
            .chunks_exact(3)
            .map(|c| Point3f::new(c[0] as f32, c[1] as f32, c[2] as f32))
            .collect();
        let faces = indices
            .chunks_exact(3)
            .map(|f| [f[0] as usize, f[1] as usize, f[2] as usize])
            .collect();
        Self::new(vertices, faces)
    }

    pub fn vertices(&self) -> &[Point3f] {
        &self.vertices
    }

    pub fn faces(&self) -> &[[usize; 3]] {
        &self.faces
    }

    /// Get the number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Get the number of faces
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Check if the snapshot is empty
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.faces.is_empty()
    }

    /// Vertex coordinates as a flat `[x0, y0, z0, x1, ...]` buffer
    pub fn flat_vertices(&self) -> Vec<f64> {
        self.vertices
            .iter()
            .flat_map(|p| [p.x as f64, p.y as f64, p.z as f64])
            .collect()
    }

    /// Face indices as a flat `[a0, b0, c0, a1, ...]` buffer
    pub fn flat_faces(&self) -> Vec<u32> {
        self.faces
            .iter()
            .flat_map(|f| [f[0] as u32, f[1] as u32, f[2] as u32])
            .collect()
    }

    /// Calculate face normals; degenerate faces get `+Z`
    pub fn face_normals(&self) -> Vec<Vector3f> {
        self.faces
            .iter()
            .map(|face| {
                let v0 = self.vertices[face[0]];
                let edge1 = self.vertices[face[1]] - v0;
                let edge2 = self.vertices[face[2]] - v0;
                edge1
                    .cross(&edge2)
                    .try_normalize(f32::EPSILON)
                    .unwrap_or_else(Vector3f::z)
            })
            .collect()
    }
}
