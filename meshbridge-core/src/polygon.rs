//! Host-side polygon mesh resource
//!
//! `PolygonMesh` mirrors the layout a modeling host stores meshes in: a vertex
//! array, a flat loop array holding one vertex index per face corner, and a
//! polygon array addressing runs of that loop array. Material slots live on the
//! mesh and each polygon carries an index into them.

use crate::error::{Error, Result};
use crate::point::*;
use serde::{Deserialize, Serialize};

/// Handle to a material resource owned by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MaterialHandle(pub usize);

/// One face of a [`PolygonMesh`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Polygon {
    /// First entry of this face in the loop array
    pub loop_start: usize,
    /// Number of corners
    pub loop_total: usize,
    /// Index into the mesh's material slot list
    pub material_index: usize,
    /// Smooth (true) or flat (false) shading
    pub smooth: bool,
}

/// Editable polygon mesh as owned by the host
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PolygonMesh {
    pub vertices: Vec<Point3f>,
    pub loops: Vec<usize>,
    pub polygons: Vec<Polygon>,
    pub materials: Vec<MaterialHandle>,
    pub face_normals: Vec<Vector3f>,
}

impl PolygonMesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mesh from vertex positions and per-face corner lists
    pub fn from_polygons<I, F>(vertices: Vec<Point3f>, faces: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: AsRef<[usize]>,
    {
        let mut mesh = Self {
            vertices,
            ..Self::default()
        };
        for face in faces {
            mesh.add_polygon(face.as_ref(), 0, false);
        }
        mesh
    }

    /// Append a face and return its index
    pub fn add_polygon(&mut self, corners: &[usize], material_index: usize, smooth: bool) -> usize {
        let index = self.polygons.len();
        self.polygons.push(Polygon {
            loop_start: self.loops.len(),
            loop_total: corners.len(),
            material_index,
            smooth,
        });
        self.loops.extend_from_slice(corners);
        index
    }

    /// Get the number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Get the number of faces
    pub fn polygon_count(&self) -> usize {
        self.polygons.len()
    }

    /// Check if the mesh is empty
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.polygons.is_empty()
    }

    /// Corner vertex indices of face `index`
    pub fn polygon_vertices(&self, index: usize) -> &[usize] {
        let polygon = &self.polygons[index];
        &self.loops[polygon.loop_start..polygon.loop_start + polygon.loop_total]
    }

    pub fn is_triangulated(&self) -> bool {
        self.polygons.iter().all(|p| p.loop_total == 3)
    }

    /// Newell normal of face `index`; `None` for degenerate faces
    pub fn polygon_normal(&self, index: usize) -> Option<Vector3f> {
        newell_normal(
            self.polygon_vertices(index)
                .iter()
                .map(|&v| self.vertices[v]),
        )
    }

    /// Recompute the per-face normal array; degenerate faces get `+Z`
    pub fn recompute_face_normals(&mut self) {
        self.face_normals = (0..self.polygons.len())
            .map(|i| self.polygon_normal(i).unwrap_or_else(Vector3f::z))
            .collect();
    }

    /// Structural validation: loop ranges, vertex indices, corner counts and
    /// material slot indices.
    pub fn validate(&self) -> Result<()> {
        if self.vertices.is_empty() {
            return Err(Error::InvalidData("mesh has no vertices".to_string()));
        }
        if let Some(p) = self.vertices.iter().position(|v| !v.coords.iter().all(|c| c.is_finite())) {
            return Err(Error::InvalidData(format!("vertex {} has a non-finite coordinate", p)));
        }
        for (index, polygon) in self.polygons.iter().enumerate() {
            if polygon.loop_total < 3 {
                return Err(Error::InvalidData(format!(
                    "face {} has only {} corners",
                    index, polygon.loop_total
                )));
            }
            let end = polygon.loop_start + polygon.loop_total;
            if end > self.loops.len() {
                return Err(Error::InvalidData(format!(
                    "face {} addresses loops {}..{} but only {} loops exist",
                    index,
                    polygon.loop_start,
                    end,
                    self.loops.len()
                )));
            }
            if let Some(&v) = self.loops[polygon.loop_start..end]
                .iter()
                .find(|&&v| v >= self.vertices.len())
            {
                return Err(Error::InvalidData(format!(
                    "face {} references vertex {} but only {} vertices exist",
                    index,
                    v,
                    self.vertices.len()
                )));
            }
            if !self.materials.is_empty() && polygon.material_index >= self.materials.len() {
                return Err(Error::InvalidData(format!(
                    "face {} uses material slot {} but only {} slots exist",
                    index,
                    polygon.material_index,
                    self.materials.len()
                )));
            }
        }
        if !self.face_normals.is_empty() && self.face_normals.len() != self.polygons.len() {
            return Err(Error::InvalidData(format!(
                "{} face normals for {} faces",
                self.face_normals.len(),
                self.polygons.len()
            )));
        }
        Ok(())
    }
}

/// Newell's method: robust normal for planar or slightly non-planar polygons
pub fn newell_normal<I>(points: I) -> Option<Vector3f>
where
    I: IntoIterator<Item = Point3f>,
{
    let points: Vec<Point3f> = points.into_iter().collect();
    let n = points.len();
    if n < 3 {
        return None;
    }

    let mut normal = Vector3f::zeros();
    for i in 0..n {
        let current = points[i];
        let next = points[(i + 1) % n];
        normal.x += (current.y - next.y) * (current.z + next.z);
        normal.y += (current.z - next.z) * (current.x + next.x);
        normal.z += (current.x - next.x) * (current.y + next.y);
    }
    normal.try_normalize(f32::EPSILON)
}
