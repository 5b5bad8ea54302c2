//! In-process geometry kernel
//!
//! Answers wire requests with the shape-diameter segmenter and the quadric
//! edge-collapse decimator. Kernel errors are reported as failure responses,
//! the same way an out-of-process kernel reports them.

use crate::edge_collapse::QuadricDecimator;
use crate::shape_diameter::ShapeDiameterSegmenter;
use crate::wire::{WireRequest, WireResponse};
use crate::GeometryEngine;
use meshbridge_core::{Error, GeometrySnapshot, Result};
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct LocalEngine {
    pub decimator: QuadricDecimator,
    pub segmenter: ShapeDiameterSegmenter,
}

/// Every directed edge used at most once and every edge shared by at most two faces
fn check_oriented_manifold(snapshot: &GeometrySnapshot) -> Result<()> {
    let mut directed: HashMap<(usize, usize), usize> = HashMap::new();
    for (fi, face) in snapshot.faces().iter().enumerate() {
        if face[0] == face[1] || face[1] == face[2] || face[2] == face[0] {
            return Err(Error::InvalidData(format!("face {} repeats a vertex", fi)));
        }
        for j in 0..3 {
            let edge = (face[j], face[(j + 1) % 3]);
            if let Some(other) = directed.insert(edge, fi) {
                return Err(Error::InvalidData(format!(
                    "edge ({}, {}) is used by faces {} and {} with the same orientation",
                    edge.0, edge.1, other, fi
                )));
            }
        }
    }
    Ok(())
}

impl LocalEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn run(&self, request: &WireRequest) -> Result<WireResponse> {
        let (vertices, faces) = request.buffers();
        let snapshot = GeometrySnapshot::from_flat(vertices, faces)?;

        match request {
            WireRequest::Segmentation {
                clusters, smoothness, ..
            } => {
                let (ids, count) =
                    self.segmenter
                        .segment(&snapshot, *clusters as usize, *smoothness as f32)?;
                Ok(WireResponse::Segmentation {
                    segment_ids: ids.into_iter().map(|id| id as u32).collect(),
                    segment_count: count as u32,
                })
            }
            WireRequest::Simplification {
                decimation_factor, ..
            } => {
                check_oriented_manifold(&snapshot)?;
                let decimated = self.decimator.decimate(&snapshot, *decimation_factor as f32)?;
                Ok(WireResponse::Simplification {
                    vertices: decimated.flat_vertices(),
                    faces: decimated.flat_faces(),
                })
            }
        }
    }
}

impl GeometryEngine for LocalEngine {
    fn call(&mut self, request: &WireRequest) -> Result<WireResponse> {
        match self.run(request) {
            Ok(response) => Ok(response),
            Err(e) => {
                log::warn!("Local {} failed: {}", request.operation(), e);
                Ok(WireResponse::failure(e.to_string()))
            }
        }
    }
}
