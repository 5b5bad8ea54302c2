//! Flat request/response layout exchanged with the geometry engine
//!
//! Vertices travel as `3 * N` coordinates, faces as `3 * F` vertex indices.
//! The JSON encoding tags requests by `operation` and responses by `status`:
//!
//! ```json
//! {"operation":"simplification","vertices":[0.0,0.0,0.0, ...],"faces":[0,1,2, ...],"decimation_factor":0.5}
//! {"status":"failure","message":"mesh is not an oriented 2-manifold"}
//! ```

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum WireRequest {
    Segmentation {
        vertices: Vec<f64>,
        faces: Vec<u32>,
        clusters: u32,
        smoothness: f64,
    },
    Simplification {
        vertices: Vec<f64>,
        faces: Vec<u32>,
        decimation_factor: f64,
    },
}

impl WireRequest {
    pub fn operation(&self) -> &'static str {
        match self {
            WireRequest::Segmentation { .. } => "segmentation",
            WireRequest::Simplification { .. } => "simplification",
        }
    }

    /// Flat vertex and face buffers of the request
    pub fn buffers(&self) -> (&[f64], &[u32]) {
        match self {
            WireRequest::Segmentation { vertices, faces, .. }
            | WireRequest::Simplification { vertices, faces, .. } => {
                (vertices.as_slice(), faces.as_slice())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WireResponse {
    Segmentation {
        segment_ids: Vec<u32>,
        segment_count: u32,
    },
    Simplification {
        vertices: Vec<f64>,
        faces: Vec<u32>,
    },
    Failure {
        message: String,
    },
}

impl WireResponse {
    pub fn failure<S: Into<String>>(message: S) -> Self {
        WireResponse::Failure {
            message: message.into(),
        }
    }
}
