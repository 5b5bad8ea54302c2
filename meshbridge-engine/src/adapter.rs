//! The single point where requests leave the host and results come back
//!
//! Kernel failures become [`Error::EngineFailure`], wrong-shaped answers
//! become [`Error::MalformedResult`]. There is no retry.

use crate::request::{SegmentationRequest, SegmentationResult, SimplificationRequest, SimplificationResult};
use crate::wire::WireResponse;
use crate::GeometryEngine;
use meshbridge_core::{Error, GeometrySnapshot, Result};
use std::time::Instant;

pub struct EngineAdapter<E> {
    engine: E,
}

fn transport_error(operation: &str, error: Error) -> Error {
    match error {
        Error::EngineFailure(_) | Error::MalformedResult(_) => error,
        other => Error::EngineFailure(format!("{} transport failed: {}", operation, other)),
    }
}

impl<E: GeometryEngine> EngineAdapter<E> {
    pub fn new(engine: E) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn into_inner(self) -> E {
        self.engine
    }

    /// Label every face of the request's snapshot
    pub fn segment(&mut self, request: &SegmentationRequest<'_>) -> Result<SegmentationResult> {
        let start = Instant::now();
        let wire = request.to_wire();
        let response = self
            .engine
            .call(&wire)
            .map_err(|e| transport_error("segmentation", e))?;
        log::info!(
            "Segmentation of {} faces answered in {:.2?}",
            request.snapshot().face_count(),
            start.elapsed()
        );

        match response {
            WireResponse::Segmentation {
                segment_ids,
                segment_count,
            } => SegmentationResult::new(
                segment_ids.into_iter().map(|id| id as usize).collect(),
                segment_count as usize,
                request.snapshot().face_count(),
            ),
            WireResponse::Failure { message } => Err(Error::EngineFailure(message)),
            WireResponse::Simplification { .. } => Err(Error::MalformedResult(
                "engine answered a segmentation request with a simplification".to_string(),
            )),
        }
    }

    /// Decimate the request's snapshot into a new one
    pub fn simplify(&mut self, request: &SimplificationRequest<'_>) -> Result<SimplificationResult> {
        let start = Instant::now();
        let wire = request.to_wire();
        let response = self
            .engine
            .call(&wire)
            .map_err(|e| transport_error("simplification", e))?;
        log::info!(
            "Simplification of {} faces answered in {:.2?}",
            request.snapshot().face_count(),
            start.elapsed()
        );

        match response {
            WireResponse::Simplification { vertices, faces } => {
                let snapshot = GeometrySnapshot::from_flat(&vertices, &faces)
                    .map_err(|e| Error::MalformedResult(e.to_string()))?;
                Ok(SimplificationResult::new(snapshot))
            }
            WireResponse::Failure { message } => Err(Error::EngineFailure(message)),
            WireResponse::Segmentation { .. } => Err(Error::MalformedResult(
                "engine answered a simplification request with a segmentation".to_string(),
            )),
        }
    }
}
