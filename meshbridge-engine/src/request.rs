//! Typed engine requests and results
//!
//! Parameter ranges are checked once when a request is built; results are
//! checked once when they are decoded. Nothing downstream re-validates.

use crate::wire::WireRequest;
use meshbridge_core::{Error, GeometrySnapshot, Result};
use std::ops::RangeInclusive;

/// Accepted number of segmentation clusters
pub const CLUSTER_RANGE: RangeInclusive<u32> = 2..=10;

/// Accepted range of the smoothness and decimation factor scalars
pub const UNIT_RANGE: RangeInclusive<f32> = 0.0..=1.0;

fn check_unit(name: &str, value: f32) -> Result<()> {
    if !UNIT_RANGE.contains(&value) {
        return Err(Error::InvalidParameter(format!(
            "{} must be within [0, 1], got {}",
            name, value
        )));
    }
    Ok(())
}

fn check_snapshot(snapshot: &GeometrySnapshot) -> Result<()> {
    if snapshot.is_empty() {
        return Err(Error::InvalidData(
            "cannot send an empty mesh to the geometry engine".to_string(),
        ));
    }
    Ok(())
}

/// Segmentation of a snapshot into labelled regions
#[derive(Debug, Clone, Copy)]
pub struct SegmentationRequest<'a> {
    snapshot: &'a GeometrySnapshot,
    clusters: u32,
    smoothness: f32,
}

impl<'a> SegmentationRequest<'a> {
    pub fn new(snapshot: &'a GeometrySnapshot, clusters: u32, smoothness: f32) -> Result<Self> {
        check_snapshot(snapshot)?;
        if !CLUSTER_RANGE.contains(&clusters) {
            return Err(Error::InvalidParameter(format!(
                "clusters must be within [{}, {}], got {}",
                CLUSTER_RANGE.start(),
                CLUSTER_RANGE.end(),
                clusters
            )));
        }
        check_unit("smoothness", smoothness)?;
        Ok(Self {
            snapshot,
            clusters,
            smoothness,
        })
    }

    pub fn snapshot(&self) -> &'a GeometrySnapshot {
        self.snapshot
    }

    pub fn clusters(&self) -> u32 {
        self.clusters
    }

    pub fn smoothness(&self) -> f32 {
        self.smoothness
    }

    pub fn to_wire(&self) -> WireRequest {
        WireRequest::Segmentation {
            vertices: self.snapshot.flat_vertices(),
            faces: self.snapshot.flat_faces(),
            clusters: self.clusters,
            smoothness: self.smoothness as f64,
        }
    }
}

/// Per-face segment labels, in the order of the request's faces
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentationResult {
    segment_ids: Vec<usize>,
    segment_count: usize,
}

impl SegmentationResult {
    /// Check the label array against the request it answers: one id per face,
    /// every id below `segment_count`, and the highest id equal to
    /// `segment_count - 1`.
    pub fn new(segment_ids: Vec<usize>, segment_count: usize, face_count: usize) -> Result<Self> {
        if segment_ids.len() != face_count {
            return Err(Error::MalformedResult(format!(
                "engine returned {} segment ids for {} faces",
                segment_ids.len(),
                face_count
            )));
        }
        let max = segment_ids.iter().copied().max();
        match max {
            Some(max) if max + 1 != segment_count => Err(Error::MalformedResult(format!(
                "highest segment id is {} but the engine reported {} segments",
                max, segment_count
            ))),
            None if segment_count != 0 => Err(Error::MalformedResult(format!(
                "no segment ids for {} reported segments",
                segment_count
            ))),
            _ => Ok(Self {
                segment_ids,
                segment_count,
            }),
        }
    }

    pub fn segment_ids(&self) -> &[usize] {
        &self.segment_ids
    }

    pub fn segment_count(&self) -> usize {
        self.segment_count
    }
}

/// Decimation of a snapshot
#[derive(Debug, Clone, Copy)]
pub struct SimplificationRequest<'a> {
    snapshot: &'a GeometrySnapshot,
    decimation_factor: f32,
}

impl<'a> SimplificationRequest<'a> {
    pub fn new(snapshot: &'a GeometrySnapshot, decimation_factor: f32) -> Result<Self> {
        check_snapshot(snapshot)?;
        check_unit("decimation factor", decimation_factor)?;
        Ok(Self {
            snapshot,
            decimation_factor,
        })
    }

    pub fn snapshot(&self) -> &'a GeometrySnapshot {
        self.snapshot
    }

    pub fn decimation_factor(&self) -> f32 {
        self.decimation_factor
    }

    pub fn to_wire(&self) -> WireRequest {
        WireRequest::Simplification {
            vertices: self.snapshot.flat_vertices(),
            faces: self.snapshot.flat_faces(),
            decimation_factor: self.decimation_factor as f64,
        }
    }
}

/// A brand-new snapshot with no index correspondence to the request
#[derive(Debug, Clone, PartialEq)]
pub struct SimplificationResult {
    snapshot: GeometrySnapshot,
}

impl SimplificationResult {
    pub fn new(snapshot: GeometrySnapshot) -> Self {
        Self { snapshot }
    }

    pub fn snapshot(&self) -> &GeometrySnapshot {
        &self.snapshot
    }

    pub fn into_snapshot(self) -> GeometrySnapshot {
        self.snapshot
    }
}
