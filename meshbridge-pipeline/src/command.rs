//! Command interface over the whole pipeline
//!
//! normalize (working copy) -> extract -> engine -> reconcile. The engine is
//! called before any change to the scene; a failure anywhere up to and
//! including the engine call leaves the object, its mesh and its materials
//! untouched.

use crate::codec;
use crate::config::PipelineConfig;
use crate::normalizer::{MeshNormalizer, NormalizeReport};
use crate::palette::MaterialPalette;
use crate::params::{SegmentationParams, SimplificationParams};
use crate::reconcile::ResultReconciler;
use crate::stats::SceneStats;
use meshbridge_core::Result;
use meshbridge_engine::{EngineAdapter, GeometryEngine, SegmentationRequest, SimplificationRequest};
use meshbridge_scene::{Host, InteractionMode, ObjectId};
use serde::{Deserialize, Serialize};

/// A user-triggered action
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    Segment(SegmentationParams),
    Simplify(SimplificationParams),
    Stats,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentationReport {
    pub object: ObjectId,
    pub segment_count: usize,
    /// Material slot of segment 0
    pub material_offset: usize,
    pub faces: usize,
    pub normalization: NormalizeReport,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimplificationReport {
    /// The replacement object
    pub object: ObjectId,
    pub name: String,
    pub vertices_before: usize,
    pub vertices_after: usize,
    pub faces_before: usize,
    pub faces_after: usize,
    pub normalization: NormalizeReport,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandOutcome {
    Segmented(SegmentationReport),
    Simplified(SimplificationReport),
    Stats(SceneStats),
}

pub struct Pipeline<E> {
    config: PipelineConfig,
    normalizer: MeshNormalizer,
    adapter: EngineAdapter<E>,
    reconciler: ResultReconciler,
}

impl<E: GeometryEngine> Pipeline<E> {
    pub fn new(engine: E) -> Self {
        Self::with_config(engine, PipelineConfig::default())
    }

    pub fn with_config(engine: E, config: PipelineConfig) -> Self {
        Self {
            normalizer: MeshNormalizer::from_config(&config),
            config,
            adapter: EngineAdapter::new(engine),
            reconciler: ResultReconciler::new(),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn engine(&self) -> &E {
        self.adapter.engine()
    }

    pub fn engine_mut(&mut self) -> &mut E {
        self.adapter.engine_mut()
    }

    pub fn into_engine(self) -> E {
        self.adapter.into_inner()
    }

    pub fn execute<H: Host + ?Sized>(&mut self, host: &mut H, command: Command) -> Result<CommandOutcome> {
        match command {
            Command::Segment(params) => self.segment(host, &params).map(CommandOutcome::Segmented),
            Command::Simplify(params) => self.simplify(host, &params).map(CommandOutcome::Simplified),
            Command::Stats => self.stats(host).map(CommandOutcome::Stats),
        }
    }

    /// Segment the active mesh and colour each segment with its own material
    pub fn segment<H: Host + ?Sized>(
        &mut self,
        host: &mut H,
        params: &SegmentationParams,
    ) -> Result<SegmentationReport> {
        let params = params.resolve(self.config.validate_parameters)?;
        let prepared = self.normalizer.prepare(host)?;
        let object = prepared.object;

        let snapshot = codec::extract(&prepared.mesh)?;
        let request = SegmentationRequest::new(&snapshot, params.clusters, params.smoothness)?;
        let result = self.adapter.segment(&request)?;
        let palette = MaterialPalette::from_kind(self.config.palette, result.segment_count());

        let normalization = MeshNormalizer::commit(host, prepared)?;
        let assignment = self.reconciler.apply_segmentation(
            host,
            object,
            &result,
            &palette,
            params.delete_existing_materials,
        )?;

        log::info!(
            "Segmented object {} into {} segments",
            object.0,
            result.segment_count()
        );
        Ok(SegmentationReport {
            object,
            segment_count: result.segment_count(),
            material_offset: assignment.offset,
            faces: snapshot.face_count(),
            normalization,
        })
    }

    /// Replace the active mesh object with a decimated copy
    pub fn simplify<H: Host + ?Sized>(
        &mut self,
        host: &mut H,
        params: &SimplificationParams,
    ) -> Result<SimplificationReport> {
        let params = params.resolve(self.config.validate_parameters)?;
        let prepared = self.normalizer.prepare(host)?;
        let object = prepared.object;

        let snapshot = codec::extract(&prepared.mesh)?;
        let request = SimplificationRequest::new(&snapshot, params.decimation_factor)?;
        let result = self.adapter.simplify(&request)?;
        let (vertices_after, faces_after) =
            (result.snapshot().vertex_count(), result.snapshot().face_count());

        if host.interaction_mode() == InteractionMode::ElementLevel {
            log::info!("Leaving element editing to replace object {}", object.0);
            host.set_interaction_mode(InteractionMode::ObjectLevel);
        }
        let replacement = self.reconciler.apply_simplification(host, object, result)?;

        let name = host.object_name(replacement)?;
        log::info!(
            "Simplified \"{}\": {} -> {} faces",
            name,
            snapshot.face_count(),
            faces_after
        );
        Ok(SimplificationReport {
            object: replacement,
            name,
            vertices_before: snapshot.vertex_count(),
            vertices_after,
            faces_before: snapshot.face_count(),
            faces_after,
            normalization: prepared.report,
        })
    }

    pub fn stats<H: Host + ?Sized>(&self, host: &H) -> Result<SceneStats> {
        SceneStats::collect(host)
    }
}
