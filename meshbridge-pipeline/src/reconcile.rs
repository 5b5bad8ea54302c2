//! Applying engine results back onto the scene
//!
//! Segmentation is additive: materials are appended and face slot indices
//! written, geometry is untouched. Simplification is destructive and goes
//! through [`ObjectReplacer`].

use crate::codec;
use crate::palette::MaterialPalette;
use crate::replace::ObjectReplacer;
use meshbridge_core::{Error, MaterialHandle, Result};
use meshbridge_engine::{SegmentationResult, SimplificationResult};
use meshbridge_scene::{Host, ObjectId};

/// Name given to every segment material; the host may make it unique
pub const SEGMENT_MATERIAL_NAME: &str = "Material";

/// Materials added by a segmentation
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialAssignment {
    /// Slot index of segment 0
    pub offset: usize,
    /// One material per segment, in segment order
    pub materials: Vec<MaterialHandle>,
}

#[derive(Debug, Clone, Default)]
pub struct ResultReconciler {
    replacer: ObjectReplacer,
}

impl ResultReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Give every segment its own material and point each face at it.
    ///
    /// The result is checked against the mesh before anything is changed; with
    /// `delete_existing_materials` the object's slot list is emptied first.
    pub fn apply_segmentation<H: Host + ?Sized>(
        &self,
        host: &mut H,
        object: ObjectId,
        result: &SegmentationResult,
        palette: &MaterialPalette,
        delete_existing_materials: bool,
    ) -> Result<MaterialAssignment> {
        let face_count = host.mesh(object)?.polygon_count();
        if result.segment_ids().len() != face_count {
            return Err(Error::MalformedResult(format!(
                "{} segment ids for a mesh with {} faces",
                result.segment_ids().len(),
                face_count
            )));
        }
        if palette.len() < result.segment_count() {
            return Err(Error::InvalidParameter(format!(
                "palette has {} colours for {} segments",
                palette.len(),
                result.segment_count()
            )));
        }

        if delete_existing_materials {
            log::info!("Discarding existing materials of object {}", object.0);
            host.clear_materials(object)?;
        }
        let offset = host.mesh(object)?.materials.len();

        let mut materials = Vec::with_capacity(result.segment_count());
        for (segment, color) in palette.colors()[..result.segment_count()].iter().enumerate() {
            let handle = host.create_material(SEGMENT_MATERIAL_NAME, *color);
            let slot = host.append_material(object, handle)?;
            debug_assert_eq!(slot, offset + segment);
            materials.push(handle);
        }

        let mesh = host.mesh_mut(object)?;
        for (polygon, &segment) in mesh.polygons.iter_mut().zip(result.segment_ids()) {
            polygon.material_index = segment + offset;
        }
        log::debug!(
            "Assigned {} segment materials to object {} from slot {}",
            materials.len(),
            object.0,
            offset
        );

        Ok(MaterialAssignment { offset, materials })
    }

    /// Replace `object` with a new one built from the decimated snapshot.
    ///
    /// Name and transform are captured from the original first. The material
    /// slot list is carried over; every face uses the first slot.
    pub fn apply_simplification<H: Host + ?Sized>(
        &self,
        host: &mut H,
        object: ObjectId,
        result: SimplificationResult,
    ) -> Result<ObjectId> {
        let transform = host.read_transform(object)?;
        let name = host.object_name(object)?;
        let slots = host.mesh(object)?.materials.clone();

        let mut mesh = codec::apply(result.snapshot())?;
        mesh.materials = slots;

        self.replacer.replace(host, object, mesh, transform, &name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshbridge_core::{Point3f, PolygonMesh, TransformState};
    use meshbridge_scene::InMemoryScene;

    fn strip() -> PolygonMesh {
        PolygonMesh::from_polygons(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(1.0, 1.0, 0.0),
                Point3f::new(0.0, 1.0, 0.0),
                Point3f::new(2.0, 0.0, 0.0),
            ],
            [[0usize, 1, 2], [0, 2, 3], [1, 4, 2]],
        )
    }

    fn scene_with_materials(existing: usize) -> (InMemoryScene, ObjectId) {
        let mut scene = InMemoryScene::new();
        let id = scene.add_mesh_object("Strip", strip(), TransformState::identity()).unwrap();
        for i in 0..existing {
            let handle = scene.create_material("Paint", [0.5, 0.5, 0.5, 1.0]);
            scene.append_material(id, handle).unwrap();
            scene.mesh_mut(id).unwrap().polygons[i % 3].material_index = i;
        }
        (scene, id)
    }

    #[test]
    fn test_offset_past_existing_materials() {
        let (mut scene, id) = scene_with_materials(2);
        let result = SegmentationResult::new(vec![0, 1, 1], 2, 3).unwrap();
        let assignment = ResultReconciler::new()
            .apply_segmentation(&mut scene, id, &result, &MaterialPalette::preset(2), false)
            .unwrap();

        assert_eq!(assignment.offset, 2);
        let mesh = scene.mesh(id).unwrap();
        assert_eq!(mesh.materials.len(), 4);
        let slots: Vec<usize> = mesh.polygons.iter().map(|p| p.material_index).collect();
        assert_eq!(slots, vec![2, 3, 3]);
        assert_eq!(
            scene.material(mesh.materials[3]).unwrap().diffuse_color,
            [0.0, 1.0, 0.0, 1.0]
        );
    }

    #[test]
    fn test_delete_existing_materials() {
        let (mut scene, id) = scene_with_materials(2);
        let result = SegmentationResult::new(vec![1, 0, 1], 2, 3).unwrap();
        let assignment = ResultReconciler::new()
            .apply_segmentation(&mut scene, id, &result, &MaterialPalette::preset(2), true)
            .unwrap();

        assert_eq!(assignment.offset, 0);
        let mesh = scene.mesh(id).unwrap();
        assert_eq!(mesh.materials, assignment.materials);
        let slots: Vec<usize> = mesh.polygons.iter().map(|p| p.material_index).collect();
        assert_eq!(slots, vec![1, 0, 1]);
    }

    #[test]
    fn test_mismatched_result_changes_nothing() {
        let (mut scene, id) = scene_with_materials(1);
        let before = scene.mesh(id).unwrap().clone();
        let result = SegmentationResult::new(vec![0, 1], 2, 2).unwrap();

        let err = ResultReconciler::new()
            .apply_segmentation(&mut scene, id, &result, &MaterialPalette::preset(2), true)
            .unwrap_err();
        assert!(matches!(err, Error::MalformedResult(_)));
        assert_eq!(scene.mesh(id).unwrap(), &before);
        assert_eq!(scene.materials().len(), 1);
    }
}
