//! Vertex and face counts of the selected mesh objects

use meshbridge_core::{Drawable, Point3f, Result};
use meshbridge_scene::{Host, ObjectId, ObjectKind};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectStats {
    pub object: ObjectId,
    pub name: String,
    pub vertices: usize,
    pub faces: usize,
    /// Triangles after fan-splitting every face
    pub triangles: usize,
    /// World-space bounding box, `(min, max)`
    pub bounds: (Point3f, Point3f),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SceneStats {
    pub objects: Vec<ObjectStats>,
    pub total_vertices: usize,
    pub total_faces: usize,
}

impl SceneStats {
    /// Statistics of every selected mesh object; other selected objects are skipped
    pub fn collect<H: Host + ?Sized>(host: &H) -> Result<Self> {
        let mut stats = Self::default();
        for object in host.selected_objects() {
            if host.object_kind(object)? != ObjectKind::Mesh {
                continue;
            }
            let mesh = host.mesh(object)?;
            let transform = host.read_transform(object)?;
            let entry = ObjectStats {
                object,
                name: host.object_name(object)?,
                vertices: mesh.vertex_count(),
                faces: mesh.polygon_count(),
                triangles: mesh.polygons.iter().map(|p| p.loop_total.saturating_sub(2)).sum(),
                bounds: mesh.world_bounding_box(&transform),
            };
            stats.total_vertices += entry.vertices;
            stats.total_faces += entry.faces;
            stats.objects.push(entry);
        }
        log::debug!(
            "{} selected meshes, {} vertices, {} faces",
            stats.objects.len(),
            stats.total_vertices,
            stats.total_faces
        );
        Ok(stats)
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshbridge_core::{PolygonMesh, TransformState, Vector3f};
    use meshbridge_scene::InMemoryScene;

    fn quad() -> PolygonMesh {
        PolygonMesh::from_polygons(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(1.0, 1.0, 0.0),
                Point3f::new(0.0, 1.0, 0.0),
            ],
            [[0usize, 1, 2, 3]],
        )
    }

    #[test]
    fn test_counts_selected_meshes_only() {
        let mut scene = InMemoryScene::new();
        let a = scene.add_mesh_object("A", quad(), TransformState::identity()).unwrap();
        let moved = TransformState::new(
            Vector3f::new(10.0, 0.0, 0.0),
            Vector3f::zeros(),
            Vector3f::new(2.0, 2.0, 2.0),
        );
        let b = scene.add_mesh_object("B", quad(), moved).unwrap();
        let _unselected = scene.add_mesh_object("C", quad(), TransformState::identity()).unwrap();
        let empty = scene.add_empty("Empty").unwrap();
        for id in [a, b, empty] {
            scene.select(id).unwrap();
        }

        let stats = SceneStats::collect(&scene).unwrap();
        assert_eq!(stats.objects.len(), 2);
        assert_eq!(stats.total_vertices, 8);
        assert_eq!(stats.total_faces, 2);
        assert_eq!(stats.objects[0].triangles, 2);

        let (min, max) = stats.objects[1].bounds;
        approx::assert_relative_eq!(min, Point3f::new(10.0, 0.0, 0.0), epsilon = 1e-5);
        approx::assert_relative_eq!(max, Point3f::new(12.0, 2.0, 0.0), epsilon = 1e-5);
    }

    #[test]
    fn test_nothing_selected() {
        let scene = InMemoryScene::new();
        assert!(SceneStats::collect(&scene).unwrap().is_empty());
    }
}
