//! Mesh normalization
//!
//! Establishes the structural guarantees the geometry engine relies on: no two
//! vertices closer than the merge distance and every face a triangle.
//! [`MeshNormalizer::normalize`] changes a mesh in place. The pipeline works on
//! a prepared copy and commits it to the live object once the engine has
//! answered, so the triangulation sticks only when the operation succeeds.

use crate::config::{ModePolicy, PipelineConfig};
use meshbridge_core::{newell_normal, Error, Point3f, PolygonMesh, Result, Vector3f};
use meshbridge_scene::{Host, InteractionMode, ObjectId, ObjectKind};
use serde::Serialize;
use std::collections::HashMap;

/// What a normalization pass changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NormalizeReport {
    /// Vertices fused into a nearby representative
    pub merged_vertices: usize,
    /// Faces left with fewer than 3 distinct corners after welding
    pub dropped_polygons: usize,
    /// Faces with more than 3 corners that were split
    pub triangulated_polygons: usize,
    /// Triangles produced from those faces
    pub added_triangles: usize,
}

impl NormalizeReport {
    /// True when the mesh already satisfied every guarantee
    pub fn is_unchanged(&self) -> bool {
        *self == Self::default()
    }
}

/// A normalized working copy of an object's mesh
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedMesh {
    pub object: ObjectId,
    pub mesh: PolygonMesh,
    pub report: NormalizeReport,
}

#[derive(Debug, Clone)]
pub struct MeshNormalizer {
    pub merge_distance: f32,
    pub recompute_normals: bool,
    pub mode_policy: ModePolicy,
}

impl Default for MeshNormalizer {
    fn default() -> Self {
        Self {
            merge_distance: 1e-4,
            recompute_normals: true,
            mode_policy: ModePolicy::Reject,
        }
    }
}

/// Cell indices stay far enough from `i64::MAX` that neighbour offsets cannot overflow
const CELL_LIMIT: f32 = 1e18;

/// Grid cell of `p`, or `None` when the index is out of range
fn cell_of(p: &Point3f, cell_size: f32) -> Option<(i64, i64, i64)> {
    let index = |c: f32| {
        let i = (c / cell_size).floor();
        (i.abs() < CELL_LIMIT).then_some(i as i64)
    };
    Some((index(p.x)?, index(p.y)?, index(p.z)?))
}

fn exact_duplicates(vertices: &[Point3f]) -> (Vec<usize>, usize) {
    let mut remap: Vec<usize> = (0..vertices.len()).collect();
    let mut merged = 0;
    let mut first: HashMap<[u32; 3], usize> = HashMap::new();
    for (i, v) in vertices.iter().enumerate() {
        let key = [v.x.to_bits(), v.y.to_bits(), v.z.to_bits()];
        let representative = *first.entry(key).or_insert(i);
        if representative != i {
            remap[i] = representative;
            merged += 1;
        }
    }
    (remap, merged)
}

/// Representative of every vertex after welding, and the number of vertices merged away.
/// A zero distance only fuses exact duplicates.
fn weld_map(vertices: &[Point3f], epsilon: f32) -> (Vec<usize>, usize) {
    if epsilon <= 0.0 {
        return exact_duplicates(vertices);
    }

    let cell_size = epsilon * 2.0;
    let Some(cells) = vertices
        .iter()
        .map(|v| cell_of(v, cell_size))
        .collect::<Option<Vec<_>>>()
    else {
        log::warn!(
            "Merge distance {} is too small for the mesh coordinates, fusing exact duplicates only",
            epsilon
        );
        return exact_duplicates(vertices);
    };

    let mut grid: HashMap<(i64, i64, i64), Vec<usize>> = HashMap::new();
    for (i, &cell) in cells.iter().enumerate() {
        grid.entry(cell).or_default().push(i);
    }

    let mut remap: Vec<usize> = (0..vertices.len()).collect();
    let mut merged = 0;
    for (i, v) in vertices.iter().enumerate() {
        if remap[i] != i {
            continue;
        }
        let (cx, cy, cz) = cells[i];
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let Some(candidates) = grid.get(&(cx + dx, cy + dy, cz + dz)) else {
                        continue;
                    };
                    for &j in candidates {
                        if j <= i || remap[j] != j {
                            continue;
                        }
                        if (vertices[j] - v).norm() <= epsilon {
                            remap[j] = i;
                            merged += 1;
                        }
                    }
                }
            }
        }
    }

    // resolve chains to their root
    for i in 0..remap.len() {
        let mut root = remap[i];
        while remap[root] != root {
            root = remap[root];
        }
        remap[i] = root;
    }
    (remap, merged)
}

fn point_in_triangle_2d(p: (f32, f32), a: (f32, f32), b: (f32, f32), c: (f32, f32)) -> bool {
    let sign = |p1: (f32, f32), p2: (f32, f32), p3: (f32, f32)| {
        (p1.0 - p3.0) * (p2.1 - p3.1) - (p2.0 - p3.0) * (p1.1 - p3.1)
    };
    let d1 = sign(p, a, b);
    let d2 = sign(p, b, c);
    let d3 = sign(p, c, a);
    let has_neg = d1 < 0.0 || d2 < 0.0 || d3 < 0.0;
    let has_pos = d1 > 0.0 || d2 > 0.0 || d3 > 0.0;
    !(has_neg && has_pos)
}

/// Drop the coordinate most aligned with `normal`
fn project(p: &Point3f, normal: &Vector3f) -> (f32, f32) {
    let n = normal.abs();
    if n.z >= n.x && n.z >= n.y {
        (p.x, p.y)
    } else if n.y >= n.x {
        (p.x, p.z)
    } else {
        (p.y, p.z)
    }
}

fn is_ear(
    vertices: &[Point3f],
    corners: &[usize],
    remaining: &[usize],
    (prev, curr, next): (usize, usize, usize),
    normal: &Vector3f,
) -> bool {
    let a = vertices[corners[prev]];
    let b = vertices[corners[curr]];
    let c = vertices[corners[next]];

    let Some(tri_normal) = (b - a).cross(&(c - a)).try_normalize(f32::EPSILON) else {
        return false;
    };
    if tri_normal.dot(normal) <= 0.0 {
        return false;
    }

    let (a2, b2, c2) = (project(&a, normal), project(&b, normal), project(&c, normal));
    !remaining
        .iter()
        .filter(|&&k| k != prev && k != curr && k != next)
        .any(|&k| point_in_triangle_2d(project(&vertices[corners[k]], normal), a2, b2, c2))
}

/// Split a polygon into triangles that keep its winding
fn triangulate(vertices: &[Point3f], corners: &[usize]) -> Vec<[usize; 3]> {
    let n = corners.len();
    if n == 3 {
        return vec![[corners[0], corners[1], corners[2]]];
    }

    let mut remaining: Vec<usize> = (0..n).collect();
    let mut triangles = Vec::with_capacity(n - 2);

    if let Some(normal) = newell_normal(corners.iter().map(|&v| vertices[v])) {
        while remaining.len() > 3 {
            let m = remaining.len();
            let ear = (0..m).find(|&i| {
                let corner = (remaining[(i + m - 1) % m], remaining[i], remaining[(i + 1) % m]);
                is_ear(vertices, corners, &remaining, corner, &normal)
            });
            let Some(i) = ear else {
                log::debug!(
                    "Ear clipping stuck with {} corners remaining, using fan triangulation",
                    m
                );
                break;
            };
            let (prev, next) = (remaining[(i + m - 1) % m], remaining[(i + 1) % m]);
            triangles.push([corners[prev], corners[remaining[i]], corners[next]]);
            remaining.remove(i);
        }
    }

    for i in 1..remaining.len() - 1 {
        triangles.push([
            corners[remaining[0]],
            corners[remaining[i]],
            corners[remaining[i + 1]],
        ]);
    }
    triangles
}

impl MeshNormalizer {
    pub fn new(merge_distance: f32) -> Self {
        Self {
            merge_distance,
            ..Self::default()
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            merge_distance: config.merge_distance,
            recompute_normals: config.recompute_normals,
            mode_policy: config.mode_policy,
        }
    }

    /// The active object, provided it carries a mesh
    pub fn target<H: Host + ?Sized>(host: &H) -> Result<ObjectId> {
        let object = host
            .active_object()
            .ok_or_else(|| Error::InvalidSelection("no active object".to_string()))?;
        match host.object_kind(object)? {
            ObjectKind::Mesh => Ok(object),
            kind => Err(Error::InvalidSelection(format!(
                "object \"{}\" is {:?}, not a mesh",
                host.object_name(object)?,
                kind
            ))),
        }
    }

    /// Make sure the host is in object or element mode, switching if the policy allows
    pub fn check_mode<H: Host + ?Sized>(&self, host: &mut H) -> Result<InteractionMode> {
        match host.interaction_mode() {
            mode @ (InteractionMode::ObjectLevel | InteractionMode::ElementLevel) => Ok(mode),
            InteractionMode::Other => match self.mode_policy {
                ModePolicy::Reject => Err(Error::UnsupportedMode(
                    "switch to object or edit mode first".to_string(),
                )),
                ModePolicy::SwitchToObject => {
                    log::warn!("Host is in an unsupported mode, switching to object mode");
                    host.set_interaction_mode(InteractionMode::ObjectLevel);
                    Ok(InteractionMode::ObjectLevel)
                }
            },
        }
    }

    /// Working copy of the active mesh object, normalized.
    ///
    /// The live mesh is left alone until [`MeshNormalizer::commit`] is called,
    /// so a failure in between leaves the object exactly as it was.
    /// A structurally broken mesh is rejected with `InvalidData`.
    pub fn prepare<H: Host + ?Sized>(&self, host: &mut H) -> Result<NormalizedMesh> {
        let object = Self::target(host)?;
        self.check_mode(host)?;
        let live = host.mesh(object)?;
        live.validate()?;
        let (mesh, report) = self.normalized_copy(live);
        Ok(NormalizedMesh {
            object,
            mesh,
            report,
        })
    }

    /// Write a prepared working copy back onto its object
    pub fn commit<H: Host + ?Sized>(host: &mut H, normalized: NormalizedMesh) -> Result<NormalizeReport> {
        *host.mesh_mut(normalized.object)? = normalized.mesh;
        Ok(normalized.report)
    }

    /// Normalize a disposable copy, leaving `mesh` alone
    pub fn normalized_copy(&self, mesh: &PolygonMesh) -> (PolygonMesh, NormalizeReport) {
        let mut copy = mesh.clone();
        let report = self.normalize(&mut copy);
        (copy, report)
    }

    /// Weld, drop collapsed faces, triangulate and refresh normals.
    /// `mesh` must pass [`PolygonMesh::validate`].
    pub fn normalize(&self, mesh: &mut PolygonMesh) -> NormalizeReport {
        let mut report = NormalizeReport::default();

        let (remap, merged) = weld_map(&mesh.vertices, self.merge_distance);
        report.merged_vertices = merged;

        let mut new_index = vec![0usize; mesh.vertices.len()];
        let mut vertices = Vec::with_capacity(mesh.vertices.len() - merged);
        for (i, &v) in mesh.vertices.iter().enumerate() {
            if remap[i] == i {
                new_index[i] = vertices.len();
                vertices.push(v);
            }
        }

        let mut rebuilt = PolygonMesh {
            vertices,
            materials: std::mem::take(&mut mesh.materials),
            ..PolygonMesh::default()
        };

        for (index, polygon) in mesh.polygons.iter().enumerate() {
            let mut corners: Vec<usize> = mesh
                .polygon_vertices(index)
                .iter()
                .map(|&v| new_index[remap[v]])
                .collect();
            corners.dedup();
            while corners.len() > 1 && corners.first() == corners.last() {
                corners.pop();
            }
            if corners.len() < 3 {
                report.dropped_polygons += 1;
                continue;
            }

            if corners.len() == 3 {
                rebuilt.add_polygon(&corners, polygon.material_index, polygon.smooth);
                continue;
            }

            report.triangulated_polygons += 1;
            for triangle in triangulate(&rebuilt.vertices, &corners) {
                if triangle[0] == triangle[1] || triangle[1] == triangle[2] || triangle[0] == triangle[2] {
                    continue;
                }
                rebuilt.add_polygon(&triangle, polygon.material_index, polygon.smooth);
                report.added_triangles += 1;
            }
        }

        if self.recompute_normals {
            rebuilt.recompute_face_normals();
        }
        *mesh = rebuilt;

        log::debug!(
            "Normalized mesh: {} vertices merged, {} faces dropped, {} faces split into {} triangles",
            report.merged_vertices,
            report.dropped_polygons,
            report.triangulated_polygons,
            report.added_triangles
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshbridge_core::MaterialHandle;
    use meshbridge_scene::InMemoryScene;
    use meshbridge_core::TransformState;

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
    fn test_quad_becomes_two_triangles() {
        let mut mesh = quad();
        let report = MeshNormalizer::default().normalize(&mut mesh);
        assert_eq!(mesh.polygon_count(), 2);
        assert!(mesh.is_triangulated());
        assert_eq!(report.triangulated_polygons, 1);
        assert_eq!(report.added_triangles, 2);
        for normal in &mesh.face_normals {
            approx::assert_relative_eq!(*normal, Vector3f::z(), epsilon = 1e-6);
        }
    }

    #[test]
    fn test_concave_polygon() {
        // L-shaped hexagon, counter-clockwise
        let mut mesh = PolygonMesh::from_polygons(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(2.0, 0.0, 0.0),
                Point3f::new(2.0, 1.0, 0.0),
                Point3f::new(1.0, 1.0, 0.0),
                Point3f::new(1.0, 2.0, 0.0),
                Point3f::new(0.0, 2.0, 0.0),
            ],
            [[0usize, 1, 2, 3, 4, 5]],
        );
        MeshNormalizer::default().normalize(&mut mesh);
        assert_eq!(mesh.polygon_count(), 4);

        let area: f32 = (0..mesh.polygon_count())
            .map(|i| {
                let v = mesh.polygon_vertices(i);
                let (a, b, c) = (mesh.vertices[v[0]], mesh.vertices[v[1]], mesh.vertices[v[2]]);
                (b - a).cross(&(c - a)).z * 0.5
            })
            .sum();
        // all triangles keep the winding, so signed areas add up to the L's area
        approx::assert_relative_eq!(area, 3.0, epsilon = 1e-5);
    }

    #[test]
    fn test_weld_merges_close_vertices() {
        // two triangles sharing an edge through slightly offset copies
        let mut mesh = PolygonMesh::from_polygons(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(0.0, 1.0, 0.0),
                Point3f::new(1.00005, 0.0, 0.0),
                Point3f::new(1.0, 1.0, 0.0),
                Point3f::new(0.0, 1.00005, 0.0),
            ],
            [[0usize, 1, 2], [3, 4, 5]],
        );
        let report = MeshNormalizer::default().normalize(&mut mesh);
        assert_eq!(report.merged_vertices, 2);
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.polygon_vertices(1), &[1, 3, 2]);
    }

    #[test]
    fn test_collapsed_face_dropped() {
        let mut mesh = PolygonMesh::from_polygons(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(0.0, 1.0, 0.0),
                Point3f::new(0.00001, 0.0, 0.0),
            ],
            [[0usize, 1, 2], [0, 3, 2]],
        );
        let report = MeshNormalizer::default().normalize(&mut mesh);
        assert_eq!(report.dropped_polygons, 1);
        assert_eq!(mesh.polygon_count(), 1);
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_zero_distance_fuses_exact_duplicates_only() {
        let mut mesh = PolygonMesh::from_polygons(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(0.0, 1.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(0.0, 1.00001, 0.0),
            ],
            [[0usize, 1, 2]],
        );
        let report = MeshNormalizer::new(0.0).normalize(&mut mesh);
        assert_eq!(report.merged_vertices, 1);
        assert_eq!(mesh.vertex_count(), 4);
    }

    #[test]
    fn test_tiny_distance_and_huge_coordinates() {
        let mut mesh = quad();
        mesh.vertices.push(Point3f::new(0.0, 0.0, 0.0));
        let report = MeshNormalizer::new(1e-20).normalize(&mut mesh);
        assert_eq!(report.merged_vertices, 1);
        assert_eq!(mesh.polygon_count(), 2);

        let mut far = PolygonMesh::from_polygons(
            vec![
                Point3f::new(1e30, 0.0, 0.0),
                Point3f::new(-1e30, 1.0, 0.0),
                Point3f::new(0.0, f32::MAX, 0.0),
            ],
            [[0usize, 1, 2]],
        );
        let report = MeshNormalizer::default().normalize(&mut far);
        assert_eq!(report.merged_vertices, 0);
        assert_eq!(far.polygon_count(), 1);
    }

    #[test]
    fn test_material_and_shading_inherited() {
        let mut mesh = quad();
        mesh.materials = vec![MaterialHandle(0), MaterialHandle(1)];
        mesh.polygons[0].material_index = 1;
        mesh.polygons[0].smooth = true;
        MeshNormalizer::default().normalize(&mut mesh);
        assert_eq!(mesh.materials.len(), 2);
        assert!(mesh.polygons.iter().all(|p| p.material_index == 1 && p.smooth));
    }

    #[test]
    fn test_copy_leaves_original() {
        let mesh = quad();
        let (copy, report) = MeshNormalizer::default().normalized_copy(&mesh);
        assert_eq!(mesh.polygon_count(), 1);
        assert_eq!(copy.polygon_count(), 2);
        assert!(!report.is_unchanged());
        assert!(MeshNormalizer::default().normalized_copy(&copy).1.is_unchanged());
    }

    #[test]
    fn test_mode_policy() {
        let mut scene = InMemoryScene::new();
        let id = scene.add_mesh_object("Quad", quad(), TransformState::identity()).unwrap();
        scene.set_active_and_selected(id).unwrap();
        scene.set_interaction_mode(InteractionMode::Other);

        let err = MeshNormalizer::default().prepare(&mut scene).unwrap_err();
        assert!(matches!(err, Error::UnsupportedMode(_)));
        assert_eq!(scene.interaction_mode(), InteractionMode::Other);

        let switching = MeshNormalizer {
            mode_policy: ModePolicy::SwitchToObject,
            ..Default::default()
        };
        let prepared = switching.prepare(&mut scene).unwrap();
        assert_eq!(prepared.object, id);
        assert_eq!(scene.interaction_mode(), InteractionMode::ObjectLevel);
        assert_eq!(prepared.mesh.polygon_count(), 2);
        // nothing written back yet
        assert_eq!(scene.mesh(id).unwrap().polygon_count(), 1);

        MeshNormalizer::commit(&mut scene, prepared).unwrap();
        assert_eq!(scene.mesh(id).unwrap().polygon_count(), 2);
    }

    #[test]
    fn test_broken_mesh_rejected() {
        let mut broken = quad();
        broken.loops[2] = 42;
        let mut scene = InMemoryScene::new();
        let id = scene.add_mesh_object("Broken", broken.clone(), TransformState::identity()).unwrap();
        scene.set_active_and_selected(id).unwrap();

        let err = MeshNormalizer::default().prepare(&mut scene).unwrap_err();
        assert!(matches!(err, Error::InvalidData(_)));
        assert_eq!(scene.mesh(id).unwrap(), &broken);
    }

    #[test]
    fn test_selection_checks() {
        let mut scene = InMemoryScene::new();
        assert!(matches!(
            MeshNormalizer::target(&scene),
            Err(Error::InvalidSelection(_))
        ));
        let empty = scene.add_empty("Empty").unwrap();
        scene.set_active_and_selected(empty).unwrap();
        assert!(matches!(
            MeshNormalizer::target(&scene),
            Err(Error::InvalidSelection(_))
        ));
    }
}
