//! Shape-diameter segmentation
//!
//! Each face gets a shape diameter value: rays are shot from its centroid into
//! the volume, inside a cone around the inverted face normal, and the median
//! distance to the opposite surface is kept. The values are clustered and the
//! labels smoothed across shared edges; each surviving label is one segment.
//! A body of constant thickness (a cube, a sphere) has nothing to separate, so
//! its faces are clustered by position along the longest bounding-box axis.

use meshbridge_core::{Error, GeometrySnapshot, Point3f, Result, Vector3f};
use std::collections::HashMap;
use std::f32::consts::PI;

const RAY_EPSILON: f32 = 1e-5;
/// Barycentric slack, so rays through a shared edge hit one of its triangles
const EDGE_SLACK: f32 = 1e-5;
/// Spreads below this fraction of the magnitude are float noise
const UNIFORM_SPREAD: f32 = 1e-3;
const KMEANS_ITERATIONS: usize = 50;
const SMOOTHING_PASSES: usize = 3;

/// Shape-diameter-function segmenter
#[derive(Debug, Clone)]
pub struct ShapeDiameterSegmenter {
    /// Full opening angle of the ray cone, radians
    pub cone_angle: f32,
    /// Rays on the cone ring, in addition to the central ray
    pub ring_rays: usize,
}

impl Default for ShapeDiameterSegmenter {
    fn default() -> Self {
        Self {
            cone_angle: 2.0 / 3.0 * PI,
            ring_rays: 8,
        }
    }
}

/// Möller–Trumbore ray/triangle intersection, returning the ray parameter
fn intersect(origin: &Point3f, dir: &Vector3f, a: &Point3f, b: &Point3f, c: &Point3f) -> Option<f32> {
    let e1 = b - a;
    let e2 = c - a;
    let p = dir.cross(&e2);
    let det = e1.dot(&p);
    if det.abs() < f32::EPSILON {
        return None;
    }
    let inv = 1.0 / det;
    let s = origin - a;
    let u = s.dot(&p) * inv;
    if !(-EDGE_SLACK..=1.0 + EDGE_SLACK).contains(&u) {
        return None;
    }
    let q = s.cross(&e1);
    let v = dir.dot(&q) * inv;
    if v < -EDGE_SLACK || u + v > 1.0 + EDGE_SLACK {
        return None;
    }
    let t = e2.dot(&q) * inv;
    (t > RAY_EPSILON).then_some(t)
}

/// Two unit vectors spanning the plane orthogonal to `n`
fn tangent_frame(n: &Vector3f) -> (Vector3f, Vector3f) {
    let helper = if n.x.abs() < 0.9 { Vector3f::x() } else { Vector3f::y() };
    let u = n.cross(&helper).normalize();
    let v = n.cross(&u);
    (u, v)
}

fn centroid(vertices: &[Point3f], face: &[usize; 3]) -> Point3f {
    Point3f::from((vertices[face[0]].coords + vertices[face[1]].coords + vertices[face[2]].coords) / 3.0)
}

/// Rescale to `[0, 1]`, or `None` when the values are uniform
fn rescale(values: &[f32]) -> Option<Vec<f32>> {
    let min = values.iter().copied().fold(f32::INFINITY, f32::min);
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let range = max - min;
    let magnitude = min.abs().max(max.abs()).max(f32::EPSILON);
    if !(range > UNIFORM_SPREAD * magnitude) {
        return None;
    }
    Some(values.iter().map(|v| (v - min) / range).collect())
}

/// Face centroids along the longest axis, measured from the bounding box's low corner
fn axis_positions(snapshot: &GeometrySnapshot) -> Vec<f32> {
    let vertices = snapshot.vertices();
    let Some(first) = vertices.first() else {
        return vec![0.0; snapshot.face_count()];
    };
    let (lo, hi) = vertices
        .iter()
        .fold((*first, *first), |(lo, hi), v| (lo.inf(v), hi.sup(v)));
    let axis = (hi - lo).imax();
    snapshot
        .faces()
        .iter()
        .map(|face| centroid(vertices, face)[axis] - lo[axis])
        .collect()
}

fn median(values: &mut [f32]) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    Some(values[values.len() / 2])
}

/// Faces sharing an edge with each face
fn face_adjacency(snapshot: &GeometrySnapshot) -> Vec<Vec<usize>> {
    let mut edges: HashMap<(usize, usize), Vec<usize>> = HashMap::new();
    for (fi, face) in snapshot.faces().iter().enumerate() {
        for j in 0..3 {
            let (a, b) = (face[j], face[(j + 1) % 3]);
            edges.entry((a.min(b), a.max(b))).or_default().push(fi);
        }
    }

    let mut adjacency = vec![Vec::new(); snapshot.face_count()];
    for faces in edges.values() {
        for &f in faces {
            for &g in faces {
                if f != g && !adjacency[f].contains(&g) {
                    adjacency[f].push(g);
                }
            }
        }
    }
    adjacency
}

impl ShapeDiameterSegmenter {
    pub fn new() -> Self {
        Self::default()
    }

    fn ray_directions(&self, normal: &Vector3f) -> Vec<Vector3f> {
        let inward = -normal;
        let (u, v) = tangent_frame(&inward);
        let tilt = self.cone_angle / 4.0;
        let mut dirs = vec![inward];
        for k in 0..self.ring_rays {
            let phi = 2.0 * PI * k as f32 / self.ring_rays as f32;
            let side = u * phi.cos() + v * phi.sin();
            dirs.push((inward * tilt.cos() + side * tilt.sin()).normalize());
        }
        dirs
    }

    /// Shape diameter of every face.
    /// Faces whose rays escape the mesh take the mean of the others.
    pub fn shape_diameters(&self, snapshot: &GeometrySnapshot) -> Vec<f32> {
        let vertices = snapshot.vertices();
        let faces = snapshot.faces();
        let normals = snapshot.face_normals();

        let raw: Vec<Option<f32>> = faces
            .iter()
            .enumerate()
            .map(|(fi, face)| {
                let centroid = centroid(vertices, face);
                let mut hits: Vec<f32> = self
                    .ray_directions(&normals[fi])
                    .iter()
                    .filter_map(|dir| {
                        faces
                            .iter()
                            .enumerate()
                            .filter(|(gi, _)| *gi != fi)
                            .filter_map(|(_, g)| {
                                intersect(&centroid, dir, &vertices[g[0]], &vertices[g[1]], &vertices[g[2]])
                            })
                            .min_by(|a, b| a.total_cmp(b))
                    })
                    .collect();
                median(&mut hits)
            })
            .collect();

        let known: Vec<f32> = raw.iter().flatten().copied().collect();
        let fallback = if known.is_empty() {
            0.0
        } else {
            known.iter().sum::<f32>() / known.len() as f32
        };
        raw.into_iter().map(|v| v.unwrap_or(fallback)).collect()
    }

    /// Per-face value to cluster on, in `[0, 1]`
    fn features(&self, snapshot: &GeometrySnapshot) -> Vec<f32> {
        if let Some(diameters) = rescale(&self.shape_diameters(snapshot)) {
            return diameters;
        }
        log::debug!("Shape diameter is uniform, clustering along the longest axis");
        rescale(&axis_positions(snapshot)).unwrap_or_else(|| vec![0.0; snapshot.face_count()])
    }

    /// One-dimensional k-means with quantile seeding
    fn cluster(values: &[f32], k: usize) -> Vec<usize> {
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        sorted.dedup_by(|a, b| (*a - *b).abs() <= f32::EPSILON);
        let k = k.min(sorted.len()).max(1);

        let mut centers: Vec<f32> = (0..k)
            .map(|i| sorted[(i * (sorted.len() - 1)) / (k - 1).max(1)])
            .collect();
        let mut labels = vec![0usize; values.len()];

        for _ in 0..KMEANS_ITERATIONS {
            let mut changed = false;
            for (label, value) in labels.iter_mut().zip(values) {
                let nearest = centers
                    .iter()
                    .enumerate()
                    .min_by(|(_, a), (_, b)| (*a - value).abs().total_cmp(&(*b - value).abs()))
                    .map(|(i, _)| i)
                    .unwrap_or(0);
                if nearest != *label {
                    *label = nearest;
                    changed = true;
                }
            }

            let mut sums = vec![0.0f32; k];
            let mut counts = vec![0usize; k];
            for (&label, &value) in labels.iter().zip(values) {
                sums[label] += value;
                counts[label] += 1;
            }
            for i in 0..k {
                if counts[i] > 0 {
                    centers[i] = sums[i] / counts[i] as f32;
                }
            }
            if !changed {
                break;
            }
        }
        labels
    }

    /// Neighbour vote: a face adopts the dominant label around it when that
    /// label holds more than `(1 - smoothness)` of its neighbours.
    fn smooth(labels: &mut Vec<usize>, adjacency: &[Vec<usize>], smoothness: f32) {
        if smoothness <= 0.0 {
            return;
        }
        for _ in 0..SMOOTHING_PASSES {
            let previous = labels.clone();
            for (fi, neighbours) in adjacency.iter().enumerate() {
                if neighbours.is_empty() {
                    continue;
                }
                let mut votes: HashMap<usize, usize> = HashMap::new();
                for &g in neighbours {
                    *votes.entry(previous[g]).or_default() += 1;
                }
                let own = votes.get(&previous[fi]).copied().unwrap_or(0);
                if let Some((&label, &count)) = votes
                    .iter()
                    .max_by(|(la, ca), (lb, cb)| ca.cmp(cb).then(lb.cmp(la)))
                {
                    let share = count as f32 / neighbours.len() as f32;
                    if label != previous[fi] && count > own && share > 1.0 - smoothness {
                        labels[fi] = label;
                    }
                }
            }
            if *labels == previous {
                break;
            }
        }
    }

    /// Renumber labels densely in order of first appearance
    fn dense_segments(labels: &[usize]) -> (Vec<usize>, usize) {
        let mut ids: HashMap<usize, usize> = HashMap::new();
        let segments = labels
            .iter()
            .map(|label| {
                let next = ids.len();
                *ids.entry(*label).or_insert(next)
            })
            .collect();
        (segments, ids.len())
    }

    /// Segment ids per face (in face order) and the number of segments
    pub fn segment(&self, snapshot: &GeometrySnapshot, clusters: usize, smoothness: f32) -> Result<(Vec<usize>, usize)> {
        if snapshot.is_empty() {
            return Err(Error::InvalidData("Mesh is empty".to_string()));
        }
        if clusters == 0 {
            return Err(Error::InvalidData("At least one cluster is required".to_string()));
        }

        let features = self.features(snapshot);
        let adjacency = face_adjacency(snapshot);
        let mut labels = Self::cluster(&features, clusters);
        Self::smooth(&mut labels, &adjacency, smoothness.clamp(0.0, 1.0));
        let (segments, count) = Self::dense_segments(&labels);

        log::debug!(
            "Shape diameter segmentation: {} faces, {} clusters requested, {} segments",
            snapshot.face_count(),
            clusters,
            count
        );
        Ok((segments, count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Axis-aligned box as 12 outward-facing triangles
    fn cuboid(size: [f32; 3], offset: [f32; 3], base: usize) -> (Vec<Point3f>, Vec<[usize; 3]>) {
        let [sx, sy, sz] = size;
        let [ox, oy, oz] = offset;
        let vertices = vec![
            Point3f::new(ox, oy, oz),
            Point3f::new(ox + sx, oy, oz),
            Point3f::new(ox + sx, oy + sy, oz),
            Point3f::new(ox, oy + sy, oz),
            Point3f::new(ox, oy, oz + sz),
            Point3f::new(ox + sx, oy, oz + sz),
            Point3f::new(ox + sx, oy + sy, oz + sz),
            Point3f::new(ox, oy + sy, oz + sz),
        ];
        let faces = [
            [0, 3, 2], [0, 2, 1],
            [4, 5, 6], [4, 6, 7],
            [0, 1, 5], [0, 5, 4],
            [1, 2, 6], [1, 6, 5],
            [2, 3, 7], [2, 7, 6],
            [3, 0, 4], [3, 4, 7],
        ]
        .iter()
        .map(|f| [f[0] + base, f[1] + base, f[2] + base])
        .collect();
        (vertices, faces)
    }

    #[test]
    fn test_ray_hits_triangle() {
        let t = intersect(
            &Point3f::new(0.2, 0.2, 1.0),
            &-Vector3f::z(),
            &Point3f::new(0.0, 0.0, 0.0),
            &Point3f::new(1.0, 0.0, 0.0),
            &Point3f::new(0.0, 1.0, 0.0),
        );
        approx::assert_relative_eq!(t.unwrap(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_ray_through_shared_edge_hits() {
        // Lands on the hypotenuse of the triangle
        let t = intersect(
            &Point3f::new(0.5, 0.5, 1.0),
            &-Vector3f::z(),
            &Point3f::new(0.0, 0.0, 0.0),
            &Point3f::new(1.0, 0.0, 0.0),
            &Point3f::new(0.0, 1.0, 0.0),
        );
        approx::assert_relative_eq!(t.unwrap(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_cube_diameter_is_uniform() {
        let (vertices, faces) = cuboid([1.0, 1.0, 1.0], [0.0; 3], 0);
        let snapshot = GeometrySnapshot::new(vertices, faces).unwrap();
        let diameters = ShapeDiameterSegmenter::new().shape_diameters(&snapshot);
        assert_eq!(diameters.len(), 12);
        for d in &diameters {
            approx::assert_relative_eq!(*d, diameters[0], max_relative = 1e-4);
        }
        assert!(rescale(&diameters).is_none());
    }

    #[test]
    fn test_rescale_ignores_float_noise() {
        assert!(rescale(&[0.942_809, 0.942_808_9, 0.942_809]).is_none());
        assert!(rescale(&[]).is_none());
        let scaled = rescale(&[1.0, 2.0, 3.0]).unwrap();
        approx::assert_relative_eq!(scaled[1], 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_uniform_cube_splits_into_requested_clusters() {
        let (vertices, faces) = cuboid([1.0, 1.0, 1.0], [0.0; 3], 0);
        let snapshot = GeometrySnapshot::new(vertices, faces).unwrap();
        for smoothness in [0.0, 0.5, 1.0] {
            let (ids, count) = ShapeDiameterSegmenter::new().segment(&snapshot, 2, smoothness).unwrap();
            assert_eq!(ids.len(), 12);
            assert_eq!(count, 2);
            assert!(ids.iter().all(|&id| id < 2));
        }
    }

    #[test]
    fn test_uniform_cube_far_from_origin() {
        let (vertices, faces) = cuboid([1.0, 1.0, 1.0], [1000.0, -500.0, 20.0], 0);
        let snapshot = GeometrySnapshot::new(vertices, faces).unwrap();
        let (ids, count) = ShapeDiameterSegmenter::new().segment(&snapshot, 2, 0.0).unwrap();
        assert_eq!(ids.len(), 12);
        assert_eq!(count, 2);
    }

    #[test]
    fn test_thin_and_thick_parts_separate() {
        // A thick block and a thin slab, disjoint
        let (mut vertices, mut faces) = cuboid([2.0, 2.0, 2.0], [0.0; 3], 0);
        let (v2, f2) = cuboid([4.0, 4.0, 0.1], [5.0, 0.0, 0.0], 8);
        vertices.extend(v2);
        faces.extend(f2);
        let snapshot = GeometrySnapshot::new(vertices, faces).unwrap();

        let (ids, count) = ShapeDiameterSegmenter::new().segment(&snapshot, 2, 0.0).unwrap();
        assert_eq!(ids.len(), 24);
        assert_eq!(count, 2);
        // The two bodies never share a segment
        assert!(ids[..12].iter().all(|id| !ids[12..].contains(id)));
    }

    #[test]
    fn test_segment_ids_are_dense() {
        let (vertices, faces) = cuboid([1.0, 3.0, 0.5], [0.0; 3], 0);
        let snapshot = GeometrySnapshot::new(vertices, faces).unwrap();
        let (ids, count) = ShapeDiameterSegmenter::new().segment(&snapshot, 4, 0.5).unwrap();
        assert_eq!(ids.len(), snapshot.face_count());
        assert_eq!(ids[0], 0);
        for id in 0..count {
            assert!(ids.contains(&id));
        }
    }

    #[test]
    fn test_segments_never_exceed_clusters() {
        let (ids, count) = ShapeDiameterSegmenter::dense_segments(&[3, 3, 0, 3, 0]);
        assert_eq!(ids, vec![0, 0, 1, 0, 1]);
        assert_eq!(count, 2);
    }

    #[test]
    fn test_smoothing_absorbs_isolated_label() {
        // Face 0 is surrounded by faces labelled 1
        let adjacency = vec![vec![1, 2, 3], vec![0], vec![0], vec![0]];
        let mut labels = vec![0, 1, 1, 1];
        ShapeDiameterSegmenter::smooth(&mut labels, &adjacency, 0.5);
        assert_eq!(labels[0], 1);

        let mut untouched = vec![0, 1, 1, 1];
        ShapeDiameterSegmenter::smooth(&mut untouched, &adjacency, 0.0);
        assert_eq!(untouched, vec![0, 1, 1, 1]);
    }
}
