//! Quadric-error edge-collapse decimation
//!
//! Builds a half-edge structure over the snapshot, seeds every collapsible
//! edge with its quadric error (QEM) and collapses the cheapest edge first
//! until the face budget is reached. The link condition keeps the surface a
//! 2-manifold; vertices on open boundaries can be pinned.

use meshbridge_core::{Error, GeometrySnapshot, Point3f, Result};
use nalgebra::{Matrix4, Vector4};
use priority_queue::PriorityQueue;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

const NONE: usize = usize::MAX;

/// Candidate queue is rebuilt after this many collapses
const REQUEUE_INTERVAL: usize = 100;

#[derive(Debug, Clone)]
struct HalfEdge {
    target: usize,
    twin: usize,
    next: usize,
    prev: usize,
    face: usize,
}

struct HalfEdgeMesh {
    half_edges: Vec<HalfEdge>,
    /// One outgoing half-edge per vertex, NONE once the vertex is gone
    vertex_edge: Vec<usize>,
    /// First half-edge of each face, NONE once the face is gone
    face_edge: Vec<usize>,
    live_faces: usize,
    positions: Vec<Point3f>,
    quadrics: Vec<Matrix4<f64>>,
}

impl HalfEdgeMesh {
    fn build(snapshot: &GeometrySnapshot) -> Self {
        let vertex_count = snapshot.vertex_count();
        let face_count = snapshot.face_count();

        let mut half_edges = Vec::with_capacity(face_count * 3);
        let mut vertex_edge = vec![NONE; vertex_count];
        let mut face_edge = Vec::with_capacity(face_count);
        let mut directed: HashMap<(usize, usize), usize> = HashMap::with_capacity(face_count * 3);

        for (fi, face) in snapshot.faces().iter().enumerate() {
            let base = fi * 3;
            for j in 0..3 {
                let from = face[j];
                let to = face[(j + 1) % 3];
                half_edges.push(HalfEdge {
                    target: to,
                    twin: NONE,
                    next: base + (j + 1) % 3,
                    prev: base + (j + 2) % 3,
                    face: fi,
                });
                if vertex_edge[from] == NONE {
                    vertex_edge[from] = base + j;
                }
                directed.insert((from, to), base + j);
            }
            face_edge.push(base);
        }

        for (&(from, to), &he) in &directed {
            if let Some(&twin) = directed.get(&(to, from)) {
                half_edges[he].twin = twin;
            }
        }

        let mut mesh = HalfEdgeMesh {
            half_edges,
            vertex_edge,
            face_edge,
            live_faces: face_count,
            positions: snapshot.vertices().to_vec(),
            quadrics: vec![Matrix4::zeros(); vertex_count],
        };
        mesh.accumulate_quadrics();
        mesh
    }

    #[inline]
    fn source(&self, he: usize) -> usize {
        self.half_edges[self.half_edges[he].prev].target
    }

    fn face_corners(&self, face: usize) -> Option<[usize; 3]> {
        let he0 = self.face_edge[face];
        if he0 == NONE {
            return None;
        }
        let he1 = self.half_edges[he0].next;
        Some([
            self.source(he0),
            self.half_edges[he0].target,
            self.half_edges[he1].target,
        ])
    }

    fn plane_quadric(v0: &Point3f, v1: &Point3f, v2: &Point3f) -> Matrix4<f64> {
        let n = (v1 - v0).cross(&(v2 - v0));
        let Some(n) = n.try_normalize(f32::EPSILON) else {
            return Matrix4::zeros();
        };
        let d = -n.dot(&v0.coords);
        let p = Vector4::new(n.x as f64, n.y as f64, n.z as f64, d as f64);
        p * p.transpose()
    }

    fn accumulate_quadrics(&mut self) {
        for face in 0..self.face_edge.len() {
            if let Some([a, b, c]) = self.face_corners(face) {
                let q = Self::plane_quadric(&self.positions[a], &self.positions[b], &self.positions[c]);
                self.quadrics[a] += q;
                self.quadrics[b] += q;
                self.quadrics[c] += q;
            }
        }
    }

    fn is_live(&self, v: usize) -> bool {
        self.vertex_edge[v] != NONE
    }

    /// Outgoing half-edges around `v`, including both fans of a boundary vertex
    fn ring(&self, v: usize) -> Vec<usize> {
        let start = self.vertex_edge[v];
        if start == NONE {
            return vec![];
        }

        let mut ring = Vec::new();
        let mut current = start;
        loop {
            ring.push(current);
            let twin = self.half_edges[self.half_edges[current].prev].twin;
            if twin == NONE {
                break;
            }
            current = twin;
            if current == start {
                return ring;
            }
        }

        // Open fan: walk the other way from the start
        let start_twin = self.half_edges[start].twin;
        if start_twin != NONE {
            let mut current = self.half_edges[start_twin].next;
            while current != start {
                ring.push(current);
                let twin = self.half_edges[current].twin;
                if twin == NONE {
                    break;
                }
                current = self.half_edges[twin].next;
            }
        }
        ring
    }

    fn neighbours(&self, v: usize) -> HashSet<usize> {
        self.ring(v)
            .iter()
            .map(|&he| self.half_edges[he].target)
            .collect()
    }

    fn on_boundary(&self, v: usize) -> bool {
        self.ring(v)
            .iter()
            .any(|&he| self.half_edges[he].twin == NONE)
    }

    fn find_half_edge(&self, from: usize, to: usize) -> Option<usize> {
        self.ring(from)
            .into_iter()
            .find(|&he| self.half_edges[he].target == to)
    }

    /// Common neighbours of the edge endpoints must be exactly the apices of
    /// its adjacent faces (2 inside, 1 on a boundary). Endpoints with no other
    /// neighbours span a whole tetrahedron (or a lone triangle), which stays.
    fn satisfies_link_condition(&self, a: usize, b: usize) -> bool {
        let Some(he) = self.find_half_edge(a, b) else {
            return false;
        };
        let (na, nb) = (self.neighbours(a), self.neighbours(b));
        let apices = if self.half_edges[he].twin == NONE { 1 } else { 2 };
        let shared = na.intersection(&nb).count();
        let whole_component = na.len() == apices + 1 && nb.len() == apices + 1;
        shared == apices && !whole_component
    }

    fn collapse_cost(&self, a: usize, b: usize) -> (Point3f, f64) {
        let q = self.quadrics[a] + self.quadrics[b];
        let q3 = q.fixed_view::<3, 3>(0, 0).into_owned();
        let q1 = q.fixed_view::<3, 1>(0, 3).into_owned();

        let target = match q3.try_inverse() {
            Some(inv) => {
                let p = -inv * q1;
                Point3f::new(p[0] as f32, p[1] as f32, p[2] as f32)
            }
            None => nalgebra::center(&self.positions[a], &self.positions[b]),
        };

        let h = Vector4::new(target.x as f64, target.y as f64, target.z as f64, 1.0);
        (target, (h.transpose() * q * h)[0].max(0.0))
    }

    fn any_live_outgoing(&self, v: usize) -> usize {
        (0..self.half_edges.len())
            .find(|&he| self.half_edges[he].face != NONE && self.source(he) == v)
            .unwrap_or(NONE)
    }

    fn retire_face(&mut self, he: usize) {
        let next = self.half_edges[he].next;
        let prev = self.half_edges[he].prev;
        let face = self.half_edges[he].face;

        // Glue the two outer edges of the removed triangle together
        let next_twin = self.half_edges[next].twin;
        let prev_twin = self.half_edges[prev].twin;
        if next_twin != NONE {
            self.half_edges[next_twin].twin = prev_twin;
        }
        if prev_twin != NONE {
            self.half_edges[prev_twin].twin = next_twin;
        }

        for e in [he, next, prev] {
            self.half_edges[e].face = NONE;
        }
        self.face_edge[face] = NONE;
        self.live_faces -= 1;
    }

    fn repair_vertex_edge(&mut self, v: usize, preferred: usize) {
        if v == NONE || self.vertex_edge[v] == NONE {
            return;
        }
        if self.half_edges[self.vertex_edge[v]].face != NONE {
            return;
        }
        self.vertex_edge[v] = if preferred != NONE && self.half_edges[preferred].face != NONE {
            preferred
        } else {
            self.any_live_outgoing(v)
        };
    }

    /// Merge `b` into `a`, moving `a` to `position`
    fn collapse(&mut self, a: usize, b: usize, position: Point3f) -> bool {
        let Some(h) = self.find_half_edge(a, b) else {
            return false;
        };
        let h_twin = self.half_edges[h].twin;
        let h_next = self.half_edges[h].next;
        let h_prev = self.half_edges[h].prev;
        let apex = self.half_edges[h_next].target;
        let next_twin = self.half_edges[h_next].twin;
        let prev_twin = self.half_edges[h_prev].twin;

        let (other_apex, twin_next_twin) = if h_twin != NONE {
            let tn = self.half_edges[h_twin].next;
            (self.half_edges[tn].target, self.half_edges[tn].twin)
        } else {
            (NONE, NONE)
        };

        let b_ring = self.ring(b);

        self.retire_face(h);
        if h_twin != NONE {
            self.retire_face(h_twin);
        }

        for &he in &b_ring {
            let prev = self.half_edges[he].prev;
            self.half_edges[prev].target = a;
            let twin = self.half_edges[he].twin;
            if twin != NONE && self.half_edges[twin].face != NONE {
                self.half_edges[twin].target = a;
            }
        }

        self.repair_vertex_edge(a, prev_twin);
        self.repair_vertex_edge(apex, next_twin);
        if other_apex != apex {
            self.repair_vertex_edge(other_apex, twin_next_twin);
        }

        self.vertex_edge[b] = NONE;
        let qb = self.quadrics[b];
        self.quadrics[a] += qb;
        self.positions[a] = position;
        true
    }

    fn into_snapshot(self) -> Result<GeometrySnapshot> {
        let mut remap = vec![NONE; self.positions.len()];
        let mut vertices = Vec::new();
        for (v, slot) in remap.iter_mut().enumerate() {
            if self.is_live(v) {
                *slot = vertices.len();
                vertices.push(self.positions[v]);
            }
        }

        let faces = (0..self.face_edge.len())
            .filter_map(|f| self.face_corners(f))
            .filter_map(|[a, b, c]| {
                let tri = [remap[a], remap[b], remap[c]];
                let valid = tri.iter().all(|&v| v != NONE)
                    && tri[0] != tri[1]
                    && tri[1] != tri[2]
                    && tri[2] != tri[0];
                valid.then_some(tri)
            })
            .collect();

        GeometrySnapshot::new(vertices, faces)
    }
}

#[derive(Debug, Clone)]
struct Candidate {
    a: usize,
    b: usize,
    cost: f64,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cost.total_cmp(&other.cost) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        // Cheapest collapse pops first
        other.cost.total_cmp(&self.cost)
    }
}

/// Edge-collapse decimator driven by quadric error metrics
#[derive(Debug, Clone)]
pub struct QuadricDecimator {
    /// Stop when the cheapest collapse costs more than this
    pub error_threshold: Option<f64>,
    /// Never move vertices that lie on an open boundary
    pub preserve_boundary: bool,
    /// Added to the cost of boundary edges when they are not pinned
    pub boundary_weight: f64,
}

impl Default for QuadricDecimator {
    fn default() -> Self {
        Self {
            error_threshold: None,
            preserve_boundary: true,
            boundary_weight: 100.0,
        }
    }
}

impl QuadricDecimator {
    pub fn new() -> Self {
        Self::default()
    }

    fn candidates(&self, mesh: &HalfEdgeMesh, first_id: usize) -> PriorityQueue<usize, Candidate> {
        let mut queue = PriorityQueue::new();
        let mut seen: HashSet<(usize, usize)> = HashSet::new();
        let mut id = first_id;

        for a in 0..mesh.positions.len() {
            if !mesh.is_live(a) {
                continue;
            }
            for he in mesh.ring(a) {
                if mesh.half_edges[he].face == NONE {
                    continue;
                }
                let b = mesh.half_edges[he].target;
                if !seen.insert((a.min(b), a.max(b))) {
                    continue;
                }

                let boundary = mesh.on_boundary(a) || mesh.on_boundary(b);
                if boundary && self.preserve_boundary {
                    continue;
                }
                let (_, mut cost) = mesh.collapse_cost(a, b);
                if boundary {
                    cost += self.boundary_weight;
                }
                queue.push(id, Candidate { a, b, cost });
                id += 1;
            }
        }
        queue
    }

    /// Remove roughly `factor` of the faces (0 keeps the mesh as is)
    pub fn decimate(&self, snapshot: &GeometrySnapshot, factor: f32) -> Result<GeometrySnapshot> {
        if snapshot.is_empty() {
            return Err(Error::InvalidData("Mesh is empty".to_string()));
        }
        if !(0.0..=1.0).contains(&factor) {
            return Err(Error::InvalidData(
                "Decimation factor must be between 0.0 and 1.0".to_string(),
            ));
        }
        if factor == 0.0 {
            return Ok(snapshot.clone());
        }

        let target_faces = ((1.0 - factor) * snapshot.face_count() as f32) as usize;
        let mut mesh = HalfEdgeMesh::build(snapshot);
        let mut queue = self.candidates(&mesh, 0);
        let mut collapses = 0usize;
        let mut refilled = false;

        while mesh.live_faces > target_faces {
            let Some((_, candidate)) = queue.pop() else {
                // Edges created by earlier collapses are not queued yet
                if refilled {
                    break;
                }
                queue = self.candidates(&mesh, (collapses + 1) * 1000);
                refilled = true;
                continue;
            };
            if let Some(threshold) = self.error_threshold {
                if candidate.cost > threshold {
                    break;
                }
            }

            let (a, b) = (candidate.a, candidate.b);
            if !mesh.is_live(a) || !mesh.is_live(b) || !mesh.satisfies_link_condition(a, b) {
                continue;
            }

            let (position, _) = mesh.collapse_cost(a, b);
            if mesh.collapse(a, b, position) {
                collapses += 1;
                refilled = false;
                if collapses % REQUEUE_INTERVAL == 0 {
                    queue = self.candidates(&mesh, collapses * 1000);
                }
            }
        }

        log::debug!(
            "Edge collapse: {} collapses, {} -> {} faces (target {})",
            collapses,
            snapshot.face_count(),
            mesh.live_faces,
            target_faces
        );
        mesh.into_snapshot()
    }
}
