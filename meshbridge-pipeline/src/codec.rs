//! Conversion between host meshes and geometry snapshots

use meshbridge_core::{Error, GeometrySnapshot, PolygonMesh, Result};

/// Snapshot of a triangulated host mesh, in host vertex and face order
pub fn extract(mesh: &PolygonMesh) -> Result<GeometrySnapshot> {
    let mut faces = Vec::with_capacity(mesh.polygon_count());
    for (index, polygon) in mesh.polygons.iter().enumerate() {
        if polygon.loop_total != 3 {
            return Err(Error::NonTriangularFace {
                face: index,
                vertex_count: polygon.loop_total,
            });
        }
        let corners = mesh
            .loops
            .get(polygon.loop_start..polygon.loop_start + 3)
            .ok_or_else(|| Error::InvalidData(format!("face {} addresses loops past the end", index)))?;
        faces.push([corners[0], corners[1], corners[2]]);
    }
    GeometrySnapshot::new(mesh.vertices.clone(), faces)
}

/// Fresh host mesh built from a snapshot: flat-shaded triangles, loops `(3i, 3)`
pub fn apply(snapshot: &GeometrySnapshot) -> Result<PolygonMesh> {
    if snapshot.vertex_count() == 0 {
        return Err(Error::MalformedResult("result has no vertices".to_string()));
    }

    let mut mesh = PolygonMesh {
        vertices: snapshot.vertices().to_vec(),
        loops: Vec::with_capacity(3 * snapshot.face_count()),
        polygons: Vec::with_capacity(snapshot.face_count()),
        ..PolygonMesh::default()
    };
    for face in snapshot.faces() {
        mesh.add_polygon(face, 0, false);
    }
    mesh.recompute_face_normals();

    mesh.validate()
        .map_err(|e| Error::MalformedResult(format!("rebuilt mesh is invalid: {}", e)))?;
    Ok(mesh)
}
