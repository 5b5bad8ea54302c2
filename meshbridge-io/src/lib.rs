//! File I/O for meshbridge
//!
//! Meshes are exchanged as Wavefront OBJ; material slots are written as
//! `usemtl` runs with a sibling MTL file holding each material's colour.

pub mod obj;

pub use crate::obj::{read_obj, write_obj, ObjModel, ObjReader, ObjWriter};

use meshbridge_core::{Error, PolygonMesh, Result};
use meshbridge_scene::Material;
use std::path::Path;

/// Trait for reading named meshes from files
pub trait MeshReader {
    fn read_mesh<P: AsRef<Path>>(path: P) -> Result<ObjModel>;
}

/// Trait for writing meshes and their material slots to files
pub trait MeshWriter {
    fn write_mesh<P: AsRef<Path>>(path: P, name: &str, mesh: &PolygonMesh, materials: &[Material]) -> Result<()>;
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_ascii_lowercase())
}

/// Auto-detect format and read a mesh
pub fn read_mesh<P: AsRef<Path>>(path: P) -> Result<ObjModel> {
    let path = path.as_ref();
    match extension(path).as_deref() {
        Some("obj") => ObjReader::read_mesh(path),
        _ => Err(Error::UnsupportedFormat(format!(
            "Unsupported mesh format: {:?}",
            path.extension()
        ))),
    }
}

/// Auto-detect format and write a mesh
pub fn write_mesh<P: AsRef<Path>>(
    path: P,
    name: &str,
    mesh: &PolygonMesh,
    materials: &[Material],
) -> Result<()> {
    let path = path.as_ref();
    match extension(path).as_deref() {
        Some("obj") => ObjWriter::write_mesh(path, name, mesh, materials),
        _ => Err(Error::UnsupportedFormat(format!(
            "Unsupported mesh format: {:?}",
            path.extension()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshbridge_core::ErrorKind;

    #[test]
    fn test_unknown_extension() {
        let err = read_mesh("scene.fbx").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);
        let err = write_mesh("scene", "Mesh", &PolygonMesh::new(), &[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);
    }
}
