//! OBJ format support

use crate::{MeshReader, MeshWriter};
use ::obj::{LoadConfig, ObjData};
use meshbridge_core::{Error, Point3f, PolygonMesh, Result};
use meshbridge_scene::Material;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

/// Object name the OBJ loader uses when the file has no `o` line
const UNNAMED_OBJECT: &str = "default";

/// A named mesh read from a file
#[derive(Debug, Clone, PartialEq)]
pub struct ObjModel {
    pub name: String,
    pub mesh: PolygonMesh,
}

pub struct ObjReader;
pub struct ObjWriter;

/// Parse OBJ text; every polygon of every object and group ends up in one mesh.
/// Texture coordinates, normals and material references are ignored.
pub fn parse<R: Read>(reader: R, fallback_name: &str) -> Result<ObjModel> {
    let data = ObjData::load_buf_with_config(reader, LoadConfig { strict: false })
        .map_err(|e| Error::InvalidData(format!("OBJ parse error: {}", e)))?;

    let mut mesh = PolygonMesh {
        vertices: data
            .position
            .iter()
            .map(|&[x, y, z]| Point3f::new(x, y, z))
            .collect(),
        ..PolygonMesh::default()
    };
    let polygons = data
        .objects
        .iter()
        .flat_map(|object| &object.groups)
        .flat_map(|group| &group.polys);
    for (index, polygon) in polygons.enumerate() {
        let corners: Vec<usize> = polygon.0.iter().map(|corner| corner.0).collect();
        if corners.len() < 3 {
            return Err(Error::InvalidData(format!(
                "OBJ face {} has only {} corners",
                index,
                corners.len()
            )));
        }
        mesh.add_polygon(&corners, 0, false);
    }
    mesh.validate()?;

    let name = data
        .objects
        .iter()
        .map(|object| object.name.as_str())
        .find(|name| !name.is_empty() && *name != UNNAMED_OBJECT)
        .unwrap_or(fallback_name)
        .to_string();
    log::debug!(
        "Read OBJ \"{}\": {} vertices, {} faces",
        name,
        mesh.vertex_count(),
        mesh.polygon_count()
    );
    Ok(ObjModel { name, mesh })
}

pub fn read_obj<P: AsRef<Path>>(path: P) -> Result<ObjModel> {
    let path = path.as_ref();
    let fallback = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Mesh")
        .to_string();
    let file = File::open(path)?;
    parse(file, &fallback)
}

/// Material name used in the OBJ/MTL pair for slot `slot`
fn slot_name(material: Option<&Material>, slot: usize) -> String {
    let base = material.map(|m| m.name.as_str()).unwrap_or("Material");
    let base: String = base
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect();
    format!("{}_{}", base, slot)
}

/// Write the mesh as OBJ; when `materials` is not empty (one entry per slot)
/// a sibling `.mtl` file is written as well
pub fn write_obj<P: AsRef<Path>>(
    path: P,
    name: &str,
    mesh: &PolygonMesh,
    materials: &[Material],
) -> Result<()> {
    let path = path.as_ref();
    mesh.validate()?;

    let with_materials = !materials.is_empty();
    if with_materials {
        if let Some(polygon) = mesh.polygons.iter().find(|p| p.material_index >= materials.len()) {
            return Err(Error::InvalidData(format!(
                "face uses material slot {} but only {} materials were given",
                polygon.material_index,
                materials.len()
            )));
        }
    }

    let mut out = BufWriter::new(File::create(path)?);
    writeln!(out, "# meshbridge")?;
    if with_materials {
        let mtl_path = path.with_extension("mtl");
        write_mtl(&mtl_path, materials)?;
        let mtl_name = mtl_path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("materials.mtl");
        writeln!(out, "mtllib {}", mtl_name)?;
    }
    writeln!(out, "o {}", name)?;
    for v in &mesh.vertices {
        writeln!(out, "v {} {} {}", v.x, v.y, v.z)?;
    }

    let mut current_slot = None;
    for (index, polygon) in mesh.polygons.iter().enumerate() {
        if with_materials && current_slot != Some(polygon.material_index) {
            current_slot = Some(polygon.material_index);
            let material = materials.get(polygon.material_index);
            writeln!(out, "usemtl {}", slot_name(material, polygon.material_index))?;
        }
        write!(out, "f")?;
        for &v in mesh.polygon_vertices(index) {
            write!(out, " {}", v + 1)?;
        }
        writeln!(out)?;
    }
    out.flush()?;

    log::debug!(
        "Wrote OBJ \"{}\" to {}: {} vertices, {} faces",
        name,
        path.display(),
        mesh.vertex_count(),
        mesh.polygon_count()
    );
    Ok(())
}

fn write_mtl(path: &Path, materials: &[Material]) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    writeln!(out, "# meshbridge")?;
    for (slot, material) in materials.iter().enumerate() {
        let [r, g, b, a] = material.diffuse_color;
        writeln!(out, "newmtl {}", slot_name(Some(material), slot))?;
        writeln!(out, "Kd {} {} {}", r, g, b)?;
        writeln!(out, "d {}", a)?;
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}

impl MeshReader for ObjReader {
    fn read_mesh<P: AsRef<Path>>(path: P) -> Result<ObjModel> {
        read_obj(path)
    }
}

impl MeshWriter for ObjWriter {
    fn write_mesh<P: AsRef<Path>>(path: P, name: &str, mesh: &PolygonMesh, materials: &[Material]) -> Result<()> {
        write_obj(path, name, mesh, materials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshbridge_core::MaterialHandle;
    use std::fs;
    use std::io::Cursor;

    fn temp_path(file: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("meshbridge_{}_{}", std::process::id(), file))
    }

    #[test]
    fn test_parse_mixed_face_formats() {
        let text = "o Pyramid\n\
                    v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nv 0.5 0.5 1\n\
                    vt 0 0\nvn 0 0 1\n\
                    f 1 4 3 2\n\
                    f 1/1 2/1 5/1\n\
                    f 2//1 3//1 5//1\n\
                    f 3/1/1 4/1/1 5/1/1\n";
        let model = parse(Cursor::new(text), "Fallback").unwrap();
        assert_eq!(model.name, "Pyramid");
        assert_eq!(model.mesh.vertex_count(), 5);
        assert_eq!(model.mesh.polygon_count(), 4);
        assert_eq!(model.mesh.polygon_vertices(0), &[0, 3, 2, 1]);
        assert_eq!(model.mesh.polygon_vertices(3), &[2, 3, 4]);
    }

    #[test]
    fn test_parse_rejects_bad_index() {
        let text = "v 0 0 0\nv 1 0 0\nf 1 2 3\n";
        assert!(parse(Cursor::new(text), "Broken").is_err());
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf -1 -2 -4\n";
        assert!(parse(Cursor::new(text), "Broken").is_err());
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 0 1 2\n";
        assert!(parse(Cursor::new(text), "Broken").is_err());
    }

    #[test]
    fn test_parse_groups_and_fallback_name() {
        let text = "# two groups, no object line\n\
                    v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\n\
                    g left\nf 1 2 3\n\
                    g right\nusemtl Red\nf -4 -2 -1\n";
        let model = parse(Cursor::new(text), "Fallback").unwrap();
        assert_eq!(model.name, "Fallback");
        assert_eq!(model.mesh.polygon_count(), 2);
        assert_eq!(model.mesh.polygon_vertices(0), &[0, 1, 2]);
        assert_eq!(model.mesh.polygon_vertices(1), &[0, 2, 3]);
    }

    #[test]
    fn test_write_and_read_back() {
        let path = temp_path("segmented.obj");
        let mut mesh = PolygonMesh::from_polygons(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(1.0, 1.0, 0.0),
                Point3f::new(0.0, 1.0, 0.0),
            ],
            [[0usize, 1, 2], [0, 2, 3]],
        );
        mesh.materials = vec![MaterialHandle(4), MaterialHandle(9)];
        mesh.polygons[1].material_index = 1;
        let materials = vec![
            Material {
                name: "Material".to_string(),
                diffuse_color: [1.0, 0.0, 0.0, 1.0],
            },
            Material {
                name: "Material".to_string(),
                diffuse_color: [0.0, 1.0, 0.0, 0.5],
            },
        ];

        write_obj(&path, "Quad", &mesh, &materials).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("usemtl Material_0"));
        assert!(text.contains("usemtl Material_1"));
        let mtl = fs::read_to_string(path.with_extension("mtl")).unwrap();
        assert!(mtl.contains("newmtl Material_1\nKd 0 1 0\nd 0.5"));

        let model = read_obj(&path).unwrap();
        assert_eq!(model.name, "Quad");
        assert_eq!(model.mesh.vertices, mesh.vertices);
        assert_eq!(model.mesh.polygon_vertices(1), &[0, 2, 3]);

        let _ = fs::remove_file(&path);
        let _ = fs::remove_file(path.with_extension("mtl"));
    }

    #[test]
    fn test_write_rejects_missing_material() {
        let path = temp_path("missing.obj");
        let mut mesh = PolygonMesh::from_polygons(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(0.0, 1.0, 0.0),
            ],
            [[0usize, 1, 2]],
        );
        mesh.polygons[0].material_index = 3;
        let materials = vec![Material {
            name: "Only".to_string(),
            diffuse_color: [1.0; 4],
        }];
        assert!(write_obj(&path, "Tri", &mesh, &materials).is_err());
        assert!(!path.exists());
    }
}
