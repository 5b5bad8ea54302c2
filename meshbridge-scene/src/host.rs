//! The host collaborator surface consumed by the pipeline

use meshbridge_core::{MaterialHandle, PolygonMesh, Result, Rgba, TransformState};
use serde::{Deserialize, Serialize};

/// Stable identifier of a scene object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(pub u64);

/// Host editing mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InteractionMode {
    /// Whole objects are selected and transformed
    #[default]
    ObjectLevel,
    /// Vertices, edges or faces of one mesh are being edited
    ElementLevel,
    /// Any other mode (sculpting, painting, ...)
    Other,
}

/// What kind of data an object carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectKind {
    Mesh,
    Empty,
}

/// A material resource with a viewport colour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    pub diffuse_color: Rgba,
}

/// Everything the pipeline needs from a modeling host.
///
/// Objects created with [`Host::create_object`] start detached: they exist but
/// are not part of the scene until [`Host::link_to_scene`] is called. This lets
/// callers stage a replacement completely before touching the original.
pub trait Host {
    /// The active object, whatever its kind
    fn active_object(&self) -> Option<ObjectId>;

    fn object_kind(&self, object: ObjectId) -> Result<ObjectKind>;

    fn object_name(&self, object: ObjectId) -> Result<String>;

    /// Rename an object; the host may adjust the name to keep names unique.
    /// Returns the name actually assigned.
    fn rename_object(&mut self, object: ObjectId, name: &str) -> Result<String>;

    fn interaction_mode(&self) -> InteractionMode;

    fn set_interaction_mode(&mut self, mode: InteractionMode);

    /// Mesh data of a mesh object
    fn mesh(&self, object: ObjectId) -> Result<&PolygonMesh>;

    fn mesh_mut(&mut self, object: ObjectId) -> Result<&mut PolygonMesh>;

    fn read_transform(&self, object: ObjectId) -> Result<TransformState>;

    fn set_transform(&mut self, object: ObjectId, transform: TransformState) -> Result<()>;

    /// Selected objects linked into the scene, in scene order
    fn selected_objects(&self) -> Vec<ObjectId>;

    fn material(&self, handle: MaterialHandle) -> Option<&Material>;

    fn create_material(&mut self, name: &str, color: Rgba) -> MaterialHandle;

    /// Empty the material slot list of an object's mesh
    fn clear_materials(&mut self, object: ObjectId) -> Result<()>;

    /// Append a material slot to an object's mesh; returns the new slot index
    fn append_material(&mut self, object: ObjectId, material: MaterialHandle) -> Result<usize>;

    fn deselect_all(&mut self);

    fn select(&mut self, object: ObjectId) -> Result<()>;

    /// Create a detached mesh object
    fn create_object(&mut self, name: &str, mesh: PolygonMesh) -> Result<ObjectId>;

    fn link_to_scene(&mut self, object: ObjectId) -> Result<()>;

    /// Remove an object from the scene without destroying it
    fn unlink_from_scene(&mut self, object: ObjectId) -> Result<()>;

    fn is_linked(&self, object: ObjectId) -> bool;

    /// Destroy an object together with the mesh data it owns
    fn delete_object(&mut self, object: ObjectId) -> Result<()>;

    fn set_active_and_selected(&mut self, object: ObjectId) -> Result<()>;
}
