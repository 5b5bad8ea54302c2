//! In-memory host scene
//!
//! A complete [`Host`] implementation without any UI: objects, one scene
//! collection, a material table, selection state and an interaction mode.
//! Object names are unique across all objects (linked or detached); a name
//! that is already taken receives a numeric `.001`-style suffix.

use crate::host::*;
use meshbridge_core::{Error, MaterialHandle, PolygonMesh, Result, Rgba, TransformState};
use std::collections::{BTreeMap, BTreeSet};

/// Data carried by a scene object
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectData {
    Mesh(PolygonMesh),
    Empty,
}

/// A scene object
#[derive(Debug, Clone, PartialEq)]
pub struct SceneObject {
    pub name: String,
    pub data: ObjectData,
    pub transform: TransformState,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryScene {
    objects: BTreeMap<ObjectId, SceneObject>,
    collection: Vec<ObjectId>,
    materials: Vec<Material>,
    selected: BTreeSet<ObjectId>,
    active: Option<ObjectId>,
    mode: InteractionMode,
    next_id: u64,
    object_limit: Option<usize>,
}

impl InMemoryScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse to create objects once `limit` objects exist
    pub fn with_object_limit(mut self, limit: usize) -> Self {
        self.object_limit = Some(limit);
        self
    }

    /// Create, link and return a mesh object
    pub fn add_mesh_object(
        &mut self,
        name: &str,
        mesh: PolygonMesh,
        transform: TransformState,
    ) -> Result<ObjectId> {
        let id = self.create_object(name, mesh)?;
        self.set_transform(id, transform)?;
        self.link_to_scene(id)?;
        Ok(id)
    }

    /// Create and link an object without geometry
    pub fn add_empty(&mut self, name: &str) -> Result<ObjectId> {
        let id = self.insert(name, ObjectData::Empty)?;
        self.link_to_scene(id)?;
        Ok(id)
    }

    pub fn object(&self, object: ObjectId) -> Option<&SceneObject> {
        self.objects.get(&object)
    }

    /// Linked objects in scene order
    pub fn linked_objects(&self) -> &[ObjectId] {
        &self.collection
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn is_selected(&self, object: ObjectId) -> bool {
        self.selected.contains(&object)
    }

    fn get(&self, object: ObjectId) -> Result<&SceneObject> {
        self.objects
            .get(&object)
            .ok_or_else(|| Error::InvalidSelection(format!("object {} does not exist", object.0)))
    }

    fn get_mut(&mut self, object: ObjectId) -> Result<&mut SceneObject> {
        self.objects
            .get_mut(&object)
            .ok_or_else(|| Error::InvalidSelection(format!("object {} does not exist", object.0)))
    }

    fn unique_name(&self, base: &str, exclude: Option<ObjectId>) -> String {
        let taken = |candidate: &str| {
            self.objects
                .iter()
                .any(|(&id, o)| Some(id) != exclude && o.name == candidate)
        };
        if !taken(base) {
            return base.to_string();
        }
        (1u32..)
            .map(|n| format!("{}.{:03}", base, n))
            .find(|candidate| !taken(candidate))
            .unwrap_or_else(|| base.to_string())
    }

    fn insert(&mut self, name: &str, data: ObjectData) -> Result<ObjectId> {
        if let Some(limit) = self.object_limit {
            if self.objects.len() >= limit {
                return Err(Error::ReplacementFailure(format!(
                    "scene object limit of {} reached",
                    limit
                )));
            }
        }
        let id = ObjectId(self.next_id);
        self.next_id += 1;
        let name = self.unique_name(name, None);
        log::debug!("Created object {} \"{}\"", id.0, name);
        self.objects.insert(
            id,
            SceneObject {
                name,
                data,
                transform: TransformState::identity(),
            },
        );
        Ok(id)
    }
}

impl Host for InMemoryScene {
    fn active_object(&self) -> Option<ObjectId> {
        self.active
    }

    fn object_kind(&self, object: ObjectId) -> Result<ObjectKind> {
        Ok(match self.get(object)?.data {
            ObjectData::Mesh(_) => ObjectKind::Mesh,
            ObjectData::Empty => ObjectKind::Empty,
        })
    }

    fn object_name(&self, object: ObjectId) -> Result<String> {
        Ok(self.get(object)?.name.clone())
    }

    fn rename_object(&mut self, object: ObjectId, name: &str) -> Result<String> {
        self.get(object)?;
        let unique = self.unique_name(name, Some(object));
        self.get_mut(object)?.name = unique.clone();
        Ok(unique)
    }

    fn interaction_mode(&self) -> InteractionMode {
        self.mode
    }

    fn set_interaction_mode(&mut self, mode: InteractionMode) {
        self.mode = mode;
    }

    fn mesh(&self, object: ObjectId) -> Result<&PolygonMesh> {
        let entry = self.get(object)?;
        match &entry.data {
            ObjectData::Mesh(mesh) => Ok(mesh),
            ObjectData::Empty => Err(Error::InvalidSelection(format!(
                "object \"{}\" is not a mesh",
                entry.name
            ))),
        }
    }

    fn mesh_mut(&mut self, object: ObjectId) -> Result<&mut PolygonMesh> {
        let entry = self.get_mut(object)?;
        match &mut entry.data {
            ObjectData::Mesh(mesh) => Ok(mesh),
            ObjectData::Empty => Err(Error::InvalidSelection(format!(
                "object \"{}\" is not a mesh",
                entry.name
            ))),
        }
    }

    fn read_transform(&self, object: ObjectId) -> Result<TransformState> {
        Ok(self.get(object)?.transform)
    }

    fn set_transform(&mut self, object: ObjectId, transform: TransformState) -> Result<()> {
        self.get_mut(object)?.transform = transform;
        Ok(())
    }

    fn selected_objects(&self) -> Vec<ObjectId> {
        self.collection
            .iter()
            .copied()
            .filter(|id| self.selected.contains(id))
            .collect()
    }

    fn material(&self, handle: MaterialHandle) -> Option<&Material> {
        self.materials.get(handle.0)
    }

    fn create_material(&mut self, name: &str, color: Rgba) -> MaterialHandle {
        let handle = MaterialHandle(self.materials.len());
        self.materials.push(Material {
            name: name.to_string(),
            diffuse_color: color,
        });
        handle
    }

    fn clear_materials(&mut self, object: ObjectId) -> Result<()> {
        let mesh = self.mesh_mut(object)?;
        mesh.materials.clear();
        for polygon in &mut mesh.polygons {
            polygon.material_index = 0;
        }
        Ok(())
    }

    fn append_material(&mut self, object: ObjectId, material: MaterialHandle) -> Result<usize> {
        if material.0 >= self.materials.len() {
            return Err(Error::InvalidData(format!("material {} does not exist", material.0)));
        }
        let mesh = self.mesh_mut(object)?;
        mesh.materials.push(material);
        Ok(mesh.materials.len() - 1)
    }

    fn deselect_all(&mut self) {
        self.selected.clear();
    }

    fn select(&mut self, object: ObjectId) -> Result<()> {
        self.get(object)?;
        self.selected.insert(object);
        Ok(())
    }

    fn create_object(&mut self, name: &str, mesh: PolygonMesh) -> Result<ObjectId> {
        self.insert(name, ObjectData::Mesh(mesh))
    }

    fn link_to_scene(&mut self, object: ObjectId) -> Result<()> {
        self.get(object)?;
        if self.collection.contains(&object) {
            return Err(Error::InvalidData(format!("object {} is already linked", object.0)));
        }
        self.collection.push(object);
        Ok(())
    }

    fn unlink_from_scene(&mut self, object: ObjectId) -> Result<()> {
        let position = self
            .collection
            .iter()
            .position(|&id| id == object)
            .ok_or_else(|| Error::InvalidSelection(format!("object {} is not linked", object.0)))?;
        self.collection.remove(position);
        self.selected.remove(&object);
        if self.active == Some(object) {
            self.active = None;
        }
        Ok(())
    }

    fn is_linked(&self, object: ObjectId) -> bool {
        self.collection.contains(&object)
    }

    fn delete_object(&mut self, object: ObjectId) -> Result<()> {
        let removed = self
            .objects
            .remove(&object)
            .ok_or_else(|| Error::InvalidSelection(format!("object {} does not exist", object.0)))?;
        self.collection.retain(|&id| id != object);
        self.selected.remove(&object);
        if self.active == Some(object) {
            self.active = None;
        }
        log::debug!("Deleted object {} \"{}\"", object.0, removed.name);
        Ok(())
    }

    fn set_active_and_selected(&mut self, object: ObjectId) -> Result<()> {
        if !self.is_linked(object) {
            return Err(Error::InvalidSelection(format!(
                "object {} is not linked into the scene",
                object.0
            )));
        }
        self.selected.insert(object);
        self.active = Some(object);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshbridge_core::Point3f;

    fn triangle() -> PolygonMesh {
        PolygonMesh::from_polygons(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(0.0, 1.0, 0.0),
            ],
            [[0usize, 1, 2]],
        )
    }

    #[test]
    fn test_unique_names() {
        let mut scene = InMemoryScene::new();
        let a = scene.add_mesh_object("Cube", triangle(), TransformState::identity()).unwrap();
        let b = scene.create_object("Cube", triangle()).unwrap();
        assert_eq!(scene.object_name(a).unwrap(), "Cube");
        assert_eq!(scene.object_name(b).unwrap(), "Cube.001");

        scene.delete_object(a).unwrap();
        assert_eq!(scene.rename_object(b, "Cube").unwrap(), "Cube");
    }

    #[test]
    fn test_detached_objects_are_not_selectable() {
        let mut scene = InMemoryScene::new();
        let id = scene.create_object("Staged", triangle()).unwrap();
        assert!(!scene.is_linked(id));
        assert!(scene.set_active_and_selected(id).is_err());

        scene.link_to_scene(id).unwrap();
        scene.set_active_and_selected(id).unwrap();
        assert_eq!(scene.active_object(), Some(id));
        assert_eq!(scene.selected_objects(), vec![id]);
    }

    #[test]
    fn test_unlink_clears_selection() {
        let mut scene = InMemoryScene::new();
        let id = scene.add_mesh_object("Cube", triangle(), TransformState::identity()).unwrap();
        scene.set_active_and_selected(id).unwrap();
        scene.unlink_from_scene(id).unwrap();
        assert_eq!(scene.active_object(), None);
        assert!(scene.selected_objects().is_empty());
        assert!(scene.object(id).is_some());
    }

    #[test]
    fn test_material_slots() {
        let mut scene = InMemoryScene::new();
        let id = scene.add_mesh_object("Cube", triangle(), TransformState::identity()).unwrap();
        let red = scene.create_material("Material", [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(scene.append_material(id, red).unwrap(), 0);
        assert_eq!(scene.append_material(id, red).unwrap(), 1);
        assert!(scene.append_material(id, MaterialHandle(7)).is_err());

        scene.clear_materials(id).unwrap();
        assert!(scene.mesh(id).unwrap().materials.is_empty());
        // Material resources outlive the slots that referenced them
        assert_eq!(scene.materials().len(), 1);
    }

    #[test]
    fn test_empty_is_not_a_mesh() {
        let mut scene = InMemoryScene::new();
        let id = scene.add_empty("Empty").unwrap();
        assert_eq!(scene.object_kind(id).unwrap(), ObjectKind::Empty);
        assert!(matches!(scene.mesh(id), Err(Error::InvalidSelection(_))));
    }

    #[test]
    fn test_object_limit() {
        let mut scene = InMemoryScene::new().with_object_limit(1);
        scene.create_object("A", triangle()).unwrap();
        assert!(matches!(
            scene.create_object("B", triangle()),
            Err(Error::ReplacementFailure(_))
        ));
    }
}
