//! Stage-then-swap object replacement
//!
//! The replacement object is created detached, given the captured transform
//! and checked before the original is touched. The swap itself is
//! unlink-old, link-new; if linking fails the original is put back. The
//! original is destroyed only once the new object is in the scene.

use meshbridge_core::{Error, PolygonMesh, Result, TransformState};
use meshbridge_scene::{Host, ObjectId};

fn replacement_failure(step: &str, error: Error) -> Error {
    match error {
        Error::ReplacementFailure(_) => error,
        other => Error::ReplacementFailure(format!("{}: {}", step, other)),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectReplacer;

impl ObjectReplacer {
    pub fn new() -> Self {
        Self
    }

    /// Swap `old` for a new object carrying `mesh`, `transform` and `name`
    pub fn replace<H: Host + ?Sized>(
        &self,
        host: &mut H,
        old: ObjectId,
        mesh: PolygonMesh,
        transform: TransformState,
        name: &str,
    ) -> Result<ObjectId> {
        mesh.validate()
            .map_err(|e| replacement_failure("new mesh is invalid", e))?;

        let staged = host
            .create_object(name, mesh)
            .map_err(|e| replacement_failure("cannot create object", e))?;
        log::debug!("Staged replacement object {} for {}", staged.0, old.0);

        if let Err(e) = Self::prepare(host, staged, transform) {
            Self::discard(host, staged);
            return Err(e);
        }

        host.deselect_all();
        if let Err(e) = host.select(old) {
            Self::discard(host, staged);
            return Err(replacement_failure("cannot select original object", e));
        }
        let was_linked = host.is_linked(old);
        if was_linked {
            if let Err(e) = host.unlink_from_scene(old) {
                Self::discard(host, staged);
                return Err(replacement_failure("cannot unlink original object", e));
            }
        }

        if let Err(e) = host.link_to_scene(staged) {
            if was_linked {
                if let Err(relink) = host.link_to_scene(old) {
                    log::warn!("Could not relink original object {}: {}", old.0, relink);
                }
                if let Err(select) = host.set_active_and_selected(old) {
                    log::warn!("Could not reselect original object {}: {}", old.0, select);
                }
            }
            Self::discard(host, staged);
            return Err(replacement_failure("cannot link new object", e));
        }

        if let Err(e) = host.delete_object(old) {
            log::warn!("Original object {} left detached: {}", old.0, e);
        }

        let assigned = host.rename_object(staged, name)?;
        if assigned != name {
            log::warn!("Replacement object was named \"{}\" instead of \"{}\"", assigned, name);
        }
        host.set_active_and_selected(staged)?;
        log::info!("Replaced object {} with {} \"{}\"", old.0, staged.0, assigned);
        Ok(staged)
    }

    fn prepare<H: Host + ?Sized>(host: &mut H, staged: ObjectId, transform: TransformState) -> Result<()> {
        host.set_transform(staged, transform)
            .map_err(|e| replacement_failure("cannot apply transform", e))?;
        if host.read_transform(staged)? != transform {
            return Err(Error::ReplacementFailure(
                "host did not keep the transform of the new object".to_string(),
            ));
        }
        host.mesh(staged)?
            .validate()
            .map_err(|e| replacement_failure("staged mesh is invalid", e))
    }

    fn discard<H: Host + ?Sized>(host: &mut H, staged: ObjectId) {
        if let Err(e) = host.delete_object(staged) {
            log::warn!("Could not discard staged object {}: {}", staged.0, e);
        }
    }
}
