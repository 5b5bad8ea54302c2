//! Core traits for meshbridge

use crate::{mesh::GeometrySnapshot, point::*, polygon::PolygonMesh, transform::TransformState};

/// Trait for objects with a spatial extent
pub trait Drawable {
    /// Get the axis-aligned bounding box of the object
    fn bounding_box(&self) -> (Point3f, Point3f);

    /// Get the center point of the object
    fn center(&self) -> Point3f {
        let (min, max) = self.bounding_box();
        nalgebra::center(&min, &max)
    }

    /// Bounding box of the object after applying `transform` to every vertex
    fn world_bounding_box(&self, transform: &TransformState) -> (Point3f, Point3f);
}

fn bounds<I>(points: I) -> (Point3f, Point3f)
where
    I: IntoIterator<Item = Point3f>,
{
    let mut points = points.into_iter();
    let Some(first) = points.next() else {
        return (Point3f::origin(), Point3f::origin());
    };

    points.fold((first, first), |(min, max), p| {
        (
            Point3f::new(min.x.min(p.x), min.y.min(p.y), min.z.min(p.z)),
            Point3f::new(max.x.max(p.x), max.y.max(p.y), max.z.max(p.z)),
        )
    })
}

impl Drawable for GeometrySnapshot {
    fn bounding_box(&self) -> (Point3f, Point3f) {
        bounds(self.vertices().iter().copied())
    }

    fn world_bounding_box(&self, transform: &TransformState) -> (Point3f, Point3f) {
        bounds(self.vertices().iter().map(|v| transform.transform_point(v)))
    }
}

impl Drawable for PolygonMesh {
    fn bounding_box(&self) -> (Point3f, Point3f) {
        bounds(self.vertices.iter().copied())
    }

    fn world_bounding_box(&self, transform: &TransformState) -> (Point3f, Point3f) {
        bounds(self.vertices.iter().map(|v| transform.transform_point(v)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    #[test]
    fn test_bounding_box() {
        let mesh = PolygonMesh::from_polygons(
            vec![
                Point3f::new(-1.0, 0.0, 2.0),
                Point3f::new(3.0, -2.0, 0.0),
                Point3f::new(0.0, 1.0, 1.0),
            ],
            [[0usize, 1, 2]],
        );
        let (min, max) = mesh.bounding_box();
        assert_eq!(min, Point3f::new(-1.0, -2.0, 0.0));
        assert_eq!(max, Point3f::new(3.0, 1.0, 2.0));
        assert_eq!(mesh.center(), Point3f::new(1.0, -0.5, 1.0));

        let moved = TransformState::new(Vector3::new(10.0, 0.0, 0.0), Vector3::zeros(), Vector3::new(1.0, 1.0, 1.0));
        let (wmin, wmax) = mesh.world_bounding_box(&moved);
        assert_eq!(wmin.x, 9.0);
        assert_eq!(wmax.x, 13.0);
    }

    #[test]
    fn test_empty_bounding_box() {
        let (min, max) = PolygonMesh::new().bounding_box();
        assert_eq!(min, Point3f::origin());
        assert_eq!(max, Point3f::origin());
    }
}
