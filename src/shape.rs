//! Collision shapes: deduplicated primitive sets plus their probe segments.

use std::collections::HashMap;

use crate::geometry::{point_key, Intersection, Pose, Primitive, Segment};
use crate::math::Vec3;

/// Immutable body-space collision geometry.
///
/// Shapes are shared between bodies through `Arc<Shape>`; nothing about them
/// changes after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    primitives: Vec<Primitive>,
    segments: Vec<Segment>,
}

impl Shape {
    /// Build a shape from primitives.
    ///
    /// Duplicate primitives and duplicate segments are dropped. A segment
    /// shared by two primitives with the same face normal lies inside a flat
    /// surface (the diagonal of a rectangle, say) and can never start a
    /// contact, so it is pruned too.
    pub fn new(primitives: impl IntoIterator<Item = Primitive>) -> Self {
        let mut unique: Vec<Primitive> = Vec::new();
        for p in primitives {
            if !unique.iter().any(|q| q.same_as(&p)) {
                unique.push(p);
            }
        }

        let mut segments: Vec<Segment> = Vec::new();
        let mut seen: HashMap<[u64; 6], usize> = HashMap::new();
        for s in unique.iter().flat_map(Primitive::segments) {
            seen.entry(s.key()).or_insert_with(|| {
                segments.push(s);
                segments.len() - 1
            });
        }

        let mut owner_normal: HashMap<[u64; 6], [u64; 3]> = HashMap::new();
        let mut embedded: Vec<[u64; 6]> = Vec::new();
        for p in &unique {
            let Some(normal) = p.face_normal() else {
                continue;
            };
            let normal = point_key(&normal);
            for s in p.segments() {
                let key = s.key();
                if owner_normal.insert(key, normal) == Some(normal) {
                    embedded.push(key);
                }
            }
        }
        segments.retain(|s| !embedded.contains(&s.key()));

        Self {
            primitives: unique,
            segments,
        }
    }

    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Sphere of `radius` around the body origin.
    pub fn ball(radius: f64, rank: usize) -> Self {
        Self::new([Primitive::sphere(Vec3::zeros(), radius, rank)])
    }

    /// Box with half-extents `x`, `y`, `z`, two outward-facing triangles per face.
    pub fn cuboid(x: f64, y: f64, z: f64) -> Self {
        let v = [
            Vec3::new(x, y, z),
            Vec3::new(-x, y, z),
            Vec3::new(-x, -y, z),
            Vec3::new(x, -y, z),
            Vec3::new(x, y, -z),
            Vec3::new(-x, y, -z),
            Vec3::new(-x, -y, -z),
            Vec3::new(x, -y, -z),
        ];
        const FACES: [[usize; 3]; 12] = [
            [0, 1, 2],
            [0, 2, 3],
            [4, 6, 5],
            [4, 7, 6],
            [2, 7, 3],
            [2, 6, 7],
            [0, 5, 1],
            [0, 4, 5],
            [0, 7, 4],
            [0, 3, 7],
            [1, 6, 2],
            [1, 5, 6],
        ];
        Self::new(FACES.iter().map(|[a, b, c]| Primitive::triangle(v[*a], v[*b], v[*c])))
    }

    /// Rectangle of `width × height` in the body XY plane, facing +Z.
    pub fn wall(width: f64, height: f64) -> Self {
        let (hx, hy) = (width / 2.0, height / 2.0);
        let v = [
            Vec3::new(hx, hy, 0.0),
            Vec3::new(-hx, hy, 0.0),
            Vec3::new(-hx, -hy, 0.0),
            Vec3::new(hx, -hy, 0.0),
        ];
        Self::new([
            Primitive::triangle(v[0], v[1], v[3]),
            Primitive::triangle(v[1], v[2], v[3]),
        ])
    }

    /// Open box of `x × y × z` centred on the origin: a floor and four side
    /// walls, plus a ceiling when `ceiling` is set.
    pub fn room(x: f64, y: f64, z: f64, ceiling: bool) -> Self {
        let (hx, hy, hz) = (x / 2.0, y / 2.0, z / 2.0);
        let v = [
            Vec3::new(hx, hy, -hz),
            Vec3::new(-hx, hy, -hz),
            Vec3::new(-hx, -hy, -hz),
            Vec3::new(hx, -hy, -hz),
            Vec3::new(hx, hy, hz),
            Vec3::new(-hx, hy, hz),
            Vec3::new(-hx, -hy, hz),
            Vec3::new(hx, -hy, hz),
        ];
        let mut faces = vec![
            [0, 1, 3],
            [1, 2, 3],
            [0, 5, 4],
            [0, 1, 5],
            [2, 6, 7],
            [2, 7, 3],
            [2, 5, 6],
            [2, 1, 5],
            [0, 3, 7],
            [0, 7, 4],
        ];
        if ceiling {
            faces.extend([[7, 5, 4], [7, 6, 5]]);
        }
        Self::new(faces.iter().map(|[a, b, c]| Primitive::triangle(v[*a], v[*b], v[*c])))
    }

    /// Capped cylinder along the body Z axis.
    pub fn cylinder(radius: f64, length: f64, rank: usize) -> Self {
        let half = length / 2.0;
        Self::new([
            Primitive::circle(Vec3::new(0.0, 0.0, half), Vec3::z(), radius, rank),
            Primitive::circle(Vec3::new(0.0, 0.0, -half), -Vec3::z(), radius, rank),
            Primitive::open_cylinder(Vec3::zeros(), Vec3::z(), radius, length, rank),
        ])
    }

    /// World-space contacts between `self` placed at `pose` and `other` placed at `other_pose`.
    ///
    /// Both directions are probed: `other`'s segments against `self`'s
    /// primitives, then `self`'s segments against `other`'s primitives. Every
    /// returned normal points from `self` toward `other`.
    pub fn detect(&self, other: &Shape, pose: &Pose, other_pose: &Pose) -> Vec<Intersection> {
        let mut contacts = self.probe_with(other, pose, other_pose);
        contacts.extend(
            other
                .probe_with(self, other_pose, pose)
                .into_iter()
                .map(|c| Intersection {
                    point: c.point,
                    normal: -c.normal,
                }),
        );
        contacts
    }

    /// Fire `prober`'s segments at this shape's primitives.
    fn probe_with(&self, prober: &Shape, pose: &Pose, prober_pose: &Pose) -> Vec<Intersection> {
        let mut hits = Vec::new();
        for s in &prober.segments {
            let local = s.map(|p| pose.to_body(&prober_pose.to_world(p)));
            for primitive in &self.primitives {
                if let Some(hit) = primitive.intersect_segment(&local) {
                    hits.push(Intersection {
                        point: pose.to_world(&hit.point),
                        normal: pose.rotate(&hit.normal),
                    });
                }
            }
        }
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Quat;

    const EPSILON: f64 = 1e-9;

    fn at(x: f64, y: f64, z: f64) -> Pose {
        Pose::new(Vec3::new(x, y, z), Quat::identity())
    }

    #[test]
    fn test_cuboid_prunes_face_diagonals() {
        let shape = Shape::cuboid(1.0, 2.0, 3.0);
        assert_eq!(shape.primitives().len(), 12);
        assert_eq!(shape.segments().len(), 12);
    }

    #[test]
    fn test_wall_keeps_only_border() {
        let shape = Shape::wall(4.0, 2.0);
        assert_eq!(shape.primitives().len(), 2);
        assert_eq!(shape.segments().len(), 4);
    }

    #[test]
    fn test_duplicate_primitives_removed() {
        let t = Primitive::triangle(Vec3::zeros(), Vec3::x(), Vec3::y());
        let same = Primitive::triangle(Vec3::y(), Vec3::zeros(), Vec3::x());
        let shape = Shape::new([t, same]);
        assert_eq!(shape.primitives().len(), 1);
        assert_eq!(shape.segments().len(), 3);
    }

    #[test]
    fn test_room_face_counts() {
        assert_eq!(Shape::room(4.0, 4.0, 4.0, false).primitives().len(), 10);
        assert_eq!(Shape::room(4.0, 4.0, 4.0, true).primitives().len(), 12);
    }

    #[test]
    fn test_cylinder_keeps_cap_rays() {
        let shape = Shape::cylinder(1.0, 2.0, 6);
        assert_eq!(shape.primitives().len(), 3);
        // 6 rays per cap plus 6 axial lines
        assert_eq!(shape.segments().len(), 18);
    }

    #[test]
    fn test_ball_resting_on_wall() {
        let wall = Shape::wall(2.0, 2.0);
        let ball = Shape::ball(1.0, 8);
        let contacts = wall.detect(&ball, &at(0.0, 0.0, 0.0), &at(0.0, 0.0, 0.5));
        assert!(!contacts.is_empty());
        for c in &contacts {
            assert!((c.normal - Vec3::z()).norm() < EPSILON);
            assert!(c.point.z.abs() < EPSILON);
        }
    }

    #[test]
    fn test_separated_shapes_have_no_contacts() {
        let a = Shape::cuboid(0.5, 0.5, 0.5);
        let b = Shape::ball(0.5, 8);
        assert!(a.detect(&b, &at(0.0, 0.0, 0.0), &at(3.0, 0.0, 0.0)).is_empty());
    }

    #[test]
    fn test_detect_normals_point_from_self_to_other() {
        let a = Shape::ball(1.0, 8);
        let b = Shape::ball(1.0, 8);
        let contacts = a.detect(&b, &at(0.0, 0.0, 0.0), &at(1.9, 0.0, 0.0));
        assert!(!contacts.is_empty());
        assert!(contacts.iter().all(|c| c.normal.x > 0.0));
    }

    #[test]
    fn test_overlapping_balls_touch_along_every_axis() {
        for (rank, gap) in [(6, 1.5), (8, 1.5), (8, 1.95)] {
            let a = Shape::ball(1.0, rank);
            let b = Shape::ball(1.0, rank);
            for axis in [Vec3::x(), Vec3::y(), Vec3::z()] {
                let offset = axis * gap;
                let contacts = a.detect(&b, &at(0.0, 0.0, 0.0), &at(offset.x, offset.y, offset.z));
                assert!(!contacts.is_empty(), "rank {} at {:?}", rank, offset);
                assert!(
                    contacts.iter().all(|c| c.normal.dot(&axis) > 0.0),
                    "rank {} at {:?}",
                    rank,
                    offset
                );
            }
        }
    }

    #[test]
    fn test_detect_respects_orientation() {
        // Wall rotated to face +X, ball just in front of it
        let wall = Shape::wall(2.0, 2.0);
        let ball = Shape::ball(1.0, 8);
        let facing_x = Pose::new(
            Vec3::zeros(),
            crate::math::rotation_between(&Vec3::z(), &Vec3::x()),
        );
        let contacts = wall.detect(&ball, &facing_x, &at(0.5, 0.0, 0.0));
        assert!(!contacts.is_empty());
        assert!(contacts.iter().all(|c| (c.normal - Vec3::x()).norm() < EPSILON));
    }
}
