//! Narrow-phase geometry.
//!
//! Every primitive can intersect a [`Segment`] in closed form and can describe
//! its own boundary as a set of probe segments. Collision between two shapes is
//! found by firing one shape's probes at the other's primitives (see
//! [`crate::shape::Shape::detect`]).

use core::f64::consts::{FRAC_PI_2, PI};

use crate::math::{project_to_plane, project_to_vector, rotation_between, Quat, Vec3};

/// Directed line segment between two points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub start: Vec3,
    pub end: Vec3,
}

impl Segment {
    #[inline]
    pub fn new(start: Vec3, end: Vec3) -> Self {
        Self { start, end }
    }

    #[inline]
    pub fn direction(&self) -> Vec3 {
        self.end - self.start
    }

    #[inline]
    pub fn length(&self) -> f64 {
        self.direction().norm()
    }

    /// Apply `f` to both endpoints.
    #[inline]
    pub fn map(&self, f: impl Fn(&Vec3) -> Vec3) -> Segment {
        Segment::new(f(&self.start), f(&self.end))
    }

    /// Key identifying the segment regardless of endpoint order.
    ///
    /// Two segments share a key exactly when their endpoints are bitwise equal
    /// as an unordered pair (with `-0.0` folded into `0.0`).
    pub fn key(&self) -> [u64; 6] {
        let a = point_key(&self.start);
        let b = point_key(&self.end);
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        [lo[0], lo[1], lo[2], hi[0], hi[1], hi[2]]
    }
}

#[inline]
pub(crate) fn point_key(p: &Vec3) -> [u64; 3] {
    // Adding 0.0 maps -0.0 to +0.0
    [(p.x + 0.0).to_bits(), (p.y + 0.0).to_bits(), (p.z + 0.0).to_bits()]
}

/// Rigid placement of a body frame in the world.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub orientation: Quat,
}

impl Pose {
    pub fn new(position: Vec3, orientation: Quat) -> Self {
        Self {
            position,
            orientation,
        }
    }

    #[inline]
    pub fn to_world(&self, p: &Vec3) -> Vec3 {
        self.orientation * p + self.position
    }

    #[inline]
    pub fn to_body(&self, p: &Vec3) -> Vec3 {
        self.orientation.inverse_transform_vector(&(p - self.position))
    }

    /// Rotate a body-frame direction into the world frame.
    #[inline]
    pub fn rotate(&self, v: &Vec3) -> Vec3 {
        self.orientation * v
    }
}

/// Where a segment pierces a primitive, with the outward surface normal there.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intersection {
    pub point: Vec3,
    pub normal: Vec3,
}

/// Flat triangle with precomputed face and edge normals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    a: Vec3,
    b: Vec3,
    c: Vec3,
    normal: Vec3,
    ab_normal: Vec3,
    bc_normal: Vec3,
    ac_normal: Vec3,
}

impl Triangle {
    /// Triangle with face normal `(b - a) × (c - a)`, normalised.
    pub fn new(a: Vec3, b: Vec3, c: Vec3) -> Self {
        let ab = b - a;
        let ac = c - a;
        let bc = c - b;
        let normal = ab.cross(&ac).try_normalize(0.0).unwrap_or_else(Vec3::zeros);
        Self {
            a,
            b,
            c,
            normal,
            ab_normal: ab.cross(&normal),
            bc_normal: bc.cross(&normal),
            ac_normal: normal.cross(&ac),
        }
    }

    pub fn vertices(&self) -> [Vec3; 3] {
        [self.a, self.b, self.c]
    }

    pub fn normal(&self) -> Vec3 {
        self.normal
    }

    fn intersect(&self, s: &Segment) -> Option<Intersection> {
        let pq = s.direction();
        let d = pq.dot(&self.normal);
        if d == 0.0 {
            return None;
        }
        let t = (self.a - s.start).dot(&self.normal);
        if t * d < 0.0 || t.abs() > d.abs() {
            return None;
        }
        let r = s.start + pq * (t / d);
        if (self.a - r).dot(&self.ab_normal) < 0.0
            || (self.b - r).dot(&self.bc_normal) < 0.0
            || (self.c - r).dot(&self.ac_normal) < 0.0
        {
            return None;
        }
        Some(Intersection {
            point: r,
            normal: self.normal,
        })
    }

    fn same_vertices(&self, other: &Triangle) -> bool {
        let mut mine = self.vertices().map(|v| point_key(&v));
        let mut theirs = other.vertices().map(|v| point_key(&v));
        mine.sort_unstable();
        theirs.sort_unstable();
        mine == theirs
    }
}

/// Closed-form primitive in body space.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Triangle(Triangle),
    /// Flat disk, probed by `rank` rays from the centre to the rim.
    Circle {
        center: Vec3,
        normal: Vec3,
        radius: f64,
        rank: usize,
    },
    /// Cylinder wall without caps, probed by `rank` axial lines.
    OpenCylinder {
        center: Vec3,
        axis: Vec3,
        radius: f64,
        length: f64,
        rank: usize,
    },
    /// Sphere surface, probed by `rank × (rank / 2)` rays from the centre.
    Sphere {
        center: Vec3,
        radius: f64,
        rank: usize,
    },
}

impl Primitive {
    pub fn triangle(a: Vec3, b: Vec3, c: Vec3) -> Self {
        Primitive::Triangle(Triangle::new(a, b, c))
    }

    pub fn circle(center: Vec3, normal: Vec3, radius: f64, rank: usize) -> Self {
        Primitive::Circle {
            center,
            normal: normal.try_normalize(0.0).unwrap_or_else(Vec3::z),
            radius,
            rank,
        }
    }

    pub fn open_cylinder(center: Vec3, axis: Vec3, radius: f64, length: f64, rank: usize) -> Self {
        Primitive::OpenCylinder {
            center,
            axis: axis.try_normalize(0.0).unwrap_or_else(Vec3::z),
            radius,
            length,
            rank,
        }
    }

    pub fn sphere(center: Vec3, radius: f64, rank: usize) -> Self {
        Primitive::Sphere {
            center,
            radius,
            rank,
        }
    }

    /// Constant face normal, for primitives that have one.
    pub fn face_normal(&self) -> Option<Vec3> {
        match self {
            Primitive::Triangle(t) => Some(t.normal),
            Primitive::Circle { normal, .. } => Some(*normal),
            Primitive::OpenCylinder { .. } | Primitive::Sphere { .. } => None,
        }
    }

    /// Same primitive up to triangle vertex order.
    pub fn same_as(&self, other: &Primitive) -> bool {
        match (self, other) {
            (Primitive::Triangle(a), Primitive::Triangle(b)) => a.same_vertices(b),
            _ => self == other,
        }
    }

    /// First point where `segment` enters this primitive, if any.
    pub fn intersect_segment(&self, segment: &Segment) -> Option<Intersection> {
        match self {
            Primitive::Triangle(t) => t.intersect(segment),
            Primitive::Circle {
                center,
                normal,
                radius,
                ..
            } => {
                let ab = segment.direction();
                let denom = ab.dot(normal);
                if denom == 0.0 {
                    return None;
                }
                let ra = segment.start - center;
                let t = -ra.dot(normal) / denom;
                if !(0.0..=1.0).contains(&t) {
                    return None;
                }
                let p = ra + ab * t;
                if p.norm() > *radius {
                    return None;
                }
                Some(Intersection {
                    point: center + p,
                    normal: *normal,
                })
            }
            Primitive::OpenCylinder {
                center,
                axis,
                radius,
                length,
                ..
            } => {
                let ra = segment.start - center;
                let ab = segment.direction();
                let an = ra.dot(axis);
                let bn = ab.dot(axis);
                let a = ab.norm_squared() - bn * bn;
                let b = 2.0 * ra.dot(&ab) - 2.0 * an * bn;
                let c = ra.norm_squared() - radius * radius - an * an;
                let hit = |t: f64| {
                    let r = ra + ab * t;
                    (project_to_vector(&r, axis).norm() < length / 2.0).then_some(r)
                };
                let (_, r) = nearest_root(a, b, c, |t| (0.0..=1.0).contains(&t), hit)?;
                let normal = project_to_plane(&r, axis).try_normalize(0.0)?;
                Some(Intersection {
                    point: center + r,
                    normal,
                })
            }
            Primitive::Sphere { center, radius, .. } => {
                let ra = segment.start - center;
                let ab = segment.direction();
                let a = ab.norm_squared();
                let b = 2.0 * ra.dot(&ab);
                let c = ra.norm_squared() - radius * radius;
                let (_, r) = nearest_root(a, b, c, |t| t > 0.0 && t < 1.0, |t| Some(ra + ab * t))?;
                let normal = r.try_normalize(0.0)?;
                Some(Intersection {
                    point: center + r,
                    normal,
                })
            }
        }
    }

    /// Probe segments approximating the primitive's boundary.
    pub fn segments(&self) -> Vec<Segment> {
        match self {
            Primitive::Triangle(t) => vec![
                Segment::new(t.a, t.b),
                Segment::new(t.a, t.c),
                Segment::new(t.b, t.c),
            ],
            Primitive::Circle {
                center,
                normal,
                radius,
                rank,
            } => {
                let to_plane = rotation_between(&Vec3::z(), normal);
                (0..*rank)
                    .map(|i| {
                        let rim = to_plane * ring_point(*radius, i, *rank);
                        Segment::new(*center, center + rim)
                    })
                    .collect()
            }
            Primitive::OpenCylinder {
                center,
                axis,
                radius,
                length,
                rank,
            } => {
                let to_axis = rotation_between(&Vec3::z(), axis);
                let half = axis * (length / 2.0);
                (0..*rank)
                    .map(|i| {
                        let rim = center + to_axis * ring_point(*radius, i, *rank);
                        Segment::new(rim + half, rim - half)
                    })
                    .collect()
            }
            Primitive::Sphere {
                center,
                radius,
                rank,
            } => {
                let bands = rank / 2;
                let mut segments = Vec::with_capacity(rank * bands);
                for i in 0..*rank {
                    let theta = 2.0 * PI * i as f64 / *rank as f64;
                    for j in 0..bands {
                        // Bands are π / bands apart and one of them is always the equator
                        let phi =
                            FRAC_PI_2 + PI * (j as f64 - (bands / 2) as f64) / bands as f64;
                        let surface = Vec3::new(
                            radius * theta.cos() * phi.sin(),
                            radius * theta.sin() * phi.sin(),
                            radius * phi.cos(),
                        );
                        segments.push(Segment::new(*center, center + surface));
                    }
                }
                segments
            }
        }
    }
}

/// Point `i` of `n` evenly spaced around a circle of `radius` in the XY plane.
fn ring_point(radius: f64, i: usize, n: usize) -> Vec3 {
    let angle = 2.0 * PI * i as f64 / n as f64;
    Vec3::new(radius * angle.cos(), radius * angle.sin(), 0.0)
}

/// Solve `a t² + b t + c = 0` and return the smallest root accepted by
/// `in_range` for which `accept` yields a value.
fn nearest_root<T>(
    a: f64,
    b: f64,
    c: f64,
    in_range: impl Fn(f64) -> bool,
    accept: impl Fn(f64) -> Option<T>,
) -> Option<(f64, T)> {
    if a == 0.0 {
        return None;
    }
    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 || disc.is_nan() {
        return None;
    }
    let sq = disc.sqrt();
    let (t1, t2) = ((-b - sq) / (2.0 * a), (-b + sq) / (2.0 * a));
    let (near, far) = if t1 <= t2 { (t1, t2) } else { (t2, t1) };
    [near, far]
        .into_iter()
        .filter(|t| in_range(*t))
        .find_map(|t| accept(t).map(|v| (t, v)))
}
