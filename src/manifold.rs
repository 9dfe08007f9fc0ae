//! Position constraints: a body confined to a line, a plane, or a level set
//! of a scalar potential.

use crate::field::Potential;
use crate::math::{project_to_plane, project_to_vector, Vec3, TOLERANCE};

/// Newton steps allowed when pulling a point onto a level set.
const MAX_LEVEL_SET_STEPS: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub enum Manifold {
    /// Line through `point` with direction `direction`.
    Line { point: Vec3, direction: Vec3 },
    /// Plane through `point` with normal `normal`.
    Plane { point: Vec3, normal: Vec3 },
    /// Surface `V(p) = level`.
    LevelSet { potential: Potential, level: f64 },
}

impl Manifold {
    /// Point on the manifold reached from `p`.
    ///
    /// Lines and planes use orthogonal projection. Level sets walk along the
    /// gradient with Newton steps until the residual drops below tolerance, the
    /// gradient vanishes, or the step budget runs out.
    pub fn closest_point(&self, p: &Vec3) -> Vec3 {
        match self {
            Manifold::Line { point, direction } => point + project_to_vector(&(p - point), direction),
            Manifold::Plane { point, normal } => point + project_to_plane(&(p - point), normal),
            Manifold::LevelSet { potential, level } => {
                let mut q = *p;
                for _ in 0..MAX_LEVEL_SET_STEPS {
                    let residual = potential.value(&q) - level;
                    if residual.abs() <= TOLERANCE {
                        break;
                    }
                    let g = potential.gradient(&q);
                    let g2 = g.norm_squared();
                    if g2 == 0.0 || !residual.is_finite() {
                        break;
                    }
                    q -= g * (residual / g2);
                }
                q
            }
        }
    }

    /// Distance from `p` to [`closest_point`](Self::closest_point).
    pub fn distance(&self, p: &Vec3) -> f64 {
        (self.closest_point(p) - p).norm()
    }

    pub fn contains(&self, p: &Vec3) -> bool {
        self.distance(p) <= TOLERANCE
    }

    /// Restrict a velocity at `p` to the manifold's tangent space.
    pub fn project_velocity(&self, p: &Vec3, v: &Vec3) -> Vec3 {
        match self {
            Manifold::Line { direction, .. } => project_to_vector(v, direction),
            Manifold::Plane { normal, .. } => project_to_plane(v, normal),
            Manifold::LevelSet { potential, .. } => project_to_plane(v, &potential.gradient(p)),
        }
    }

    /// Unit normal at `p`, if the manifold has a single one there.
    ///
    /// Lines have a whole normal plane, so they return `None`.
    pub fn normal_at(&self, p: &Vec3) -> Option<Vec3> {
        match self {
            Manifold::Line { .. } => None,
            Manifold::Plane { normal, .. } => normal.try_normalize(0.0),
            Manifold::LevelSet { potential, .. } => potential.gradient(p).try_normalize(0.0),
        }
    }
}
