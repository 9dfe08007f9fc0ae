//! Simulated bodies: dynamics, collision shape, broad-phase proxy and material.

use std::fmt;
use std::sync::Arc;

use log::error;
use nalgebra::Quaternion;

use crate::bounds::BoundVolume;
use crate::error::PhysicsError;
use crate::geometry::Intersection;
use crate::manifold::Manifold;
use crate::material::Material;
use crate::math::{rotation_between, unit_quaternion, Mat3, Vec3};
use crate::rigid_body::{Axis, RigidBody};
use crate::shape::Shape;

/// Index of a body inside a [`Universe`](crate::universe::Universe).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BodyId(pub usize);

impl BodyId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for BodyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Single permitted rotation axis and the moment of inertia about it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationAxis {
    pub axis: Vec3,
    pub inertia: f64,
}

/// Everything needed to create a [`RigidBody`], validated by [`build`](Self::build).
///
/// Rotation locks (fixed rotation or locked axes), a single rotation axis and a
/// manifold constraint each restrict motion in a different way; at most one of
/// the three may be requested.
#[derive(Debug, Clone, PartialEq)]
pub struct BodyConfig {
    pub mass: f64,
    /// Body-frame inertia tensor.
    pub inertia: Mat3,
    pub position: Vec3,
    /// Initial orientation; must be a unit quaternion.
    pub orientation: Quaternion<f64>,
    pub velocity: Vec3,
    /// Initial angular velocity in the body frame.
    pub angular_velocity: Vec3,
    pub fixed_position: bool,
    pub fixed_rotation: bool,
    pub locked_axes: Vec<Axis>,
    pub rotation_axis: Option<RotationAxis>,
    pub manifold: Option<Manifold>,
}

impl BodyConfig {
    /// Free body of `mass` at the origin with an identity inertia tensor.
    pub fn new(mass: f64) -> Self {
        Self {
            mass,
            inertia: Mat3::identity(),
            position: Vec3::zeros(),
            orientation: Quaternion::identity(),
            velocity: Vec3::zeros(),
            angular_velocity: Vec3::zeros(),
            fixed_position: false,
            fixed_rotation: false,
            locked_axes: Vec::new(),
            rotation_axis: None,
            manifold: None,
        }
    }

    pub fn with_inertia(mut self, inertia: Mat3) -> Self {
        self.inertia = inertia;
        self
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn with_orientation(mut self, orientation: Quaternion<f64>) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_angular_velocity(mut self, omega_body: Vec3) -> Self {
        self.angular_velocity = omega_body;
        self
    }

    pub fn with_fixed_position(mut self) -> Self {
        self.fixed_position = true;
        self
    }

    pub fn with_fixed_rotation(mut self) -> Self {
        self.fixed_rotation = true;
        self
    }

    /// Pin both position and rotation.
    pub fn fixed(self) -> Self {
        self.with_fixed_position().with_fixed_rotation()
    }

    pub fn with_locked_axes(mut self, axes: &[Axis]) -> Self {
        self.locked_axes.extend_from_slice(axes);
        self
    }

    pub fn with_rotation_axis(mut self, axis: Vec3, inertia: f64) -> Self {
        self.rotation_axis = Some(RotationAxis { axis, inertia });
        self
    }

    pub fn with_manifold(mut self, manifold: Manifold) -> Self {
        self.manifold = Some(manifold);
        self
    }

    /// Validate and create the rigid body.
    pub fn build(&self) -> Result<RigidBody, PhysicsError> {
        let rotation_locked = self.fixed_rotation || !self.locked_axes.is_empty();
        let restrictions = [
            rotation_locked,
            self.rotation_axis.is_some(),
            self.manifold.is_some(),
        ];
        if restrictions.iter().filter(|r| **r).count() > 1 {
            error!("body config combines rotation locks, a rotation axis and a manifold");
            return Err(PhysicsError::ConflictingConstraints);
        }

        let orientation = unit_quaternion(self.orientation)?;
        let mut body = RigidBody::new(self.mass, &self.inertia)?
            .with_position(self.position)
            .with_orientation(orientation)
            .with_velocity(self.velocity)
            .with_angular_velocity(self.angular_velocity);

        if self.fixed_position {
            body.fix_position();
        }
        if self.fixed_rotation {
            body.fix_rotation();
        }
        body.fix_axes(&self.locked_axes);
        if let Some(RotationAxis { axis, inertia }) = self.rotation_axis {
            body.fix_rotation_around(&axis, inertia)?;
        }
        if let Some(manifold) = &self.manifold {
            body.constrain_to(manifold.clone())?;
        }
        Ok(body)
    }
}

#[derive(Debug, Clone)]
pub struct Body {
    rigid: RigidBody,
    shape: Arc<Shape>,
    bounds: BoundVolume,
    material: Material,
}

impl Body {
    /// Body with the default material and an unbounded broad-phase proxy.
    pub fn new(rigid: RigidBody, shape: Arc<Shape>) -> Self {
        Self {
            rigid,
            shape,
            bounds: BoundVolume::Unbounded,
            material: Material::default(),
        }
    }

    pub fn from_config(config: &BodyConfig, shape: Arc<Shape>) -> Result<Self, PhysicsError> {
        Ok(Self::new(config.build()?, shape))
    }

    /// Builder: set the broad-phase proxy.
    pub fn with_bounds(mut self, mut bounds: BoundVolume) -> Self {
        bounds.update(&self.rigid.pose());
        self.bounds = bounds;
        self
    }

    /// Builder: set the surface material.
    pub fn with_material(mut self, material: Material) -> Self {
        self.material = material;
        self
    }

    /// Solid ball. The config's inertia is replaced by `⅖ m r²`.
    pub fn ball(radius: f64, rank: usize, config: BodyConfig) -> Result<Self, PhysicsError> {
        let i = 0.4 * config.mass * radius * radius;
        let config = config.with_inertia(Mat3::identity() * i);
        Ok(Self::from_config(&config, Arc::new(Shape::ball(radius, rank)))?
            .with_bounds(BoundVolume::sphere(radius)))
    }

    /// Solid box of full dimensions `w × h × d` along body X, Y, Z.
    pub fn cuboid(w: f64, h: f64, d: f64, config: BodyConfig) -> Result<Self, PhysicsError> {
        let k = config.mass / 12.0;
        let inertia = Mat3::from_diagonal(&Vec3::new(
            k * (h * h + d * d),
            k * (w * w + d * d),
            k * (w * w + h * h),
        ));
        let config = config.with_inertia(inertia);
        let half_diagonal = (w * w + h * h + d * d).sqrt() / 2.0;
        Ok(
            Self::from_config(&config, Arc::new(Shape::cuboid(w / 2.0, h / 2.0, d / 2.0)))?
                .with_bounds(BoundVolume::sphere(half_diagonal)),
        )
    }

    /// Solid capped cylinder along body Z.
    pub fn cylinder(
        radius: f64,
        length: f64,
        rank: usize,
        config: BodyConfig,
    ) -> Result<Self, PhysicsError> {
        let m = config.mass;
        let side = m * (3.0 * radius * radius + length * length) / 12.0;
        let inertia = Mat3::from_diagonal(&Vec3::new(side, side, 0.5 * m * radius * radius));
        let config = config.with_inertia(inertia);
        let bound = (radius * radius + length * length / 4.0).sqrt();
        Ok(
            Self::from_config(&config, Arc::new(Shape::cylinder(radius, length, rank)))?
                .with_bounds(BoundVolume::sphere(bound)),
        )
    }

    /// Fixed `width × height` rectangle centred on `center`, facing `facing`.
    pub fn wall(center: Vec3, facing: Vec3, width: f64, height: f64) -> Result<Self, PhysicsError> {
        let orientation = rotation_between(&Vec3::z(), &facing);
        let config = BodyConfig::new(1.0)
            .with_position(center)
            .with_orientation(orientation.into_inner())
            .fixed();
        let radius = (width * width + height * height).sqrt() / 2.0;
        Ok(Self::from_config(&config, Arc::new(Shape::wall(width, height)))?
            .with_bounds(BoundVolume::disk(Vec3::z(), radius)))
    }

    /// Five inward-facing walls (floor and four sides, no ceiling) around
    /// `center`, sized `length × width × height` along X, Y, Z.
    pub fn room(center: Vec3, length: f64, width: f64, height: f64) -> Result<Vec<Self>, PhysicsError> {
        // Shrink each wall slightly so neighbours do not touch along shared edges
        const GAP: f64 = 1e-9;
        let (l, w, h) = (length - GAP, width - GAP, height - GAP);
        Ok(vec![
            Self::wall(center + Vec3::new(0.0, 0.0, -height / 2.0), Vec3::z(), l, w)?,
            Self::wall(center + Vec3::new(length / 2.0, 0.0, 0.0), -Vec3::x(), h, w)?,
            Self::wall(center + Vec3::new(0.0, width / 2.0, 0.0), -Vec3::y(), l, h)?,
            Self::wall(center + Vec3::new(0.0, -width / 2.0, 0.0), Vec3::y(), l, h)?,
            Self::wall(center + Vec3::new(-length / 2.0, 0.0, 0.0), Vec3::x(), h, w)?,
        ])
    }

    pub fn rigid(&self) -> &RigidBody {
        &self.rigid
    }

    pub fn rigid_mut(&mut self) -> &mut RigidBody {
        &mut self.rigid
    }

    pub fn shape(&self) -> &Arc<Shape> {
        &self.shape
    }

    pub fn bounds(&self) -> &BoundVolume {
        &self.bounds
    }

    pub fn material(&self) -> Material {
        self.material
    }

    pub fn position(&self) -> Vec3 {
        self.rigid.position()
    }

    /// Integrate the rigid body and move the broad-phase proxy with it.
    pub fn update(&mut self, dt: f64) {
        self.rigid.update(dt);
        self.refresh_bounds();
    }

    pub fn refresh_bounds(&mut self) {
        self.bounds.update(&self.rigid.pose());
    }

    /// Narrow-phase contacts against `other`, normals pointing from `self` to `other`.
    pub fn detect(&self, other: &Body) -> Vec<Intersection> {
        self.shape
            .detect(&other.shape, &self.rigid.pose(), &other.rigid.pose())
    }
}
