//! Rigid-body state and integration.
//!
//! A [`RigidBody`] keeps position, orientation and the two momenta as its
//! primary state. Velocity, angular velocity, the rotation matrix and the
//! world-space inverse inertia are derived from them after every change.
//!
//! Fixing degrees of freedom is expressed through the inverse quantities:
//! an inverse mass of zero pins the position, a zero body-space inverse
//! inertia pins the rotation, and zeroed rows lock single rotation axes.

use log::{debug, error};
use nalgebra::{Quaternion, Rotation3, UnitQuaternion};

use crate::error::PhysicsError;
use crate::geometry::{Pose, Segment};
use crate::manifold::Manifold;
use crate::math::{checked_inverse, rotation_between, similarity_rotation, Mat3, Quat, Vec3};

/// Body-frame rotation axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    #[inline]
    fn row(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

/// Timed force/torque pair, measured in simulation time.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Thrust {
    force: Vec3,
    torque: Vec3,
    start: f64,
    duration: f64,
}

#[derive(Debug, Clone)]
pub struct RigidBody {
    // -- Constant properties (changed only by the fix_* locks) --
    inv_mass: f64,
    inv_inertia_body: Mat3,

    // -- State --
    position: Vec3,
    orientation: Quat,
    momentum: Vec3,
    angular_momentum: Vec3,

    // -- Derived from state --
    rotation: Rotation3<f64>,
    inv_inertia: Mat3,
    velocity: Vec3,
    angular_velocity: Vec3,

    // -- Inputs --
    force: Vec3,
    torque: Vec3,
    thrust: Option<Thrust>,
    /// Force applied for the next update only.
    field_force: Vec3,
    clock: f64,

    constraint: Option<Manifold>,
}

impl RigidBody {
    /// Body at rest at the origin with the given mass and body-frame inertia tensor.
    pub fn new(mass: f64, inertia: &Mat3) -> Result<Self, PhysicsError> {
        if !(mass > 0.0 && mass.is_finite()) {
            error!("rejecting rigid body with mass {}", mass);
            return Err(PhysicsError::InvalidParameter {
                name: "mass",
                reason: "must be positive and finite",
            });
        }
        let inv_inertia_body = checked_inverse(inertia)?;
        let mut body = Self {
            inv_mass: 1.0 / mass,
            inv_inertia_body,
            position: Vec3::zeros(),
            orientation: Quat::identity(),
            momentum: Vec3::zeros(),
            angular_momentum: Vec3::zeros(),
            rotation: Rotation3::identity(),
            inv_inertia: inv_inertia_body,
            velocity: Vec3::zeros(),
            angular_velocity: Vec3::zeros(),
            force: Vec3::zeros(),
            torque: Vec3::zeros(),
            thrust: None,
            field_force: Vec3::zeros(),
            clock: 0.0,
            constraint: None,
        };
        body.refresh();
        Ok(body)
    }

    /// Builder: set initial position.
    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self.refresh();
        self
    }

    /// Builder: set initial orientation. Angular velocity keeps its body-frame value.
    pub fn with_orientation(mut self, orientation: Quat) -> Self {
        let body_momentum = self.orientation.inverse_transform_vector(&self.angular_momentum);
        self.orientation = orientation;
        self.angular_momentum = orientation * body_momentum;
        self.refresh();
        self
    }

    /// Builder: set initial linear velocity.
    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        if self.inv_mass > 0.0 {
            self.momentum = velocity / self.inv_mass;
        }
        self.refresh();
        self
    }

    /// Builder: set initial angular velocity, given in the body frame.
    ///
    /// Has no effect on a body whose rotation is already fixed.
    pub fn with_angular_velocity(mut self, omega_body: Vec3) -> Self {
        if let Ok(inertia_body) = checked_inverse(&self.inv_inertia_body) {
            self.angular_momentum = self.orientation * (inertia_body * omega_body);
        }
        self.refresh();
        self
    }

    // -- Degree-of-freedom locks --

    /// Make the body immovable: it still takes part in contacts but never
    /// responds to impulses, forces or fields.
    pub fn fix(&mut self) {
        self.fix_position();
        self.fix_rotation();
    }

    /// Infinite mass: `m⁻¹ = 0` and the momentum is dropped.
    pub fn fix_position(&mut self) {
        self.inv_mass = 0.0;
        self.momentum = Vec3::zeros();
        self.refresh();
    }

    /// Infinite inertia: `I⁻¹ = 0` and the angular momentum is dropped.
    pub fn fix_rotation(&mut self) {
        self.inv_inertia_body = Mat3::zeros();
        self.angular_momentum = Vec3::zeros();
        self.refresh();
    }

    /// Lock rotation about the given body-frame axes by zeroing their rows
    /// of the body inverse inertia.
    pub fn fix_axes(&mut self, axes: &[Axis]) {
        for axis in axes {
            self.inv_inertia_body.row_mut(axis.row()).fill(0.0);
        }
        self.refresh();
    }

    /// Allow rotation only about `axis` (body frame), with scalar moment of inertia `inertia`.
    ///
    /// Whatever the angular momentum, the resulting angular velocity is parallel
    /// to the axis.
    pub fn fix_rotation_around(&mut self, axis: &Vec3, inertia: f64) -> Result<(), PhysicsError> {
        if !(inertia > 0.0 && inertia.is_finite()) {
            return Err(PhysicsError::InvalidParameter {
                name: "inertia",
                reason: "must be positive and finite",
            });
        }
        if axis.norm_squared() == 0.0 {
            return Err(PhysicsError::InvalidParameter {
                name: "axis",
                reason: "must be non-zero",
            });
        }
        let about_z = Mat3::from_diagonal(&Vec3::new(0.0, 0.0, 1.0 / inertia));
        let to_axis = rotation_between(&Vec3::z(), axis).to_rotation_matrix();
        self.inv_inertia_body = similarity_rotation(&about_z, &to_axis);
        self.refresh();
        Ok(())
    }

    /// Confine the body to `manifold`. The body must already lie on it.
    pub fn constrain_to(&mut self, manifold: Manifold) -> Result<(), PhysicsError> {
        let distance = manifold.distance(&self.position);
        if distance > crate::math::TOLERANCE {
            error!("body is {} away from its constraint manifold", distance);
            return Err(PhysicsError::OffManifold { distance });
        }
        self.constraint = Some(manifold);
        self.refresh();
        Ok(())
    }

    /// True when the mass is infinite.
    pub fn is_position_fixed(&self) -> bool {
        self.inv_mass == 0.0
    }

    /// True when the inverse inertia is zero about every axis.
    pub fn is_rotation_fixed(&self) -> bool {
        self.inv_inertia_body == Mat3::zeros()
    }

    /// True when both position and rotation are fixed.
    pub fn is_fixed(&self) -> bool {
        self.is_position_fixed() && self.is_rotation_fixed()
    }

    /// True when the body-frame inverse inertia row for `axis` is all zeros.
    pub fn is_axis_fixed(&self, axis: Axis) -> bool {
        self.inv_inertia_body.row(axis.row()).iter().all(|e| *e == 0.0)
    }

    /// Manifold the body is confined to, if any.
    pub fn constraint(&self) -> Option<&Manifold> {
        self.constraint.as_ref()
    }

    // -- Inputs --

    /// Add a permanent force and torque, applied on every update from now on.
    pub fn add_inputs(&mut self, force: Vec3, torque: Vec3) {
        self.force += force;
        self.torque += torque;
    }

    /// Add a permanent force `m · accel`. Ignored for position-fixed bodies.
    pub fn add_acceleration(&mut self, accel: Vec3) {
        if !self.is_position_fixed() {
            self.force += accel * self.mass();
        }
    }

    /// Apply a force and torque for `duration` seconds of simulation time.
    ///
    /// While an earlier thrust is still active the new one is dropped and
    /// `false` is returned.
    pub fn thrust(&mut self, force: Vec3, torque: Vec3, duration: f64) -> bool {
        if self.is_thrusting() {
            debug!("thrust dropped at t = {}: previous thrust still active", self.clock);
            return false;
        }
        self.thrust = Some(Thrust {
            force,
            torque,
            start: self.clock,
            duration,
        });
        true
    }

    /// True while a thrust's duration has not yet run out.
    pub fn is_thrusting(&self) -> bool {
        self.active_thrust().is_some()
    }

    fn active_thrust(&self) -> Option<Thrust> {
        self.thrust.filter(|t| self.clock - t.start < t.duration)
    }

    /// Add a force that acts during the next update only.
    pub fn apply_field_force(&mut self, force: Vec3) {
        self.field_force += force;
    }

    /// Instantaneous impulse `impulse` at offset `r` from the centre of mass.
    pub fn enact_impulse(&mut self, impulse: &Vec3, r: &Vec3) {
        self.momentum += impulse;
        self.angular_momentum += r.cross(impulse);
        self.refresh();
    }

    // -- Integration --

    /// Advance by `dt` seconds.
    ///
    /// Position and orientation move with the velocities from before this
    /// tick's forces, then the momenta take the forces, then every derived
    /// quantity is recomputed. Fully fixed bodies only advance their clock.
    pub fn update(&mut self, dt: f64) {
        if !self.is_fixed() {
            let (force, torque) = self.net_inputs();

            self.position += self.velocity * dt;
            if let Some(manifold) = &self.constraint {
                self.position = manifold.closest_point(&self.position);
            }

            // q' = q + 0.5 * dt * ω * q
            let w = self.angular_velocity;
            let omega_q = Quaternion::new(0.0, w.x, w.y, w.z);
            let q = self.orientation.into_inner();
            self.orientation = UnitQuaternion::new_normalize(q + omega_q * q * (0.5 * dt));

            self.momentum += force * dt;
            self.angular_momentum += torque * dt;
        }
        self.field_force = Vec3::zeros();
        self.clock += dt;
        self.refresh();
    }

    fn net_inputs(&self) -> (Vec3, Vec3) {
        let mut force = self.force + self.field_force;
        let mut torque = self.torque;
        if let Some(thrust) = self.active_thrust() {
            force += thrust.force;
            torque += thrust.torque;
        }
        (force, torque)
    }

    fn refresh(&mut self) {
        self.velocity = self.momentum * self.inv_mass;
        if let Some(manifold) = &self.constraint {
            self.velocity = manifold.project_velocity(&self.position, &self.velocity);
        }
        self.rotation = self.orientation.to_rotation_matrix();
        self.inv_inertia = similarity_rotation(&self.inv_inertia_body, &self.rotation);
        self.angular_velocity = self.inv_inertia * self.angular_momentum;
    }

    // -- Read surface --

    /// World-space centre of mass.
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Body-to-world rotation, kept at unit norm.
    pub fn orientation(&self) -> Quat {
        self.orientation
    }

    /// Matrix form of [`orientation`](Self::orientation), refreshed after every change.
    pub fn rotation(&self) -> &Rotation3<f64> {
        &self.rotation
    }

    pub fn pose(&self) -> Pose {
        Pose::new(self.position, self.orientation)
    }

    /// `v = p / m`, projected onto the constraint manifold when there is one.
    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    /// `ω = I⁻¹ L` in world space.
    pub fn angular_velocity(&self) -> Vec3 {
        self.angular_velocity
    }

    pub fn momentum(&self) -> Vec3 {
        self.momentum
    }

    pub fn angular_momentum(&self) -> Vec3 {
        self.angular_momentum
    }

    /// Zero for position-fixed bodies.
    pub fn inv_mass(&self) -> f64 {
        self.inv_mass
    }

    /// Infinite for position-fixed bodies.
    pub fn mass(&self) -> f64 {
        1.0 / self.inv_mass
    }

    /// World-space inverse inertia `R · I⁻¹_body · Rᵀ`.
    pub fn inv_inertia(&self) -> &Mat3 {
        &self.inv_inertia
    }

    /// Simulation time this body has been stepped through.
    pub fn clock(&self) -> f64 {
        self.clock
    }

    /// Velocity of the material point at offset `r` from the centre of mass.
    #[inline]
    pub fn surface_velocity(&self, r: &Vec3) -> Vec3 {
        self.velocity + self.angular_velocity.cross(r)
    }

    /// `½ m v² + ½ ω · L`, counting only the free degrees of freedom.
    pub fn kinetic_energy(&self) -> f64 {
        let linear = if self.is_position_fixed() {
            0.0
        } else {
            0.5 * self.mass() * self.velocity.norm_squared()
        };
        linear + 0.5 * self.angular_velocity.dot(&self.angular_momentum)
    }

    /// `R p + x`: body-frame point to world frame.
    pub fn to_world_space(&self, p: &Vec3) -> Vec3 {
        self.rotation * p + self.position
    }

    /// `Rᵀ (p - x)`: world-frame point to body frame.
    pub fn to_body_space(&self, p: &Vec3) -> Vec3 {
        self.rotation.inverse_transform_vector(&(p - self.position))
    }

    pub fn segment_to_world(&self, s: &Segment) -> Segment {
        s.map(|p| self.to_world_space(p))
    }

    pub fn segment_to_body(&self, s: &Segment) -> Segment {
        s.map(|p| self.to_body_space(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::f64::consts::FRAC_PI_2;

    const EPSILON: f64 = 1e-9;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < EPSILON
    }

    fn approx_vec_eq(a: &Vec3, b: &Vec3) -> bool {
        approx_eq(a.x, b.x) && approx_eq(a.y, b.y) && approx_eq(a.z, b.z)
    }

    fn unit_body() -> RigidBody {
        RigidBody::new(2.0, &Mat3::identity()).unwrap()
    }

    #[test]
    fn test_body_creation() {
        let body = unit_body().with_velocity(Vec3::new(1.0, 0.0, 0.0));
        assert!(approx_eq(body.inv_mass(), 0.5));
        assert!(approx_vec_eq(&body.momentum(), &Vec3::new(2.0, 0.0, 0.0)));
        assert!(approx_vec_eq(&body.velocity(), &Vec3::new(1.0, 0.0, 0.0)));
        assert!(!body.is_fixed());
    }

    #[test]
    fn test_invalid_mass_rejected() {
        assert!(RigidBody::new(0.0, &Mat3::identity()).is_err());
        assert!(RigidBody::new(-1.0, &Mat3::identity()).is_err());
        assert!(RigidBody::new(f64::INFINITY, &Mat3::identity()).is_err());
    }

    #[test]
    fn test_singular_inertia_rejected() {
        let flat = Mat3::from_diagonal(&Vec3::new(1.0, 1.0, 0.0));
        assert!(matches!(
            RigidBody::new(1.0, &flat),
            Err(PhysicsError::SingularMatrix { .. })
        ));
    }

    #[test]
    fn test_angular_velocity_in_body_frame() {
        let turned = Quat::from_axis_angle(&Vec3::z_axis(), FRAC_PI_2);
        let body = unit_body()
            .with_orientation(turned)
            .with_angular_velocity(Vec3::new(1.0, 0.0, 0.0));
        // Body X is world Y after a quarter turn about Z
        assert!(approx_vec_eq(&body.angular_velocity(), &Vec3::new(0.0, 1.0, 0.0)));
        // Reorienting keeps the body-frame spin
        let body = unit_body()
            .with_angular_velocity(Vec3::new(1.0, 0.0, 0.0))
            .with_orientation(turned);
        assert!(approx_vec_eq(&body.angular_velocity(), &Vec3::new(0.0, 1.0, 0.0)));
    }

    #[test]
    fn test_free_fall_recurrence() {
        let mut body = unit_body().with_velocity(Vec3::new(0.0, 0.0, -1.0));
        body.add_acceleration(Vec3::new(0.0, 0.0, -10.0));
        let dt = 0.1;
        for _ in 0..5 {
            let x0 = body.position();
            let v0 = body.velocity();
            let p0 = body.momentum();
            body.update(dt);
            assert!(approx_vec_eq(&body.position(), &(x0 + v0 * dt)));
            assert!(approx_vec_eq(&body.momentum(), &(p0 + Vec3::new(0.0, 0.0, -20.0) * dt)));
        }
    }

    #[test]
    fn test_fixed_body_never_moves() {
        let mut body = unit_body()
            .with_position(Vec3::new(1.0, 2.0, 3.0))
            .with_velocity(Vec3::new(5.0, 0.0, 0.0))
            .with_angular_velocity(Vec3::new(0.0, 1.0, 0.0));
        body.fix();
        assert!(body.is_fixed());
        body.add_inputs(Vec3::new(10.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 10.0));
        body.enact_impulse(&Vec3::new(0.0, 3.0, 0.0), &Vec3::new(1.0, 0.0, 0.0));
        for _ in 0..10 {
            body.update(0.1);
        }
        assert_eq!(body.position(), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(body.orientation(), Quat::identity());
        assert_eq!(body.velocity(), Vec3::zeros());
        assert_eq!(body.angular_velocity(), Vec3::zeros());
    }

    #[test]
    fn test_orientation_stays_unit() {
        let mut body = unit_body().with_angular_velocity(Vec3::new(3.0, -2.0, 5.0));
        for _ in 0..1000 {
            body.update(0.01);
            assert!((body.orientation().into_inner().norm() - 1.0).abs() < 1e-10);
        }
    }

    #[test]
    fn test_impulse_changes_both_momenta() {
        let mut body = unit_body();
        body.enact_impulse(&Vec3::new(0.0, 2.0, 0.0), &Vec3::new(1.0, 0.0, 0.0));
        assert!(approx_vec_eq(&body.velocity(), &Vec3::new(0.0, 1.0, 0.0)));
        assert!(approx_vec_eq(&body.angular_momentum(), &Vec3::new(0.0, 0.0, 2.0)));
        assert!(approx_vec_eq(&body.angular_velocity(), &Vec3::new(0.0, 0.0, 2.0)));
    }

    #[test]
    fn test_thrust_rate_limited_in_sim_time() {
        let mut body = unit_body();
        let dt = 0.1;
        assert!(body.thrust(Vec3::new(1.0, 0.0, 0.0), Vec3::zeros(), 0.25));
        assert!(!body.thrust(Vec3::new(100.0, 0.0, 0.0), Vec3::zeros(), 1.0));
        // Active for the ticks starting at t = 0, 0.1, 0.2
        for _ in 0..5 {
            body.update(dt);
        }
        assert!(approx_vec_eq(&body.momentum(), &Vec3::new(0.3, 0.0, 0.0)));
        assert!(!body.is_thrusting());
        assert!(body.thrust(Vec3::new(0.0, 1.0, 0.0), Vec3::zeros(), 0.05));
        body.update(dt);
        body.update(dt);
        assert!(approx_vec_eq(&body.momentum(), &Vec3::new(0.3, 0.1, 0.0)));
    }

    #[test]
    fn test_field_force_lasts_one_tick() {
        let mut body = unit_body();
        body.apply_field_force(Vec3::new(0.0, 0.0, 4.0));
        body.update(0.5);
        body.update(0.5);
        assert!(approx_vec_eq(&body.momentum(), &Vec3::new(0.0, 0.0, 2.0)));
    }

    #[test]
    fn test_fix_axes_blocks_rotation_about_axis() {
        let mut body = unit_body();
        body.fix_axes(&[Axis::X]);
        assert!(body.is_axis_fixed(Axis::X));
        assert!(!body.is_axis_fixed(Axis::Y));
        body.enact_impulse(&Vec3::new(0.0, 1.0, 1.0), &Vec3::new(1.0, 1.0, 0.0));
        assert!(approx_eq(body.angular_velocity().x, 0.0));
        assert!(body.angular_velocity().norm() > 0.0);
    }

    #[test]
    fn test_fix_rotation_around_axis() {
        let mut body = unit_body();
        let axis = Vec3::new(1.0, 1.0, 0.0).normalize();
        body.fix_rotation_around(&axis, 2.0).unwrap();
        body.enact_impulse(&Vec3::new(0.3, -1.0, 2.0), &Vec3::new(0.5, 0.2, -1.0));
        let w = body.angular_velocity();
        assert!(w.norm() > 0.0);
        assert!(approx_eq(w.cross(&axis).norm(), 0.0));
        assert!(body.fix_rotation_around(&Vec3::zeros(), 1.0).is_err());
    }

    #[test]
    fn test_constraint_must_start_on_manifold() {
        let mut body = unit_body().with_position(Vec3::new(0.0, 0.0, 1.0));
        let floor = Manifold::Plane {
            point: Vec3::zeros(),
            normal: Vec3::z(),
        };
        assert!(matches!(
            body.constrain_to(floor),
            Err(PhysicsError::OffManifold { .. })
        ));
    }

    #[test]
    fn test_line_constraint_projects_motion() {
        let mut body = unit_body().with_velocity(Vec3::new(1.0, 1.0, 1.0));
        body.constrain_to(Manifold::Line {
            point: Vec3::zeros(),
            direction: Vec3::x(),
        })
        .unwrap();
        assert!(approx_vec_eq(&body.velocity(), &Vec3::new(1.0, 0.0, 0.0)));
        body.add_acceleration(Vec3::new(0.0, 0.0, -10.0));
        for _ in 0..10 {
            body.update(0.1);
        }
        assert!(approx_vec_eq(&body.position(), &Vec3::new(1.0, 0.0, 0.0)));
    }

    #[test]
    fn test_kinetic_energy() {
        let body = unit_body()
            .with_velocity(Vec3::new(3.0, 0.0, 0.0))
            .with_angular_velocity(Vec3::new(0.0, 0.0, 2.0));
        // ½·2·9 + ½·2·2 (unit inertia)
        assert!(approx_eq(body.kinetic_energy(), 11.0));
    }

    #[test]
    fn test_space_transforms_round_trip() {
        let body = unit_body()
            .with_position(Vec3::new(1.0, -2.0, 0.5))
            .with_orientation(Quat::from_euler_angles(0.2, 0.4, -0.9));
        let p = Vec3::new(0.3, 0.7, -1.1);
        assert!(approx_vec_eq(&body.to_body_space(&body.to_world_space(&p)), &p));
        let s = Segment::new(p, Vec3::zeros());
        let back = body.segment_to_body(&body.segment_to_world(&s));
        assert!(approx_vec_eq(&back.start, &s.start));
        assert!(approx_vec_eq(&body.pose().to_world(&p), &body.to_world_space(&p)));
    }
}
