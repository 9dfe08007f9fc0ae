//! Contact classification and impulse resolution.
//!
//! A contact is resolved with one combined impulse per pass. The normal part
//! uses restitution. The tangential part is Coulomb-style friction, clamped so
//! it can at most stop the sliding.

use log::{debug, error, trace, warn};

use crate::body::{Body, BodyId};
use crate::config::{ResolutionMode, SimConfig};
use crate::error::PhysicsError;
use crate::geometry::Intersection;
use crate::material::Material;
use crate::math::{Mat3, Vec3};
use crate::rigid_body::RigidBody;

/// How the two bodies move relative to each other along the contact normal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactKind {
    /// Approaching faster than the resting threshold; needs an impulse.
    Colliding,
    /// Within the resting band; left alone.
    Resting,
    /// Separating; left alone.
    Receding,
}

/// One point of contact between body `a` and body `b`.
#[derive(Debug, Clone, PartialEq)]
pub struct Contact {
    pub a: BodyId,
    pub b: BodyId,
    pub material_a: Material,
    pub material_b: Material,
    /// World-space contact point.
    pub point: Vec3,
    /// Unit normal pointing from `a` toward `b`.
    pub normal: Vec3,
    /// Offset of the contact point from `a`'s centre of mass.
    pub ra: Vec3,
    /// Offset of the contact point from `b`'s centre of mass.
    pub rb: Vec3,
}

impl Contact {
    /// Contact at `hit` between body `a` and body `b`, with the lever arms
    /// taken from their current centres of mass.
    pub fn new(a: BodyId, body_a: &Body, b: BodyId, body_b: &Body, hit: &Intersection) -> Self {
        Self {
            a,
            b,
            material_a: body_a.material(),
            material_b: body_b.material(),
            point: hit.point,
            normal: hit.normal,
            ra: hit.point - body_a.position(),
            rb: hit.point - body_b.position(),
        }
    }

    /// Relative velocity of the contact point on `a` with respect to `b`.
    pub fn relative_velocity(&self, a: &RigidBody, b: &RigidBody) -> Vec3 {
        a.surface_velocity(&self.ra) - b.surface_velocity(&self.rb)
    }

    /// Classify by `v_rel · -n` against `config.resting_threshold`.
    pub fn classify(&self, a: &RigidBody, b: &RigidBody, config: &SimConfig) -> ContactKind {
        let v_rel_perp = self.relative_velocity(a, b).dot(&-self.normal);
        if v_rel_perp > config.resting_threshold {
            ContactKind::Receding
        } else if v_rel_perp > -config.resting_threshold {
            ContactKind::Resting
        } else {
            ContactKind::Colliding
        }
    }

    /// Apply the normal and friction impulse for this contact.
    ///
    /// Returns `Ok(false)` when neither body can respond along the normal.
    pub fn resolve(
        &self,
        a: &mut RigidBody,
        b: &mut RigidBody,
        config: &SimConfig,
    ) -> Result<bool, PhysicsError> {
        let n = self.normal;
        let v_rel = self.relative_velocity(a, b);
        let v_rel_perp = v_rel.dot(&-n);
        let avg = self.material_a.average(&self.material_b);

        let denominator = a.inv_mass()
            + b.inv_mass()
            + angular_term(a.inv_inertia(), &self.ra, &n)
            + angular_term(b.inv_inertia(), &self.rb, &n);
        if denominator <= 0.0 {
            debug!(
                "skipping contact {} / {}: no response along normal (denominator {})",
                self.a, self.b, denominator
            );
            return Ok(false);
        }
        let j = (1.0 + config.restitution_scale * avg.restitution) * v_rel_perp.abs() / denominator;
        if !j.is_finite() {
            error!("normal impulse is {} at contact {} / {}", j, self.a, self.b);
            return Err(PhysicsError::NonFiniteImpulse { magnitude: j });
        }

        let mut impulse = -n * j;

        let sliding = v_rel.cross(&n);
        if sliding.norm() != 0.0 {
            if let Some(tangent) = n.cross(&sliding).try_normalize(0.0) {
                let v_rel_par = v_rel.dot(&tangent);
                let friction = self.friction_magnitude(j, v_rel_par, config, &avg);
                let tangential = a.inv_mass()
                    + b.inv_mass()
                    + angular_term(a.inv_inertia(), &self.ra, &tangent)
                    + angular_term(b.inv_inertia(), &self.rb, &tangent);
                let max_friction = v_rel_par / tangential;

                if friction.is_nan() || max_friction.is_nan() {
                    error!("friction is NaN at contact {} / {}", self.a, self.b);
                    return Err(PhysicsError::FrictionNaN);
                }
                let friction = friction.min(max_friction);
                if friction < 0.0 {
                    error!("friction is negative ({}) at contact {} / {}", friction, self.a, self.b);
                    return Err(PhysicsError::NegativeFriction {
                        magnitude: friction,
                    });
                }
                impulse -= tangent * friction;
            }
        }

        trace!(
            "contact {} / {}: normal impulse {}, total {:?}",
            self.a,
            self.b,
            j,
            impulse
        );
        a.enact_impulse(&impulse, &self.ra);
        b.enact_impulse(&-impulse, &self.rb);
        Ok(true)
    }

    fn friction_magnitude(&self, j: f64, v_rel_par: f64, config: &SimConfig, avg: &Material) -> f64 {
        if v_rel_par.abs() < config.static_friction_tolerance * avg.static_friction {
            config.static_friction_scale * avg.static_friction * j
        } else {
            config.dynamic_friction_scale * avg.dynamic_friction * j
        }
    }
}

/// `dir · ((I⁻¹ (r × dir)) × r)`: rotational share of the effective inverse mass along `dir`.
#[inline]
fn angular_term(inv_inertia: &Mat3, r: &Vec3, dir: &Vec3) -> f64 {
    (inv_inertia * r.cross(dir)).cross(r).dot(dir)
}

/// Mutable references to two distinct bodies.
pub(crate) fn pair_mut(bodies: &mut [Body], a: usize, b: usize) -> (&mut Body, &mut Body) {
    assert_ne!(a, b, "a body cannot be in contact with itself");
    if a < b {
        let (lo, hi) = bodies.split_at_mut(b);
        (&mut lo[a], &mut hi[0])
    } else {
        let (lo, hi) = bodies.split_at_mut(a);
        (&mut hi[0], &mut lo[b])
    }
}

/// Resolve `contacts` in order according to `config.resolution`.
///
/// Returns the number of impulses applied.
pub fn resolve_contacts(
    contacts: &[Contact],
    bodies: &mut [Body],
    config: &SimConfig,
) -> Result<usize, PhysicsError> {
    match config.resolution {
        ResolutionMode::SinglePass => resolve_pass(contacts, bodies, config),
        ResolutionMode::Iterative { max_iterations } => {
            let mut applied = 0;
            for _ in 0..max_iterations {
                let resolved = resolve_pass(contacts, bodies, config)?;
                if resolved == 0 {
                    return Ok(applied);
                }
                applied += resolved;
            }
            warn!(
                "gave up on {} contacts after {} resolution passes",
                contacts.len(),
                max_iterations
            );
            Ok(applied)
        }
    }
}

fn resolve_pass(contacts: &[Contact], bodies: &mut [Body], config: &SimConfig) -> Result<usize, PhysicsError> {
    let mut applied = 0;
    for contact in contacts {
        let (a, b) = pair_mut(bodies, contact.a.index(), contact.b.index());
        if contact.classify(a.rigid(), b.rigid(), config) != ContactKind::Colliding {
            continue;
        }
        if contact.resolve(a.rigid_mut(), b.rigid_mut(), config)? {
            applied += 1;
        }
    }
    Ok(applied)
}
