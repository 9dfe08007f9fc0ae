//! Frame driver.
//!
//! [`Universe`] owns every body and advances them together. Each tick it
//! applies gravity and potential fields, integrates, and then detects and
//! resolves contacts one body at a time.

use log::{error, trace};
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::body::{Body, BodyId};
use crate::bounds::OverlapTable;
use crate::config::{IntegrationMode, SimConfig};
use crate::contact::{resolve_contacts, Contact};
use crate::error::PhysicsError;
use crate::field::Potential;
use crate::math::Vec3;

#[derive(Debug, Clone)]
pub struct Universe {
    bodies: Vec<Body>,
    /// Per-body potential, indexed like `bodies`.
    body_potentials: Vec<Option<Potential>>,
    global_potential: Option<Potential>,
    /// Downward acceleration along -Z.
    gravity: f64,
    config: SimConfig,
    overlap: OverlapTable,
    elapsed: f64,
}

impl Universe {
    /// Create a universe with the default broad-phase table.
    ///
    /// Fails if any two bodies are already in contact.
    pub fn new(bodies: Vec<Body>, config: SimConfig) -> Result<Self, PhysicsError> {
        Self::with_overlap_table(bodies, config, OverlapTable::default())
    }

    /// Like [`Universe::new`], with a caller-built broad-phase table.
    ///
    /// The table and `config` are validated before the overlap check runs.
    pub fn with_overlap_table(
        bodies: Vec<Body>,
        config: SimConfig,
        overlap: OverlapTable,
    ) -> Result<Self, PhysicsError> {
        config.validate()?;
        overlap.validate()?;

        let universe = Self {
            body_potentials: vec![None; bodies.len()],
            bodies,
            global_potential: None,
            gravity: 0.0,
            config,
            overlap,
            elapsed: 0.0,
        };

        let n = universe.bodies.len();
        for i in 0..n {
            for j in (i + 1)..n {
                if !universe.contacts_between(i, j)?.is_empty() {
                    error!("bodies #{} and #{} overlap at construction", i, j);
                    return Err(PhysicsError::InitialOverlap {
                        a: BodyId(i),
                        b: BodyId(j),
                    });
                }
            }
        }
        Ok(universe)
    }

    // -- Fields --

    /// Constant downward acceleration `g` along -Z, replacing any earlier gravity.
    pub fn set_gravity(&mut self, g: f64) {
        let delta = Vec3::new(0.0, 0.0, -(g - self.gravity));
        for body in &mut self.bodies {
            body.rigid_mut().add_acceleration(delta);
        }
        self.gravity = g;
    }

    /// Install the global potential, replacing any earlier one.
    pub fn add_global_potential(&mut self, potential: Potential) {
        self.global_potential = Some(potential);
    }

    /// Attach a potential that follows body `id` and acts on every other body.
    pub fn add_body_potential(&mut self, id: BodyId, potential: Potential) -> Result<(), PhysicsError> {
        match self.body_potentials.get_mut(id.index()) {
            Some(slot) => {
                *slot = Some(potential);
                Ok(())
            }
            None => {
                error!("cannot attach a potential to unknown body {}", id);
                Err(PhysicsError::UnknownBody(id))
            }
        }
    }

    /// Total field force on body `target` from the other bodies' potentials
    /// and the global potential, at current positions.
    fn field_force(&self, target: usize) -> Vec3 {
        let point = self.bodies[target].position();
        let tracked = self
            .body_potentials
            .iter()
            .enumerate()
            .filter(|(source, _)| *source != target)
            .filter_map(|(source, p)| p.as_ref().map(|p| (source, p)))
            .fold(Vec3::zeros(), |acc, (source, p)| {
                acc + p.force_at(&point, &self.bodies[source].position())
            });
        let global = self
            .global_potential
            .as_ref()
            .map_or(Vec3::zeros(), |p| p.force_at(&point, &Vec3::zeros()));
        tracked + global
    }

    // -- Stepping --

    /// Advance every body by `dt` seconds and resolve the contacts that result.
    pub fn step(&mut self, dt: f64) -> Result<(), PhysicsError> {
        match self.config.integration {
            IntegrationMode::Sequential => self.step_sequential(dt)?,
            IntegrationMode::Sharded => self.step_sharded(dt)?,
        }
        self.elapsed += dt;
        Ok(())
    }

    fn step_sequential(&mut self, dt: f64) -> Result<(), PhysicsError> {
        for i in 0..self.bodies.len() {
            if self.bodies[i].rigid().is_fixed() {
                self.bodies[i].update(dt);
                continue;
            }
            let force = self.field_force(i);
            let body = &mut self.bodies[i];
            if !body.rigid().is_position_fixed() {
                body.rigid_mut().apply_field_force(force);
            }
            body.update(dt);
            self.resolve_body(i)?;
        }
        Ok(())
    }

    /// Integrate every body from a frame-start snapshot of the fields, then
    /// detect and resolve contacts body by body.
    fn step_sharded(&mut self, dt: f64) -> Result<(), PhysicsError> {
        let forces: Vec<Vec3> = (0..self.bodies.len()).map(|i| self.field_force(i)).collect();
        integrate_all(&mut self.bodies, &forces, dt);
        for i in 0..self.bodies.len() {
            if !self.bodies[i].rigid().is_fixed() {
                self.resolve_body(i)?;
            }
        }
        Ok(())
    }

    /// Gather the contacts of body `i` against every other body and resolve them.
    fn resolve_body(&mut self, i: usize) -> Result<(), PhysicsError> {
        let mut contacts = Vec::new();
        for j in 0..self.bodies.len() {
            if j != i {
                contacts.extend(self.contacts_between(i, j)?);
            }
        }
        if contacts.is_empty() {
            return Ok(());
        }
        let applied = resolve_contacts(&contacts, &mut self.bodies, &self.config)?;
        trace!(
            "body #{}: {} contacts, {} impulses at t = {}",
            i,
            contacts.len(),
            applied,
            self.elapsed
        );
        Ok(())
    }

    fn contacts_between(&self, i: usize, j: usize) -> Result<Vec<Contact>, PhysicsError> {
        let (a, b) = (&self.bodies[i], &self.bodies[j]);
        if !self.overlap.overlaps(a.bounds(), b.bounds())? {
            return Ok(Vec::new());
        }
        Ok(a.detect(b)
            .iter()
            .map(|hit| Contact::new(BodyId(i), a, BodyId(j), b, hit))
            .collect())
    }

    // -- Read surface --

    /// Current contacts between two bodies, normals pointing from `a` to `b`.
    pub fn detect(&self, a: BodyId, b: BodyId) -> Result<Vec<Contact>, PhysicsError> {
        for id in [a, b] {
            if id.index() >= self.bodies.len() {
                return Err(PhysicsError::UnknownBody(id));
            }
        }
        if a == b {
            return Ok(Vec::new());
        }
        self.contacts_between(a.index(), b.index())
    }

    /// Body `id`, or `None` if no such body exists.
    pub fn body(&self, id: BodyId) -> Option<&Body> {
        self.bodies.get(id.index())
    }

    /// Mutable access to body `id`, for inputs between steps.
    pub fn body_mut(&mut self, id: BodyId) -> Option<&mut Body> {
        self.bodies.get_mut(id.index())
    }

    /// All bodies in [`BodyId`] order.
    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Broad-phase table used to pair bounding volumes.
    pub fn overlap_table(&self) -> &OverlapTable {
        &self.overlap
    }

    /// Gravity currently applied along -Z.
    pub fn gravity(&self) -> f64 {
        self.gravity
    }

    /// Simulation time stepped so far.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Sum of [`RigidBody::kinetic_energy`](crate::RigidBody::kinetic_energy) over every body.
    pub fn total_kinetic_energy(&self) -> f64 {
        self.bodies.iter().map(|b| b.rigid().kinetic_energy()).sum()
    }
}

fn integrate_one(body: &mut Body, force: Vec3, dt: f64) {
    if !body.rigid().is_position_fixed() {
        body.rigid_mut().apply_field_force(force);
    }
    body.update(dt);
}

#[cfg(feature = "parallel")]
fn integrate_all(bodies: &mut [Body], forces: &[Vec3], dt: f64) {
    bodies
        .par_iter_mut()
        .zip(forces.par_iter())
        .for_each(|(body, force)| integrate_one(body, *force, dt));
}

#[cfg(not(feature = "parallel"))]
fn integrate_all(bodies: &mut [Body], forces: &[Vec3], dt: f64) {
    for (body, force) in bodies.iter_mut().zip(forces) {
        integrate_one(body, *force, dt);
    }
}
