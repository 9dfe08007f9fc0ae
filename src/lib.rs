//! Rigid-body simulation in three dimensions.
//!
//! Bodies carry a [`RigidBody`] state, a [`Shape`] made of collision
//! primitives, a broad-phase [`BoundVolume`] and a [`Material`]. A
//! [`Universe`] advances them with explicit Euler integration and resolves
//! contacts with single impulses that combine restitution and friction.
//!
//! Contacts are found by probing: each shape exposes a set of line segments
//! (triangle edges, rays, axial lines) and the other shape's primitives are
//! intersected with them.
//!
//! ```
//! use rigid3d::{Body, BodyConfig, SimConfig, Universe, Vec3};
//!
//! let floor = Body::wall(Vec3::zeros(), Vec3::z(), 10.0, 10.0)?;
//! let ball = Body::ball(1.0, 8, BodyConfig::new(1.0).with_position(Vec3::new(0.0, 0.2, 3.0)))?;
//!
//! let mut universe = Universe::new(vec![floor, ball], SimConfig::default())?;
//! universe.set_gravity(9.8);
//! for _ in 0..100 {
//!     universe.step(0.01)?;
//! }
//! assert!(universe.bodies()[1].position().z < 3.0);
//! # Ok::<(), rigid3d::PhysicsError>(())
//! ```

pub mod body;
pub mod bounds;
pub mod config;
pub mod contact;
pub mod error;
pub mod field;
pub mod geometry;
pub mod manifold;
pub mod material;
pub mod math;
pub mod rigid_body;
pub mod shape;
pub mod universe;

pub use body::{Body, BodyConfig, BodyId};
pub use bounds::{BoundKind, BoundVolume, OverlapTable};
pub use config::{IntegrationMode, ResolutionMode, SimConfig};
pub use contact::{Contact, ContactKind};
pub use error::PhysicsError;
pub use field::Potential;
pub use geometry::{Intersection, Pose, Primitive, Segment};
pub use manifold::Manifold;
pub use material::Material;
pub use math::{Mat3, Quat, Vec3};
pub use rigid_body::{Axis, RigidBody};
pub use shape::Shape;
pub use universe::Universe;
