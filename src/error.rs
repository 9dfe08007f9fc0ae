//! Error type shared by every fallible operation in the crate.

use thiserror::Error;

use crate::body::BodyId;
use crate::bounds::BoundKind;

/// Fatal conditions raised by construction, configuration and stepping.
///
/// None of these are retried by the engine; they indicate a misconfigured
/// scene or a numerical breakdown that the caller has to deal with.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PhysicsError {
    #[error("bodies {a} and {b} overlap at construction")]
    InitialOverlap { a: BodyId, b: BodyId },

    #[error("matrix is singular (determinant {determinant})")]
    SingularMatrix { determinant: f64 },

    #[error("no overlap test registered for {a:?} against {b:?}")]
    UnregisteredBoundPair { a: BoundKind, b: BoundKind },

    #[error("normal impulse is not finite ({magnitude})")]
    NonFiniteImpulse { magnitude: f64 },

    #[error("friction impulse is NaN")]
    FrictionNaN,

    #[error("friction impulse is negative ({magnitude})")]
    NegativeFriction { magnitude: f64 },

    #[error("quaternion is not unit length (norm {norm})")]
    NonUnitQuaternion { norm: f64 },

    #[error("matrix is not a proper rotation (determinant {determinant})")]
    NonOrthogonalMatrix { determinant: f64 },

    #[error("unknown body {0}")]
    UnknownBody(BodyId),

    #[error("rotation locks and manifold constraints are mutually exclusive")]
    ConflictingConstraints,

    #[error("body is {distance} away from its constraint manifold")]
    OffManifold { distance: f64 },

    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter {
        name: &'static str,
        reason: &'static str,
    },
}
