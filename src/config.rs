//! Simulation tuning.

use crate::error::PhysicsError;

/// How contacts found for one body are resolved within a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ResolutionMode {
    /// Classify and resolve each contact once, in detection order.
    SinglePass,
    /// Re-run classification and resolution over the same contacts until none
    /// is colliding, giving up after `max_iterations` passes.
    Iterative { max_iterations: usize },
}

impl ResolutionMode {
    pub const DEFAULT_MAX_ITERATIONS: usize = 100;

    pub fn iterative() -> Self {
        ResolutionMode::Iterative {
            max_iterations: Self::DEFAULT_MAX_ITERATIONS,
        }
    }
}

/// Order of integration and contact handling inside a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IntegrationMode {
    /// Integrate one body, then detect and resolve its contacts, then move on.
    Sequential,
    /// Integrate every free body first (across rayon workers when the
    /// `parallel` feature is enabled), then detect and resolve all pairs on
    /// one thread at the frame boundary.
    Sharded,
}

/// Engine constants. The defaults reproduce the reference tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimConfig {
    /// Band of normal relative speed classified as resting contact.
    pub resting_threshold: f64,
    /// Tangential speed (per unit of static friction) under which static friction applies.
    pub static_friction_tolerance: f64,
    /// Multiplier on the averaged material restitution.
    pub restitution_scale: f64,
    /// Multiplier on the averaged dynamic friction coefficient.
    pub dynamic_friction_scale: f64,
    /// Multiplier on the averaged static friction coefficient.
    pub static_friction_scale: f64,
    pub resolution: ResolutionMode,
    pub integration: IntegrationMode,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            resting_threshold: 0.01,
            static_friction_tolerance: 0.01,
            restitution_scale: 0.05,
            dynamic_friction_scale: 0.5,
            static_friction_scale: 2.0,
            resolution: ResolutionMode::SinglePass,
            integration: IntegrationMode::Sequential,
        }
    }
}

impl SimConfig {
    pub fn with_resting_threshold(mut self, threshold: f64) -> Self {
        self.resting_threshold = threshold;
        self
    }

    pub fn with_restitution_scale(mut self, scale: f64) -> Self {
        self.restitution_scale = scale;
        self
    }

    pub fn with_friction_scales(mut self, static_scale: f64, dynamic_scale: f64) -> Self {
        self.static_friction_scale = static_scale;
        self.dynamic_friction_scale = dynamic_scale;
        self
    }

    pub fn with_resolution(mut self, resolution: ResolutionMode) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn with_integration(mut self, integration: IntegrationMode) -> Self {
        self.integration = integration;
        self
    }

    /// Reject negative or non-finite constants and an iteration bound of zero.
    pub fn validate(&self) -> Result<(), PhysicsError> {
        let constants = [
            ("resting_threshold", self.resting_threshold),
            ("static_friction_tolerance", self.static_friction_tolerance),
            ("restitution_scale", self.restitution_scale),
            ("dynamic_friction_scale", self.dynamic_friction_scale),
            ("static_friction_scale", self.static_friction_scale),
        ];
        for (name, value) in constants {
            if !value.is_finite() || value < 0.0 {
                return Err(PhysicsError::InvalidParameter {
                    name,
                    reason: "must be finite and non-negative",
                });
            }
        }
        if let ResolutionMode::Iterative { max_iterations: 0 } = self.resolution {
            return Err(PhysicsError::InvalidParameter {
                name: "max_iterations",
                reason: "must be at least 1",
            });
        }
        Ok(())
    }
}
