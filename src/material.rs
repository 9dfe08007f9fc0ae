/// Surface response coefficients of a body.
///
/// In a contact the two bodies' coefficients are averaged. Restitution is
/// scaled by [`SimConfig::restitution_scale`](crate::config::SimConfig) before
/// use, so with the default scale a restitution of `20.0` is perfectly elastic.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Material {
    pub restitution: f64,
    pub static_friction: f64,
    pub dynamic_friction: f64,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            restitution: 1.0,
            static_friction: 1.0,
            dynamic_friction: 1.0,
        }
    }
}

impl Material {
    pub fn new(restitution: f64, static_friction: f64, dynamic_friction: f64) -> Self {
        Self {
            restitution,
            static_friction,
            dynamic_friction,
        }
    }

    /// No friction at all; only the normal impulse acts.
    pub fn frictionless(restitution: f64) -> Self {
        Self::new(restitution, 0.0, 0.0)
    }

    /// Builder: set restitution.
    pub fn with_restitution(mut self, restitution: f64) -> Self {
        self.restitution = restitution;
        self
    }

    /// Builder: set both friction coefficients.
    pub fn with_friction(mut self, static_friction: f64, dynamic_friction: f64) -> Self {
        self.static_friction = static_friction;
        self.dynamic_friction = dynamic_friction;
        self
    }

    /// Pairwise average used when two materials meet.
    pub fn average(&self, other: &Material) -> Material {
        Material {
            restitution: (self.restitution + other.restitution) / 2.0,
            static_friction: (self.static_friction + other.static_friction) / 2.0,
            dynamic_friction: (self.dynamic_friction + other.dynamic_friction) / 2.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_material() {
        let m = Material::default();
        assert_eq!(m, Material::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn test_average() {
        let a = Material::new(2.0, 0.0, 1.0);
        let b = Material::frictionless(4.0).with_friction(1.0, 0.5);
        assert_eq!(a.average(&b), Material::new(3.0, 0.5, 0.75));
    }
}
