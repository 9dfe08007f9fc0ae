//! Conservative scalar potentials and the force fields derived from them.
//!
//! A [`Potential`] is defined around a local origin. Fields that follow a body
//! are evaluated with [`Potential::force_at`], passing the body's current
//! position as the origin, so no per-tick recentring state is stored.

use crate::math::Vec3;

/// Scalar potential `V`; the associated force is `F = -∇V`.
#[derive(Debug, Clone, PartialEq)]
pub enum Potential {
    /// `V(p) = Σ Aᵢ · pᵢ^aᵢ` over the three axes.
    Cartesian { coefficients: Vec3, exponents: Vec3 },
    /// `V(p) = -k · |p|^power`.
    Central { strength: f64, power: f64 },
    /// Superposition of several potentials.
    Sum(Vec<Potential>),
}

impl Potential {
    /// Inverse-square attraction of strength `k`: `V = -k / r`, `|F| = k / r²`.
    pub fn inverse_square(strength: f64) -> Self {
        Potential::Central {
            strength,
            power: -1.0,
        }
    }

    /// Uniform field producing the constant force `force` everywhere.
    pub fn uniform(force: Vec3) -> Self {
        Potential::Cartesian {
            coefficients: -force,
            exponents: Vec3::new(1.0, 1.0, 1.0),
        }
    }

    /// Potential energy at `p` (relative to the local origin).
    pub fn value(&self, p: &Vec3) -> f64 {
        match self {
            Potential::Cartesian {
                coefficients,
                exponents,
            } => (0..3)
                .map(|i| coefficients[i] * p[i].powf(exponents[i]))
                .sum(),
            Potential::Central { strength, power } => -strength * p.norm().powf(*power),
            Potential::Sum(parts) => parts.iter().map(|part| part.value(p)).sum(),
        }
    }

    /// Gradient `∇V` at `p`. Singular points contribute zero.
    pub fn gradient(&self, p: &Vec3) -> Vec3 {
        match self {
            Potential::Cartesian {
                coefficients,
                exponents,
            } => Vec3::from_fn(|i, _| {
                let a = exponents[i];
                if a == 0.0 {
                    return 0.0;
                }
                let g = coefficients[i] * a * p[i].powf(a - 1.0);
                if g.is_finite() {
                    g
                } else {
                    0.0
                }
            }),
            Potential::Central { strength, power } => {
                let r = p.norm();
                if r == 0.0 {
                    return Vec3::zeros();
                }
                // d/dp (-k r^n) = -k n r^(n-2) p
                p * (-strength * power * r.powf(power - 2.0))
            }
            Potential::Sum(parts) => parts
                .iter()
                .fold(Vec3::zeros(), |acc, part| acc + part.gradient(p)),
        }
    }

    /// Force on a point at world position `point` when the potential is centred on `origin`.
    #[inline]
    pub fn force_at(&self, point: &Vec3, origin: &Vec3) -> Vec3 {
        -self.gradient(&(point - origin))
    }
}

impl core::ops::Add for Potential {
    type Output = Potential;

    fn add(self, rhs: Potential) -> Potential {
        match (self, rhs) {
            (Potential::Sum(mut a), Potential::Sum(b)) => {
                a.extend(b);
                Potential::Sum(a)
            }
            (Potential::Sum(mut a), other) => {
                a.push(other);
                Potential::Sum(a)
            }
            (other, Potential::Sum(mut b)) => {
                b.insert(0, other);
                Potential::Sum(b)
            }
            (a, b) => Potential::Sum(vec![a, b]),
        }
    }
}
