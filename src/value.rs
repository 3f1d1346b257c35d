//! Values the calibration formulas are evaluated over.
//!
//! A value is either a plain `f64` (one Monte Carlo sample) or an
//! [`Ensemble`], a fixed-size particle approximation of a whole distribution.
//! The formulas are written once against [`UncertainValue`].

use std::ops::{Add, Div, Mul, Sub};

use crate::calibration::sign;

/// Arithmetic capability shared by scalar samples and distributional values.
pub trait UncertainValue:
    Clone
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Mul<f64, Output = Self>
    + Sub<f64, Output = Self>
{
    /// `0` at zero, otherwise `+1` or `-1`.
    fn sign(&self) -> Self;

    fn powi(&self, exponent: i32) -> Self;

    /// Support points of the value. A scalar is a single-particle distribution.
    fn particles(&self) -> &[f64];

    /// Expected value over the particles.
    fn expected(&self) -> f64 {
        let particles = self.particles();
        particles.iter().sum::<f64>() / particles.len() as f64
    }
}

impl UncertainValue for f64 {
    fn sign(&self) -> f64 {
        sign(*self)
    }

    fn powi(&self, exponent: i32) -> f64 {
        f64::powi(*self, exponent)
    }

    fn particles(&self) -> &[f64] {
        std::slice::from_ref(self)
    }

    fn expected(&self) -> f64 {
        *self
    }
}

/// Particle representation of a distribution.
///
/// Every operation is applied particle-wise, so a value used twice in one
/// expression stays correlated with itself. Combining ensembles of different
/// sizes panics.
#[derive(Debug, Clone, PartialEq)]
pub struct Ensemble {
    particles: Vec<f64>,
}

impl Ensemble {
    pub fn from_particles(particles: Vec<f64>) -> Self {
        assert!(!particles.is_empty(), "an ensemble needs at least one particle");
        Self { particles }
    }

    /// Point mass replicated over `size` particles.
    pub fn constant(value: f64, size: usize) -> Self {
        Self::from_particles(vec![value; size])
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    fn map(mut self, f: impl Fn(f64) -> f64) -> Self {
        for x in &mut self.particles {
            *x = f(*x);
        }
        self
    }

    fn zip_with(mut self, rhs: Ensemble, f: impl Fn(f64, f64) -> f64) -> Self {
        assert_eq!(
            self.particles.len(),
            rhs.particles.len(),
            "ensemble size mismatch"
        );
        for (x, y) in self.particles.iter_mut().zip(rhs.particles) {
            *x = f(*x, y);
        }
        self
    }
}

macro_rules! impl_particle_op {
    ($trait:ident, $method:ident, $op:tt) => {
        impl $trait for Ensemble {
            type Output = Ensemble;

            fn $method(self, rhs: Ensemble) -> Ensemble {
                self.zip_with(rhs, |a, b| a $op b)
            }
        }

        impl $trait<f64> for Ensemble {
            type Output = Ensemble;

            fn $method(self, rhs: f64) -> Ensemble {
                self.map(|a| a $op rhs)
            }
        }
    };
}

impl_particle_op!(Add, add, +);
impl_particle_op!(Sub, sub, -);
impl_particle_op!(Mul, mul, *);
impl_particle_op!(Div, div, /);

impl UncertainValue for Ensemble {
    fn sign(&self) -> Ensemble {
        self.clone().map(sign)
    }

    fn powi(&self, exponent: i32) -> Ensemble {
        self.clone().map(|x| x.powi(exponent))
    }

    fn particles(&self) -> &[f64] {
        &self.particles
    }
}
