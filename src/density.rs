//! Proposal densities for values of parameters that are switched on.
//!
//! All densities here use a shape/scale parameterisation of the Gamma law.
//! Hastings ratios are always accumulated from [`PseudoPrior::log_density`].

use rand::Rng;
use rand_distr::{Distribution, Gamma};
use statrs::function::gamma::ln_gamma;

use crate::error::ConfigError;

/// A density that can both propose a value and score it.
///
/// The model-switch move draws fresh values for parameters it activates
/// from this density and scores abandoned values of deactivated parameters
/// under it, so both directions of the move use the same law.
pub trait PseudoPrior {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64;
    fn log_density(&self, x: f64) -> f64;
}

/// Gamma law with explicit shape `k` and scale `θ`.
///
/// The density is `x^(k-1) exp(-x/θ) / (Γ(k) θ^k)` on `x > 0`, with mean
/// `kθ` and rate `1/θ`.
#[derive(Debug, Clone)]
pub struct GammaProposal {
    shape: f64,
    scale: f64,
    log_norm: f64,
    dist: Gamma<f64>,
}

impl GammaProposal {
    pub fn from_shape_scale(shape: f64, scale: f64) -> Result<GammaProposal, ConfigError> {
        let invalid = ConfigError::InvalidDensity { shape, scale };
        if !(shape.is_finite() && shape > 0.) || !(scale.is_finite() && scale > 0.) {
            return Err(invalid);
        }
        let dist = Gamma::new(shape, scale).map_err(|_| invalid)?;
        let log_norm = -ln_gamma(shape) - shape * scale.ln();
        Ok(GammaProposal {
            shape,
            scale,
            log_norm,
            dist,
        })
    }

    pub fn from_shape_rate(shape: f64, rate: f64) -> Result<GammaProposal, ConfigError> {
        Self::from_shape_scale(shape, 1. / rate)
    }

    /// Gamma law with the given shape and mean, `scale = mean / shape`.
    pub fn from_shape_mean(shape: f64, mean: f64) -> Result<GammaProposal, ConfigError> {
        Self::from_shape_scale(shape, mean / shape)
    }

    pub fn shape(&self) -> f64 {
        self.shape
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn rate(&self) -> f64 {
        1. / self.scale
    }

    pub fn mean(&self) -> f64 {
        self.shape * self.scale
    }

    /// Raw density at `x`. Not used for Hastings ratios.
    pub fn density(&self, x: f64) -> f64 {
        self.log_density(x).exp()
    }
}

impl PseudoPrior for GammaProposal {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        self.dist.sample(rng)
    }

    fn log_density(&self, x: f64) -> f64 {
        if x < 0. || x.is_nan() {
            return f64::NEG_INFINITY;
        }
        if x == 0. {
            return match self.shape {
                k if k < 1. => f64::INFINITY,
                k if k > 1. => f64::NEG_INFINITY,
                _ => self.log_norm,
            };
        }
        self.log_norm + (self.shape - 1.) * x.ln() - x / self.scale
    }
}
