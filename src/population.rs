//! Demographic models and switching between them.

use itertools::Itertools;
use log::debug;

use crate::{
    error::ConfigError,
    state::{ModelIndicator, Parameter},
};

/// Effective population size through time, as used by coalescent
/// likelihoods. Time runs backwards from the present at `t = 0`.
pub trait PopulationFunction {
    /// Population size at time `t`.
    fn pop_size(&self, t: f64) -> f64;

    /// Integral of `1 / pop_size` over `[0, t]`.
    fn intensity(&self, t: f64) -> f64;

    /// The time `t` at which `intensity(t) == x`.
    fn inverse_intensity(&self, x: f64) -> f64;

    /// Identifiers of the parameters this function depends on.
    fn parameter_ids(&self) -> Vec<String>;
}

impl<T: PopulationFunction + ?Sized> PopulationFunction for Box<T> {
    fn pop_size(&self, t: f64) -> f64 {
        (**self).pop_size(t)
    }

    fn intensity(&self, t: f64) -> f64 {
        (**self).intensity(t)
    }

    fn inverse_intensity(&self, x: f64) -> f64 {
        (**self).inverse_intensity(x)
    }

    fn parameter_ids(&self) -> Vec<String> {
        (**self).parameter_ids()
    }
}

/// `N(t) = N0`
#[derive(Debug, Clone)]
pub struct ConstantPopulation {
    pop_size: Parameter,
}

impl ConstantPopulation {
    pub fn new(pop_size: Parameter) -> Self {
        Self { pop_size }
    }
}

impl PopulationFunction for ConstantPopulation {
    fn pop_size(&self, _t: f64) -> f64 {
        self.pop_size.get()
    }

    fn intensity(&self, t: f64) -> f64 {
        t / self.pop_size.get()
    }

    fn inverse_intensity(&self, x: f64) -> f64 {
        x * self.pop_size.get()
    }

    fn parameter_ids(&self) -> Vec<String> {
        vec![self.pop_size.name().to_string()]
    }
}

/// `N(t) = N0 exp(-r t)`, a population that grew at rate `r` towards the
/// present.
#[derive(Debug, Clone)]
pub struct ExponentialGrowth {
    pop_size: Parameter,
    growth_rate: Parameter,
}

impl ExponentialGrowth {
    pub fn new(pop_size: Parameter, growth_rate: Parameter) -> Self {
        Self {
            pop_size,
            growth_rate,
        }
    }
}

impl PopulationFunction for ExponentialGrowth {
    fn pop_size(&self, t: f64) -> f64 {
        self.pop_size.get() * (-self.growth_rate.get() * t).exp()
    }

    fn intensity(&self, t: f64) -> f64 {
        let n0 = self.pop_size.get();
        let r = self.growth_rate.get();
        if r == 0. {
            return t / n0;
        }
        (r * t).exp_m1() / (n0 * r)
    }

    fn inverse_intensity(&self, x: f64) -> f64 {
        let n0 = self.pop_size.get();
        let r = self.growth_rate.get();
        if r == 0. {
            return x * n0;
        }
        (n0 * r * x).ln_1p() / r
    }

    fn parameter_ids(&self) -> Vec<String> {
        vec![
            self.pop_size.name().to_string(),
            self.growth_rate.name().to_string(),
        ]
    }
}

/// Population function that forwards to the demographic model selected by
/// the model indicator.
#[derive(Debug)]
pub struct PopulationFunctionSwitch<P> {
    indicator: ModelIndicator,
    functions: Vec<P>,
    parameter_ids: Vec<String>,
}

impl<P: PopulationFunction> PopulationFunctionSwitch<P> {
    pub fn new(indicator: ModelIndicator, functions: Vec<P>) -> Result<Self, ConfigError> {
        if functions.is_empty() {
            return Err(ConfigError::EmptyModelSet);
        }
        if functions.len() != indicator.model_count() {
            return Err(ConfigError::DimensionMismatch {
                what: "population functions",
                expected: indicator.model_count(),
                actual: functions.len(),
            });
        }
        // Sub-models may share parameters, list each id once.
        let parameter_ids = functions
            .iter()
            .flat_map(|function| function.parameter_ids())
            .unique()
            .collect_vec();
        debug!(
            "population function switch over {} models, parameters [{}]",
            functions.len(),
            parameter_ids.iter().join(", ")
        );
        Ok(Self {
            indicator,
            functions,
            parameter_ids,
        })
    }

    fn active(&self) -> &P {
        // The indicator never leaves [0, model_count), which equals functions.len().
        &self.functions[self.indicator.get()]
    }

    pub fn functions(&self) -> &[P] {
        &self.functions
    }
}

impl<P: PopulationFunction> PopulationFunction for PopulationFunctionSwitch<P> {
    fn pop_size(&self, t: f64) -> f64 {
        self.active().pop_size(t)
    }

    fn intensity(&self, t: f64) -> f64 {
        self.active().intensity(t)
    }

    fn inverse_intensity(&self, x: f64) -> f64 {
        self.active().inverse_intensity(x)
    }

    fn parameter_ids(&self) -> Vec<String> {
        self.parameter_ids.clone()
    }
}
