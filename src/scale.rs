use log::{debug, trace};
use rand::Rng;

use crate::{
    error::{ConfigError, Result, StepError},
    operator::{Proposable, Proposal},
    partition::Partition,
    state::{ModelIndicator, Parameter, StateDelta},
};

/// Settings for [`ConditionalScale`].
#[derive(Debug, Clone)]
pub struct ScaleSettings {
    /// Either one scale factor shared by all parameters, or one per
    /// parameter. A factor `s` bounds the multiplicative change of a value
    /// to `[1/s, s]` when `s > 1`, and to `[s, 1/s]` when `s < 1`. The sign
    /// of a factor is ignored.
    pub scale_factors: Vec<f64>,
}

impl Default for ScaleSettings {
    fn default() -> Self {
        Self {
            scale_factors: vec![0.75],
        }
    }
}

#[derive(Debug, Clone)]
struct ScaledParameter {
    param: Parameter,
    max_factor: f64,
}

/// Scale move on a parameter of the currently active model.
///
/// Each call draws a parameter uniformly from the bucket of the model
/// selected by the indicator, then a factor `f` uniformly from
/// `[1/fmax, fmax]`, and multiplies the value by `f`. Exactly two variates
/// are drawn from the rng per call: the parameter index, then the factor.
#[derive(Debug)]
pub struct ConditionalScale {
    indicator: ModelIndicator,
    partition: Partition<ScaledParameter>,
}

impl ConditionalScale {
    pub fn new(
        indicator: ModelIndicator,
        parameters: Vec<Parameter>,
        model_index_of: &[usize],
        settings: ScaleSettings,
    ) -> std::result::Result<ConditionalScale, ConfigError> {
        let n = parameters.len();
        if model_index_of.len() != n {
            return Err(ConfigError::DimensionMismatch {
                what: "parameter model indices",
                expected: n,
                actual: model_index_of.len(),
            });
        }
        let factors = &settings.scale_factors;
        if factors.len() != 1 && factors.len() != n {
            return Err(ConfigError::DimensionMismatch {
                what: "scale factors",
                expected: n,
                actual: factors.len(),
            });
        }
        check_model_indices(model_index_of, indicator.model_count())?;

        let mut scaled = Vec::with_capacity(n);
        for (i, param) in parameters.into_iter().enumerate() {
            let position = if factors.len() == 1 { 0 } else { i };
            let max_factor = upper_scale_bound(position, factors[position])?;
            scaled.push(ScaledParameter { param, max_factor });
        }

        let partition = Partition::build(scaled, model_index_of)?;
        debug!(
            "conditional scale move over {} parameters in {} models",
            partition.len(),
            partition.distinct_model_count()
        );
        Ok(ConditionalScale {
            indicator,
            partition,
        })
    }

    /// Number of parameters the move can pick from when `model` is active.
    pub fn bucket_size(&self, model: usize) -> usize {
        self.partition.bucket_size(model)
    }
}

impl Proposable for ConditionalScale {
    fn propose<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<Proposal> {
        let model = self.indicator.get();
        let bucket = self.partition.bucket(model);
        if bucket.is_empty() {
            return Err(StepError::EmptyBucket { model });
        }

        let idx = rng.random_range(0..bucket.len());
        let ScaledParameter { param, max_factor } = &bucket[idx];
        let fmax = *max_factor;
        let f = 1. / fmax + rng.random::<f64>() * (fmax - 1. / fmax);

        let old = param.get();
        if !(old.is_finite() && old > 0.) {
            return Err(StepError::NonPositiveValue {
                name: param.name().to_string(),
                value: old,
            });
        }
        let new = old * f;
        param.set(new);

        let mut delta = StateDelta::default();
        delta.record_parameter(param, old);

        let log_hastings_ratio = (old / new).ln();
        trace!(
            "scale {} in model {} by {:.6}: {} -> {}, log HR {}",
            param.name(),
            model,
            f,
            old,
            new,
            log_hastings_ratio
        );
        Ok(Proposal {
            log_hastings_ratio,
            delta,
        })
    }
}

/// Normalise a configured scale factor to an upper bound strictly above one.
fn upper_scale_bound(position: usize, value: f64) -> std::result::Result<f64, ConfigError> {
    let magnitude = value.abs();
    if !magnitude.is_finite() || magnitude == 0. || magnitude == 1. {
        return Err(ConfigError::InvalidScaleFactor { position, value });
    }
    if magnitude < 1. {
        Ok(1. / magnitude)
    } else {
        Ok(magnitude)
    }
}

pub(crate) fn check_model_indices(
    model_index_of: &[usize],
    model_count: usize,
) -> std::result::Result<(), ConfigError> {
    match model_index_of
        .iter()
        .enumerate()
        .find(|(_, &index)| index >= model_count)
    {
        Some((position, &index)) => Err(ConfigError::ModelIndexOutOfRange {
            position,
            index,
            model_count,
        }),
        None => Ok(()),
    }
}
