use log::{debug, warn};

use crate::{
    error::{ConfigError, Result, StepError},
    state::ModelIndicator,
};

/// Something that can report the log density of the current chain state.
///
/// Implementations read whatever shared parameters they depend on, so the
/// value changes as proposals mutate the state.
pub trait LogDensity {
    type Err: std::error::Error + Send + Sync + 'static;

    fn log_density(&mut self) -> std::result::Result<f64, Self::Err>;
}

impl<T: LogDensity + ?Sized> LogDensity for Box<T> {
    type Err = T::Err;

    fn log_density(&mut self) -> std::result::Result<f64, Self::Err> {
        (**self).log_density()
    }
}

/// Which sub-distributions [`DistributionSwitch`] evaluates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EvaluationPolicy {
    /// Only ever evaluate the active sub-distribution.
    ActiveOnly,
    /// Evaluate every sub-distribution once on the first call, so that
    /// errors in inactive branches show up before they are switched on,
    /// then only the active one.
    #[default]
    WarmUpAll,
}

/// Log density that forwards to the sub-distribution selected by the model
/// indicator.
#[derive(Debug)]
pub struct DistributionSwitch<D> {
    indicator: ModelIndicator,
    distributions: Vec<D>,
    policy: EvaluationPolicy,
    warmed_up: bool,
}

impl<D: LogDensity> DistributionSwitch<D> {
    pub fn new(
        indicator: ModelIndicator,
        distributions: Vec<D>,
        policy: EvaluationPolicy,
    ) -> std::result::Result<Self, ConfigError> {
        if distributions.is_empty() {
            return Err(ConfigError::EmptyModelSet);
        }
        if distributions.len() != indicator.model_count() {
            return Err(ConfigError::DimensionMismatch {
                what: "sub-distributions",
                expected: indicator.model_count(),
                actual: distributions.len(),
            });
        }
        debug!(
            "distribution switch over {} models, policy {:?}",
            distributions.len(),
            policy
        );
        Ok(DistributionSwitch {
            indicator,
            distributions,
            policy,
            warmed_up: false,
        })
    }

    /// Log density of the active sub-distribution.
    pub fn evaluate(&mut self) -> Result<f64> {
        let active = self.indicator.get();
        if self.policy == EvaluationPolicy::WarmUpAll && !self.warmed_up {
            let mut active_logp = None;
            for (model, dist) in self.distributions.iter_mut().enumerate() {
                let logp = eval_sub_model(model, dist)?;
                if model == active {
                    active_logp = Some(logp);
                } else if !logp.is_finite() {
                    warn!(
                        "inactive sub-distribution {} has log density {} at the initial state",
                        model, logp
                    );
                }
            }
            self.warmed_up = true;
            return active_logp.ok_or(StepError::IndicatorOutOfRange {
                value: active,
                model_count: self.distributions.len(),
            });
        }

        let model_count = self.distributions.len();
        let dist = self
            .distributions
            .get_mut(active)
            .ok_or(StepError::IndicatorOutOfRange {
                value: active,
                model_count,
            })?;
        eval_sub_model(active, dist)
    }

    pub fn active_model(&self) -> usize {
        self.indicator.get()
    }

    pub fn policy(&self) -> EvaluationPolicy {
        self.policy
    }

    pub fn is_warmed_up(&self) -> bool {
        self.warmed_up
    }

    pub fn distributions(&self) -> &[D] {
        &self.distributions
    }

    pub fn distributions_mut(&mut self) -> &mut [D] {
        &mut self.distributions
    }
}

fn eval_sub_model<D: LogDensity>(model: usize, dist: &mut D) -> Result<f64> {
    dist.log_density()
        .map_err(|err| StepError::SubModelFailure {
            model,
            source: Box::new(err),
        })
}

impl<D: LogDensity> LogDensity for DistributionSwitch<D> {
    type Err = StepError;

    fn log_density(&mut self) -> Result<f64> {
        self.evaluate()
    }
}
