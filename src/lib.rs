//! Metropolis-Hastings moves for sampling across a discrete set of models.
//!
//! A single [`ModelIndicator`] selects which group of continuous
//! [`Parameter`]s is active. [`ConditionalScale`] moves the parameters of the
//! active model, [`ModelSwitch`] jumps between models and re-draws the newly
//! activated parameters from their pseudo-priors, and [`DistributionSwitch`]
//! and [`PopulationFunctionSwitch`] forward evaluations to the active
//! sub-model. Each move returns the log Hastings ratio together with a
//! [`StateDelta`] that lets the chain driver undo a rejected move.

pub(crate) mod density;
pub(crate) mod dispatch;
pub(crate) mod error;
pub(crate) mod operator;
pub(crate) mod partition;
pub(crate) mod population;
pub(crate) mod scale;
pub(crate) mod state;
pub(crate) mod switch;

pub use density::{GammaProposal, PseudoPrior};
pub use dispatch::{DistributionSwitch, EvaluationPolicy, LogDensity};
pub use error::{ConfigError, StepError};
pub use operator::{Proposable, Proposal};
pub use partition::Partition;
pub use population::{
    ConstantPopulation, ExponentialGrowth, PopulationFunction, PopulationFunctionSwitch,
};
pub use scale::{ConditionalScale, ScaleSettings};
pub use state::{ModelIndicator, Parameter, StateDelta};
pub use switch::{ModelSwitch, SwitchSettings};
