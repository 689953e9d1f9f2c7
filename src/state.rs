//! Shared mutable chain state.
//!
//! Operators and dispatchers hold handles to the same cells as the chain
//! driver. Cloning a handle never copies the value, so a change made by a
//! proposal is seen by every other component that references the cell.
//! The handles are intentionally `!Send`: one chain is driven from one
//! thread, one proposal at a time.

use std::{cell::Cell, fmt, rc::Rc};

use crate::error::{ConfigError, StepError};

struct ParameterCell {
    name: String,
    value: Cell<f64>,
}

/// A named real valued parameter owned by the chain state.
#[derive(Clone)]
pub struct Parameter {
    inner: Rc<ParameterCell>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: f64) -> Parameter {
        Parameter {
            inner: Rc::new(ParameterCell {
                name: name.into(),
                value: Cell::new(value),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn get(&self) -> f64 {
        self.inner.value.get()
    }

    pub fn set(&self, value: f64) {
        self.inner.value.set(value);
    }

    /// Replace the value and return the previous one.
    pub fn replace(&self, value: f64) -> f64 {
        self.inner.value.replace(value)
    }

    /// True if both handles refer to the same parameter.
    pub fn ptr_eq(&self, other: &Parameter) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parameter")
            .field("name", &self.inner.name)
            .field("value", &self.get())
            .finish()
    }
}

struct IndicatorCell {
    value: Cell<usize>,
    model_count: usize,
}

/// Integer state selecting which model is currently active.
///
/// The value is always inside `[0, model_count)`.
#[derive(Clone)]
pub struct ModelIndicator {
    inner: Rc<IndicatorCell>,
}

impl ModelIndicator {
    pub fn new(value: usize, model_count: usize) -> Result<ModelIndicator, ConfigError> {
        if model_count == 0 {
            return Err(ConfigError::EmptyModelSet);
        }
        if value >= model_count {
            return Err(ConfigError::IndicatorOutOfRange { value, model_count });
        }
        Ok(ModelIndicator {
            inner: Rc::new(IndicatorCell {
                value: Cell::new(value),
                model_count,
            }),
        })
    }

    pub fn get(&self) -> usize {
        self.inner.value.get()
    }

    pub fn model_count(&self) -> usize {
        self.inner.model_count
    }

    pub fn set(&self, value: usize) -> Result<(), StepError> {
        self.replace(value).map(|_| ())
    }

    /// Set a new model and return the previously active one.
    pub fn replace(&self, value: usize) -> Result<usize, StepError> {
        if value >= self.inner.model_count {
            return Err(StepError::IndicatorOutOfRange {
                value,
                model_count: self.inner.model_count,
            });
        }
        Ok(self.inner.value.replace(value))
    }

    pub fn ptr_eq(&self, other: &ModelIndicator) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for ModelIndicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelIndicator")
            .field("value", &self.get())
            .field("model_count", &self.model_count())
            .finish()
    }
}

/// Record of every state cell a proposal changed, with the previous values.
#[derive(Debug, Default)]
pub struct StateDelta {
    indicator: Option<(ModelIndicator, usize)>,
    parameters: Vec<(Parameter, f64)>,
}

impl StateDelta {
    pub(crate) fn record_indicator(&mut self, indicator: &ModelIndicator, previous: usize) {
        // Only the first write holds the value from before the proposal.
        if self.indicator.is_none() {
            self.indicator = Some((indicator.clone(), previous));
        }
    }

    pub(crate) fn record_parameter(&mut self, parameter: &Parameter, previous: f64) {
        self.parameters.push((parameter.clone(), previous));
    }

    /// Previous value of the model indicator, if the proposal changed it.
    pub fn previous_model(&self) -> Option<usize> {
        self.indicator.as_ref().map(|(_, previous)| *previous)
    }

    /// Parameters touched by the proposal, paired with their previous values.
    pub fn changed_parameters(&self) -> impl Iterator<Item = (&Parameter, f64)> {
        self.parameters.iter().map(|(param, value)| (param, *value))
    }

    pub fn is_empty(&self) -> bool {
        self.indicator.is_none() && self.parameters.is_empty()
    }

    /// Restore every recorded cell to its value from before the proposal.
    pub fn revert(self) {
        for (param, previous) in self.parameters.into_iter().rev() {
            param.set(previous);
        }
        if let Some((indicator, previous)) = self.indicator {
            // `previous` came out of the indicator itself, so it is in range.
            indicator.inner.value.set(previous);
        }
    }
}
