use itertools::izip;
use log::{debug, trace};
use rand::Rng;

use crate::{
    density::{GammaProposal, PseudoPrior},
    error::{ConfigError, Result},
    operator::{Proposable, Proposal},
    partition::Partition,
    scale::check_model_indices,
    state::{ModelIndicator, Parameter, StateDelta},
};

/// Gamma pseudo-priors for [`ModelSwitch`], one (shape, mean) pair per
/// parameter.
#[derive(Debug, Clone, Default)]
pub struct SwitchSettings {
    pub shapes: Vec<f64>,
    pub means: Vec<f64>,
}

#[derive(Debug, Clone)]
struct SwitchedParameter<D> {
    param: Parameter,
    pseudo_prior: D,
}

/// Trans-dimensional move that changes the active model.
///
/// A call moves the indicator from `m` to a different model `m'` drawn
/// uniformly from the remaining `M - 1`, draws fresh values for every
/// parameter of `m'` from its pseudo-prior, and returns
///
/// ```text
/// log HR = Σ_{p in m} log q_p(old_p) - Σ_{p in m'} log q_p(new_p)
/// ```
///
/// Parameters of `m` keep their abandoned values, parameters of any other
/// model are not touched.
///
/// Rng usage: uniform model draws until one differs from `m` (expected
/// `M / (M - 1)` draws), then one variate per parameter of `m'` in bucket
/// order.
#[derive(Debug)]
pub struct ModelSwitch<D: PseudoPrior = GammaProposal> {
    indicator: ModelIndicator,
    partition: Partition<SwitchedParameter<D>>,
}

impl ModelSwitch<GammaProposal> {
    pub fn new(
        indicator: ModelIndicator,
        parameters: Vec<Parameter>,
        model_index_of: &[usize],
        settings: SwitchSettings,
    ) -> std::result::Result<Self, ConfigError> {
        let n = parameters.len();
        if model_index_of.len() != n {
            return Err(ConfigError::DimensionMismatch {
                what: "parameter model indices",
                expected: n,
                actual: model_index_of.len(),
            });
        }
        if settings.shapes.len() != n {
            return Err(ConfigError::DimensionMismatch {
                what: "pseudo-prior shapes",
                expected: n,
                actual: settings.shapes.len(),
            });
        }
        if settings.means.len() != n {
            return Err(ConfigError::DimensionMismatch {
                what: "pseudo-prior means",
                expected: n,
                actual: settings.means.len(),
            });
        }
        let pseudo_priors = izip!(&settings.shapes, &settings.means)
            .map(|(&shape, &mean)| GammaProposal::from_shape_mean(shape, mean))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Self::with_pseudo_priors(indicator, parameters, model_index_of, pseudo_priors)
    }
}

impl<D: PseudoPrior> ModelSwitch<D> {
    pub fn with_pseudo_priors(
        indicator: ModelIndicator,
        parameters: Vec<Parameter>,
        model_index_of: &[usize],
        pseudo_priors: Vec<D>,
    ) -> std::result::Result<Self, ConfigError> {
        let model_count = indicator.model_count();
        if model_count < 2 {
            return Err(ConfigError::TooFewModels { found: model_count });
        }
        let n = parameters.len();
        if pseudo_priors.len() != n {
            return Err(ConfigError::DimensionMismatch {
                what: "pseudo-priors",
                expected: n,
                actual: pseudo_priors.len(),
            });
        }
        if model_index_of.len() != n {
            return Err(ConfigError::DimensionMismatch {
                what: "parameter model indices",
                expected: n,
                actual: model_index_of.len(),
            });
        }
        check_model_indices(model_index_of, model_count)?;

        let items = izip!(parameters, pseudo_priors)
            .map(|(param, pseudo_prior)| SwitchedParameter {
                param,
                pseudo_prior,
            });
        let partition = Partition::build(items, model_index_of)?;
        debug!(
            "model switch between {} models, bucket sizes {:?}",
            model_count,
            (0..model_count)
                .map(|m| partition.bucket_size(m))
                .collect::<Vec<_>>()
        );
        Ok(ModelSwitch {
            indicator,
            partition,
        })
    }

    pub fn model_count(&self) -> usize {
        self.indicator.model_count()
    }
}

impl<D: PseudoPrior> Proposable for ModelSwitch<D> {
    fn propose<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<Proposal> {
        let model_count = self.indicator.model_count();
        let current = self.indicator.get();
        let next = loop {
            let candidate = rng.random_range(0..model_count);
            if candidate != current {
                break candidate;
            }
        };

        let mut delta = StateDelta::default();
        let previous = self.indicator.replace(next)?;
        delta.record_indicator(&self.indicator, previous);

        let abandoned: f64 = self
            .partition
            .bucket(current)
            .iter()
            .map(|item| item.pseudo_prior.log_density(item.param.get()))
            .sum();

        let mut proposed = 0f64;
        for item in self.partition.bucket(next) {
            let value = item.pseudo_prior.sample(rng);
            let old = item.param.replace(value);
            delta.record_parameter(&item.param, old);
            proposed += item.pseudo_prior.log_density(value);
        }

        let log_hastings_ratio = abandoned - proposed;
        trace!(
            "switch model {} -> {}, log HR {}",
            current,
            next,
            log_hastings_ratio
        );
        Ok(Proposal {
            log_hastings_ratio,
            delta,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn params(values: &[f64]) -> Vec<Parameter> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| Parameter::new(format!("p{}", i), v))
            .collect()
    }

    fn gamma_settings(n: usize) -> SwitchSettings {
        SwitchSettings {
            shapes: (0..n).map(|i| 1. + i as f64).collect(),
            means: (0..n).map(|i| 0.5 + 0.5 * i as f64).collect(),
        }
    }

    #[test]
    fn construction_checks_each_invariant() {
        let single = ModelIndicator::new(0, 1).unwrap();
        let err = ModelSwitch::new(single, params(&[1.]), &[0], gamma_settings(1)).unwrap_err();
        assert_eq!(err, ConfigError::TooFewModels { found: 1 });

        let indicator = ModelIndicator::new(0, 2).unwrap();
        let err = ModelSwitch::new(
            indicator.clone(),
            params(&[1., 2.]),
            &[0],
            gamma_settings(2),
        )
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::DimensionMismatch {
                what: "parameter model indices",
                expected: 2,
                actual: 1
            }
        );

        let mut bad_shapes = gamma_settings(2);
        bad_shapes.shapes.pop();
        let err = ModelSwitch::new(indicator.clone(), params(&[1., 2.]), &[0, 1], bad_shapes)
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::DimensionMismatch {
                what: "pseudo-prior shapes",
                expected: 2,
                actual: 1
            }
        );

        let mut bad_means = gamma_settings(2);
        bad_means.means.push(1.);
        let err = ModelSwitch::new(indicator.clone(), params(&[1., 2.]), &[0, 1], bad_means)
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::DimensionMismatch {
                what: "pseudo-prior means",
                expected: 2,
                actual: 3
            }
        );

        let err = ModelSwitch::new(
            indicator.clone(),
            params(&[1., 2.]),
            &[0, 3],
            gamma_settings(2),
        )
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::ModelIndexOutOfRange {
                position: 1,
                index: 3,
                model_count: 2
            }
        );

        let mut bad_density = gamma_settings(2);
        bad_density.shapes[0] = 0.;
        let err = ModelSwitch::new(indicator.clone(), params(&[1., 2.]), &[0, 1], bad_density)
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidDensity { .. }));

        let priors = vec![GammaProposal::from_shape_mean(2., 1.).unwrap()];
        let err =
            ModelSwitch::with_pseudo_priors(indicator, params(&[1., 2.]), &[0, 1], priors)
                .unwrap_err();
        assert_eq!(
            err,
            ConfigError::DimensionMismatch {
                what: "pseudo-priors",
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn switches_to_the_other_model_and_redraws_its_parameters() {
        let indicator = ModelIndicator::new(0, 2).unwrap();
        let ps = params(&[1., 2., 3.]);
        let settings = SwitchSettings {
            shapes: vec![2., 3., 4.],
            means: vec![1., 2., 3.],
        };
        let mut op =
            ModelSwitch::new(indicator.clone(), ps.clone(), &[0, 1, 0], settings).unwrap();

        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let proposal = op.propose(&mut rng).unwrap();

        assert_eq!(indicator.get(), 1);
        assert_eq!(ps[0].get(), 1.);
        assert_eq!(ps[2].get(), 3.);
        let new = ps[1].get();
        assert!(new > 0. && new != 2.);

        assert_eq!(proposal.delta.previous_model(), Some(0));
        let changed: Vec<_> = proposal.delta.changed_parameters().collect();
        assert_eq!(changed.len(), 1);
        assert!(changed[0].0.ptr_eq(&ps[1]));
        assert_eq!(changed[0].1, 2.);

        let q0 = GammaProposal::from_shape_mean(2., 1.).unwrap();
        let q1 = GammaProposal::from_shape_mean(3., 2.).unwrap();
        let q2 = GammaProposal::from_shape_mean(4., 3.).unwrap();
        let expected = q0.log_density(1.) + q2.log_density(3.) - q1.log_density(new);
        assert_relative_eq!(proposal.log_hastings_ratio, expected, epsilon = 1e-12);

        proposal.reject();
        assert_eq!(indicator.get(), 0);
        assert_eq!(ps[1].get(), 2.);
    }

    #[test]
    fn hastings_ratio_replays_from_the_same_stream() {
        let indicator = ModelIndicator::new(2, 3).unwrap();
        let values = [0.4, 1.3, 2.2, 0.9, 1.7, 0.6];
        let tags = [2, 0, 1, 2, 0, 0];
        let ps = params(&values);
        let settings = gamma_settings(values.len());
        let priors: Vec<GammaProposal> = izip!(&settings.shapes, &settings.means)
            .map(|(&k, &mean)| GammaProposal::from_shape_mean(k, mean).unwrap())
            .collect();
        let mut op = ModelSwitch::new(indicator.clone(), ps.clone(), &tags, settings).unwrap();

        let mut rng = ChaCha8Rng::seed_from_u64(2024);
        let mut replay = rng.clone();
        let proposal = op.propose(&mut rng).unwrap();

        let next = loop {
            let m = replay.random_range(0..3);
            if m != 2 {
                break m;
            }
        };
        assert_eq!(indicator.get(), next);

        let mut expected = 0f64;
        for i in (0..values.len()).filter(|&i| tags[i] == 2) {
            expected += priors[i].log_density(values[i]);
        }
        let mut drawn = 0f64;
        for i in (0..values.len()).filter(|&i| tags[i] == next) {
            let value = priors[i].sample(&mut replay);
            assert_eq!(ps[i].get(), value);
            drawn += priors[i].log_density(value);
        }
        expected -= drawn;
        assert_relative_eq!(proposal.log_hastings_ratio, expected, epsilon = 1e-12);

        // Parameters of the deactivated model keep their values.
        for i in (0..values.len()).filter(|&i| tags[i] == 2) {
            assert_eq!(ps[i].get(), values[i]);
        }
    }

    #[test]
    fn never_stays_and_targets_other_models_uniformly() {
        let indicator = ModelIndicator::new(1, 4).unwrap();
        let ps = params(&[1., 1., 1., 1.]);
        let mut op =
            ModelSwitch::new(indicator.clone(), ps, &[0, 1, 2, 3], gamma_settings(4)).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(99);

        let draws = 12_000;
        let mut counts = [0usize; 4];
        for _ in 0..draws {
            let proposal = op.propose(&mut rng).unwrap();
            counts[indicator.get()] += 1;
            proposal.reject();
        }
        assert_eq!(counts[1], 0);
        for m in [0, 2, 3] {
            let expected = draws / 3;
            assert!(
                counts[m].abs_diff(expected) < 300,
                "model {} chosen {} times",
                m,
                counts[m]
            );
        }
    }

    #[test]
    fn third_model_is_untouched() {
        let indicator = ModelIndicator::new(0, 3).unwrap();
        let ps = params(&[1., 2., 3.]);
        let mut op =
            ModelSwitch::new(indicator.clone(), ps.clone(), &[0, 1, 2], gamma_settings(3))
                .unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(17);
        for _ in 0..20 {
            let before: Vec<f64> = ps.iter().map(Parameter::get).collect();
            let current = indicator.get();
            let proposal = op.propose(&mut rng).unwrap();
            let next = indicator.get();
            assert!(next != current);
            for m in 0..3 {
                if m != next {
                    assert_eq!(ps[m].get(), before[m]);
                }
            }
            assert_eq!(proposal.delta.changed_parameters().count(), 1);
        }
    }

    #[test]
    fn models_without_parameters_can_be_switched_to() {
        let indicator = ModelIndicator::new(0, 2).unwrap();
        let ps = params(&[1.5]);
        let q = GammaProposal::from_shape_mean(2., 1.).unwrap();
        let mut op =
            ModelSwitch::with_pseudo_priors(indicator.clone(), ps.clone(), &[0], vec![q.clone()])
                .unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let proposal = op.propose(&mut rng).unwrap();
        assert_eq!(indicator.get(), 1);
        assert_eq!(ps[0].get(), 1.5);
        assert_relative_eq!(proposal.log_hastings_ratio, q.log_density(1.5));
        assert_eq!(proposal.delta.changed_parameters().count(), 0);
    }
}
