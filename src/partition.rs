use indexmap::IndexMap;

use crate::{error::ConfigError, state::Parameter};

/// Grouping of items by the model they belong to.
///
/// Buckets are kept in the order in which their model index first appears
/// in the input, and items keep their relative input order inside each
/// bucket. A partition is built once and is read only afterwards.
#[derive(Debug, Clone)]
pub struct Partition<T = Parameter> {
    buckets: IndexMap<usize, Vec<T>>,
    len: usize,
}

impl<T> Partition<T> {
    /// Sort `items` into buckets according to the parallel list of model indices.
    pub fn build(
        items: impl IntoIterator<Item = T>,
        model_index_of: &[usize],
    ) -> Result<Partition<T>, ConfigError> {
        let items: Vec<T> = items.into_iter().collect();
        if items.len() != model_index_of.len() {
            return Err(ConfigError::DimensionMismatch {
                what: "parameter model indices",
                expected: items.len(),
                actual: model_index_of.len(),
            });
        }

        let len = items.len();
        let mut buckets: IndexMap<usize, Vec<T>> = IndexMap::new();
        for (item, &model) in items.into_iter().zip(model_index_of) {
            buckets.entry(model).or_default().push(item);
        }
        Ok(Partition { buckets, len })
    }

    /// Items tagged with `model`, empty if no item carries that tag.
    pub fn bucket(&self, model: usize) -> &[T] {
        self.buckets.get(&model).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn bucket_size(&self, model: usize) -> usize {
        self.bucket(model).len()
    }

    pub fn distinct_model_count(&self) -> usize {
        self.buckets.len()
    }

    /// Model indices in the order of their first appearance.
    pub fn models(&self) -> impl Iterator<Item = usize> + '_ {
        self.buckets.keys().copied()
    }

    /// Buckets in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &[T])> {
        self.buckets
            .iter()
            .map(|(&model, items)| (model, items.as_slice()))
    }

    /// Total number of items over all buckets.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
