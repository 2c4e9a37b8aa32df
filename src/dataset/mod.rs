//! Datasets: instance storage plus a partitionable access view.

mod access_view;
mod instance_store;
pub(crate) mod partition;

use std::iter::FromIterator;

use crate::error::{Error, Result};

pub use self::access_view::{AccessView, DEFAULT_SEED};
pub use self::instance_store::{Instance, InstanceStore};
pub use self::partition::Partition;

/// Capabilities a dataset must offer to be cross-validated
pub trait Dataset {
    /// total number of instances
    fn size(&self) -> usize;

    /// number of instances in the current training set
    fn tr_set_size(&self) -> usize;

    /// number of instances in the current test fold
    fn test_fold_size(&self) -> usize;

    /// number of folds; 0 if not split into folds
    fn number_of_folds(&self) -> usize;

    fn test_fold(&self) -> usize;

    fn split_in_folds(&mut self, n_folds: usize) -> Result<()>;
    fn split_in_stratified_folds(&mut self, n_folds: usize) -> Result<()>;

    /// Check that every instance carries a class to stratify on
    fn check_stratifiable(&self) -> Result<()> {
        Ok(())
    }

    fn split_test_fold_percent(&mut self, percent: u32) -> Result<()>;
    fn set_test_fold(&mut self, k: usize) -> Result<()>;

    fn random_shuffle_dataset(&mut self);
    fn random_shuffle_training_set(&mut self);
    fn set_random_number_generator_seed(&mut self, seed: u64);

    fn merge(&mut self);
    fn restore(&mut self);

    /// storage indices of the training set, in iteration order
    fn training_indices(&self) -> &[usize];

    /// storage indices of the test set, in iteration order
    fn test_indices(&self) -> &[usize];
}

/// A dataset of instances with input representation `I`
#[derive(Debug, Clone)]
pub struct GenericDataset<I> {
    store: InstanceStore<I>,
    view: AccessView,
}

/// Dataset of real-valued feature vectors
pub type VectorDataset = GenericDataset<Vec<f64>>;

impl<I> GenericDataset<I> {
    pub fn new() -> Self {
        GenericDataset {
            store: InstanceStore::new(),
            view: AccessView::new(0),
        }
    }

    /// Append an instance. Any partition is dropped.
    pub fn push_back(&mut self, instance: Instance<I>) {
        self.store.push_back(instance);
        self.view.grow();
    }

    /// Instance at storage position `i`
    ///
    /// # Panics
    /// Panics if `i` is out of range.
    pub fn at(&self, i: usize) -> &Instance<I> {
        self.store.at(i)
    }

    /// Replace the instance at storage position `i`. Partitions are not affected.
    pub fn replace(&mut self, i: usize, instance: Instance<I>) -> Instance<I> {
        self.store.replace(i, instance)
    }

    /// Drop all instances
    pub fn clear(&mut self) {
        self.store.clear();
        self.view.reset();
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn view(&self) -> &AccessView {
        &self.view
    }

    pub fn store(&self) -> &InstanceStore<I> {
        &self.store
    }

    /// Iterate over all instances in the current full order
    pub fn iter(&self) -> impl Iterator<Item = &Instance<I>> {
        self.select(self.view.full_order())
    }

    /// Iterate over the training set
    pub fn training_set(&self) -> impl Iterator<Item = &Instance<I>> {
        self.select(self.view.training_indices())
    }

    /// Iterate over the test set
    pub fn test_set(&self) -> impl Iterator<Item = &Instance<I>> {
        self.select(self.view.test_indices())
    }

    /// Dimension of the output vectors, taken from the first instance
    pub fn output_size(&self) -> usize {
        self.store.get(0).map_or(0, |inst| inst.output.len())
    }

    fn select<'a>(&'a self, indices: &'a [usize]) -> impl Iterator<Item = &'a Instance<I>> {
        indices.iter().map(move |&i| self.store.at(i))
    }
}

impl<I: Clone> GenericDataset<I> {
    /// Deep copy of the current training set as a new, merged dataset
    pub fn clone_training_set(&self) -> Self {
        self.training_set().cloned().collect()
    }

    /// Deep copy of the current test set as a new, merged dataset
    pub fn clone_test_set(&self) -> Self {
        self.test_set().cloned().collect()
    }
}

impl VectorDataset {
    /// Load an all-numeric ARFF relation. The last `n_outputs` attributes are the outputs and
    /// instances are named by their row number.
    pub fn from_arff(input: &str, n_outputs: usize) -> Result<Self> {
        let rows: Vec<Vec<f64>> = arff::from_str(input)?;

        let mut dataset = GenericDataset::new();
        for (i, mut row) in rows.into_iter().enumerate() {
            if row.len() < n_outputs {
                return Err(Error::InvalidArgument(format!(
                    "row {} has {} attributes, expected at least {} outputs",
                    i,
                    row.len(),
                    n_outputs
                )));
            }
            let output = row.split_off(row.len() - n_outputs);
            dataset.push_back(Instance::new(i.to_string(), row, output));
        }

        info!("loaded {} instances from ARFF", dataset.size());
        Ok(dataset)
    }
}

impl<I> Default for GenericDataset<I> {
    fn default() -> Self {
        GenericDataset::new()
    }
}

impl<I> FromIterator<Instance<I>> for GenericDataset<I> {
    fn from_iter<T: IntoIterator<Item = Instance<I>>>(iter: T) -> Self {
        let mut store = InstanceStore::new();
        store.extend(iter);
        let view = AccessView::new(store.size());
        GenericDataset { store, view }
    }
}

impl<I> Dataset for GenericDataset<I> {
    fn size(&self) -> usize {
        self.store.size()
    }

    fn tr_set_size(&self) -> usize {
        self.view.training_indices().len()
    }

    fn test_fold_size(&self) -> usize {
        self.view.test_indices().len()
    }

    fn number_of_folds(&self) -> usize {
        self.view.number_of_folds()
    }

    fn test_fold(&self) -> usize {
        self.view.test_fold()
    }

    fn split_in_folds(&mut self, n_folds: usize) -> Result<()> {
        self.view.split_in_folds(n_folds)
    }

    /// Stratifies on the first output value, read as a discrete class label. Continuous
    /// outputs give one class per instance and therefore degenerate folds.
    fn split_in_stratified_folds(&mut self, n_folds: usize) -> Result<()> {
        if n_folds > 1 {
            self.check_stratifiable()?;
        }

        let store = &self.store;
        self.view
            .split_in_stratified_folds(n_folds, |i| class_key(store.at(i).output[0]))
    }

    fn check_stratifiable(&self) -> Result<()> {
        match self.store.iter().find(|inst| inst.output.is_empty()) {
            Some(inst) => Err(Error::InvalidArgument(format!(
                "instance '{}' has no output to stratify on",
                inst.id
            ))),
            None => Ok(()),
        }
    }

    fn split_test_fold_percent(&mut self, percent: u32) -> Result<()> {
        self.view.split_test_fold_percent(percent)
    }

    fn set_test_fold(&mut self, k: usize) -> Result<()> {
        self.view.set_test_fold(k)
    }

    fn random_shuffle_dataset(&mut self) {
        self.view.random_shuffle_dataset()
    }

    fn random_shuffle_training_set(&mut self) {
        self.view.random_shuffle_training_set()
    }

    fn set_random_number_generator_seed(&mut self, seed: u64) {
        self.view.set_random_number_generator_seed(seed)
    }

    fn merge(&mut self) {
        self.view.merge()
    }

    fn restore(&mut self) {
        self.view.restore()
    }

    fn training_indices(&self) -> &[usize] {
        self.view.training_indices()
    }

    fn test_indices(&self) -> &[usize] {
        self.view.test_indices()
    }
}

/// Bitwise class key of an output value. `0.0` and `-0.0` are the same class.
fn class_key(x: f64) -> u64 {
    if x == 0.0 {
        0
    } else {
        x.to_bits()
    }
}
