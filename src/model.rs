//! The contract a model must fulfill to be cross-validated.

use std::collections::BTreeMap;

use crate::error::Result;

/// Numeric results keyed by metric name, e.g. `"test-rmse"`
pub type Measures = BTreeMap<String, f64>;

/// Model output for one test instance
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub id: String,
    pub expected: Vec<f64>,
    pub predicted: Vec<f64>,
}

/// A trainable model operating on datasets of type `D`.
///
/// The cross-validation runner calls, for every step, `bind_training_set`, `init`, `train` and
/// finally `test`. The dataset is passed to each call instead of being stored, so the runner
/// can repartition it between steps.
pub trait Model<D: ?Sized> {
    /// Check that the model can work with `data`, and record what it needs to know about it
    /// (such as input and output dimensions).
    ///
    /// Fails with `IncompatibleBinding`.
    fn bind_training_set(&mut self, data: &D) -> Result<()>;

    /// Reset to an untrained state.
    ///
    /// Fails with `NotInitializable` if the parameters don't fit the bound training set.
    fn init(&mut self, data: &D) -> Result<()>;

    /// Train on the training set of `data`.
    ///
    /// Fails with `TrainingError`.
    fn train(&mut self, data: &D) -> Result<()>;

    fn is_trained(&self) -> bool;

    /// Measure performance on the training and test sets of `data`
    fn test(&self, data: &D) -> Result<Measures>;

    /// Measure performance on every instance of an independent test set
    fn test_on(&self, testset: &D) -> Result<Measures>;

    /// Predictions for the test set of `data`, written to the prediction file if one is
    /// configured.
    fn predictions(&self, _data: &D) -> Result<Vec<Prediction>> {
        Ok(Vec::new())
    }
}
