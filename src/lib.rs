//! Repeated k-fold cross-validation of machine learning models.
//!
//! A `GenericDataset` owns its instances and keeps an `AccessView` over them: a shuffle-able
//! full order that can be split into folds (plain or stratified) or a percent test slice. The
//! `CrossValidation` runner drives a `Model` through init/train/test cycles over those folds
//! and aggregates the measures into means and standard deviations.
//!
//! ```
//! use crossval::baseline::NaiveLinearRegression;
//! use crossval::prelude::*;
//!
//! let mut data: VectorDataset = (0..20)
//!     .map(|i| {
//!         let x = i as f64;
//!         Instance::new(format!("{}", i), vec![x], vec![3.0 * x - 1.0])
//!     })
//!     .collect();
//! let mut model = NaiveLinearRegression::new();
//!
//! let mut cv = CrossValidation::new();
//! cv.set_parameters(Parameters::from_pairs(vec!["cv-folds=4", "cv-times=2"]).unwrap())
//!     .unwrap();
//! cv.bind_dataset(&mut data);
//! cv.bind_model(&mut model);
//!
//! let report = cv.start().unwrap();
//! assert_eq!(report.completed_steps, 8);
//! assert!(report.metrics["test-rmse"].mean < 1e-6);
//! ```

#[macro_use]
extern crate log;
#[macro_use]
extern crate serde_derive;

pub mod baseline;
pub mod dataset;
mod error;
mod measure_accumulator;
mod model;
mod output;
mod procedures;
mod results;

pub use crate::dataset::{Dataset, GenericDataset, Instance, VectorDataset};
pub use crate::error::{Error, Result};
pub use crate::measure_accumulator::{
    MeanAbsoluteError, MeasureAccumulator, PredictiveAccuracy, RootMeanSquaredError,
};
pub use crate::model::{Measures, Model, Prediction};
pub use crate::output::PredictionFile;
pub use crate::procedures::{CrossValidation, Event, FailPolicy, Observer, Parameters, RunState};
pub use crate::results::{Report, ResultAccumulator, Summaries, Summary};

pub mod prelude {
    pub use crate::dataset::{Dataset, Instance, VectorDataset};
    pub use crate::measure_accumulator::MeasureAccumulator;
    pub use crate::model::Model;
    pub use crate::procedures::{CrossValidation, Event, Parameters};
}
