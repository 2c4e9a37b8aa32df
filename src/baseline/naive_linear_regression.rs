//! Implementation of a Naive Linear Regression model

use std::f64;
use std::iter::FromIterator;

use crate::dataset::{Dataset, Instance, VectorDataset};
use crate::error::{Error, Result};
use crate::measure_accumulator::{evaluate, MeasureAccumulator, RootMeanSquaredError};
use crate::model::{Measures, Model, Prediction};

/// A Naive Linear Regression model
///
/// This is univariate regression on a single feature. During training the best feature is selected.
/// The model can be trained by consuming an iterator over the training data:
/// ```
/// # use crossval::baseline::NaiveLinearRegression;
/// let data = vec![(vec![1.0, 0.0], 2.0), (vec![2.0, 0.0], 4.0)];
/// let model: NaiveLinearRegression = data
///     .iter()
///     .map(|(x, y)| (x, y))
///     .collect();
/// assert_eq!(model.predict(&[3.0, 0.0]), Some(6.0));
/// ```
/// or cross-validated as a `Model` over a `VectorDataset`, predicting the first output.
#[derive(Debug, Default)]
pub struct NaiveLinearRegression {
    fit: Option<Fit>,
    n_features: usize,
}

#[derive(Debug, Copy, Clone)]
struct Fit {
    slope: f64,
    intercept: f64,
    feature: usize,
}

impl<'a, J> FromIterator<(J, &'a f64)> for NaiveLinearRegression
where
    J: IntoIterator<Item = &'a f64>,
{
    fn from_iter<I: IntoIterator<Item = (J, &'a f64)>>(iter: I) -> Self {
        let mut feature_columns: Vec<Vec<f64>> = Vec::new();
        let mut target_column = Vec::new();

        for (x, &y) in iter {
            target_column.push(y);
            for (i, &xi) in x.into_iter().enumerate() {
                if i >= feature_columns.len() {
                    feature_columns.push(Vec::new());
                }

                feature_columns[i].push(xi);
            }
        }

        NaiveLinearRegression {
            n_features: feature_columns.len(),
            fit: best_fit(&feature_columns, &target_column),
        }
    }
}

/// Select the feature whose least squares line has the smallest error. `None` if no feature
/// has any variance.
fn best_fit(feature_columns: &[Vec<f64>], target_column: &[f64]) -> Option<Fit> {
    if target_column.is_empty() {
        return None;
    }

    let y_mean = target_column.iter().sum::<f64>() / target_column.len() as f64;

    let mut best_err = f64::INFINITY;
    let mut best = None;

    for (i, feature) in feature_columns.iter().enumerate() {
        let x_mean = feature.iter().sum::<f64>() / feature.len() as f64;

        let mut x_var = 0.0;
        let mut covar = 0.0;
        for (x, y) in feature.iter().zip(target_column.iter()) {
            let x = *x - x_mean;
            let y = *y - y_mean;

            x_var += x * x;
            covar += x * y;
        }

        if x_var == 0.0 {
            continue;
        }

        let slope = covar / x_var;
        let intercept = y_mean - slope * x_mean;

        let err: f64 = feature
            .iter()
            .zip(target_column.iter())
            .map(|(&x, &y)| intercept + slope * x - y)
            .map(|r| r * r)
            .sum();

        if err < best_err {
            best_err = err;
            best = Some(Fit {
                slope,
                intercept,
                feature: i,
            });
        }
    }

    best
}

impl NaiveLinearRegression {
    pub fn new() -> Self {
        NaiveLinearRegression::default()
    }

    /// predict target value for a single feature vector; `None` before training
    pub fn predict(&self, x: &[f64]) -> Option<f64> {
        self.fit
            .map(|fit| fit.intercept + x[fit.feature] * fit.slope)
    }

    /// index of the feature selected during training
    pub fn feature(&self) -> Option<usize> {
        self.fit.map(|fit| fit.feature)
    }

    fn rmse<'a, I>(&self, instances: I) -> f64
    where
        I: Iterator<Item = &'a Instance<Vec<f64>>>,
    {
        let m: RootMeanSquaredError<f64> = evaluate(instances.filter_map(|inst| {
            self.predict(&inst.input).map(|pred| (inst.output[0], pred))
        }));
        m.result()
    }
}

impl Model<VectorDataset> for NaiveLinearRegression {
    fn bind_training_set(&mut self, data: &VectorDataset) -> Result<()> {
        if data.tr_set_size() < 2 {
            return Err(Error::IncompatibleBinding(format!(
                "linear regression needs at least 2 training instances, got {}",
                data.tr_set_size()
            )));
        }
        if data.output_size() != 1 {
            return Err(Error::IncompatibleBinding(format!(
                "linear regression predicts one output, dataset has {}",
                data.output_size()
            )));
        }
        self.n_features = data.at(0).input.len();
        Ok(())
    }

    fn init(&mut self, _data: &VectorDataset) -> Result<()> {
        if self.n_features == 0 {
            return Err(Error::NotInitializable(
                "no input features in the bound training set".to_owned(),
            ));
        }
        self.fit = None;
        Ok(())
    }

    fn train(&mut self, data: &VectorDataset) -> Result<()> {
        let trained: NaiveLinearRegression = data
            .training_set()
            .map(|inst| (&inst.input, &inst.output[0]))
            .collect();

        match trained.fit {
            None => Err(Error::TrainingError(
                "no feature varies over the training set".to_owned(),
            )),
            Some(fit) => {
                debug!(
                    "selected feature {} (slope {}, intercept {})",
                    fit.feature, fit.slope, fit.intercept
                );
                self.fit = Some(fit);
                Ok(())
            }
        }
    }

    fn is_trained(&self) -> bool {
        self.fit.is_some()
    }

    fn test(&self, data: &VectorDataset) -> Result<Measures> {
        if !self.is_trained() {
            return Err(Error::TrainingError("model is not trained".to_owned()));
        }

        let mut measures = Measures::new();
        measures.insert("train-rmse".to_owned(), self.rmse(data.training_set()));
        if data.test_fold_size() > 0 {
            measures.insert("test-rmse".to_owned(), self.rmse(data.test_set()));
        }
        Ok(measures)
    }

    fn test_on(&self, testset: &VectorDataset) -> Result<Measures> {
        let fit = match self.fit {
            Some(fit) => fit,
            None => return Err(Error::TrainingError("model is not trained".to_owned())),
        };

        if let Some(inst) = testset
            .iter()
            .find(|inst| inst.input.len() <= fit.feature || inst.output.is_empty())
        {
            return Err(Error::IncompatibleBinding(format!(
                "test instance '{}' lacks feature {} or a target output",
                inst.id, fit.feature
            )));
        }

        let mut measures = Measures::new();
        measures.insert("rmse".to_owned(), self.rmse(testset.iter()));
        Ok(measures)
    }

    fn predictions(&self, data: &VectorDataset) -> Result<Vec<Prediction>> {
        Ok(data
            .test_set()
            .filter_map(|inst| {
                self.predict(&inst.input).map(|pred| Prediction {
                    id: inst.id.clone(),
                    expected: inst.output.clone(),
                    predicted: vec![pred],
                })
            })
            .collect())
    }
}

#[test]
fn nlr_flat() {
    let data = vec![(vec![1.0, 2.0], 3.0),
                    (vec![2.0, 1.0], 3.0),
                    (vec![1.0, 5.0], 3.0),
                    (vec![2.0, 6.0], 3.0)];

    let nlr: NaiveLinearRegression = data
        .iter()
        .map(|(x, y)| (x, y))
        .collect();

    assert_eq!(nlr.predict(&[1.5, 1.5]), Some(3.0));
    assert_eq!(nlr.predict(&[5.5, 1.5]), Some(3.0));
    assert_eq!(nlr.predict(&[1.5, 5.5]), Some(3.0));
    assert_eq!(nlr.predict(&[5.5, 5.5]), Some(3.0));
}

#[test]
fn nlr_slope() {
    let data = vec![(vec![1.0, 2.0], 8.0),
                    (vec![2.0, 1.0], 9.0),
                    (vec![1.0, 5.0], 5.0),
                    (vec![2.0, 6.0], 4.0)];

    let nlr: NaiveLinearRegression = data
        .iter()
        .map(|(x, y)| (x, y))
        .collect();

    assert_eq!(nlr.feature(), Some(1));
    assert_eq!(nlr.predict(&[1.5, 1.5]), Some(8.5));
    assert_eq!(nlr.predict(&[5.5, 1.5]), Some(8.5));
    assert_eq!(nlr.predict(&[1.5, 5.5]), Some(4.5));
    assert_eq!(nlr.predict(&[5.5, 5.5]), Some(4.5));
}

#[test]
fn nlr_model_on_folds() {
    let mut data: VectorDataset = (0..10)
        .map(|i| {
            let x = i as f64;
            Instance::new(format!("{}", i), vec![0.0, x], vec![2.0 * x + 1.0])
        })
        .collect();
    data.split_in_folds(5).unwrap();
    data.set_test_fold(1).unwrap();

    let mut model = NaiveLinearRegression::new();
    model.bind_training_set(&data).unwrap();
    model.init(&data).unwrap();
    assert!(!model.is_trained());
    model.train(&data).unwrap();
    assert!(model.is_trained());

    let measures = model.test(&data).unwrap();
    assert!(measures["train-rmse"] < 1e-9);
    assert!(measures["test-rmse"] < 1e-9);

    let predictions = model.predictions(&data).unwrap();
    let ids: Vec<&str> = predictions.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["2", "3"]);
    assert!((predictions[0].predicted[0] - 5.0).abs() < 1e-9);
}

#[test]
fn nlr_constant_features_fail_training() {
    let data: VectorDataset = (0..4)
        .map(|i| Instance::new(format!("{}", i), vec![1.0], vec![i as f64]))
        .collect();

    let mut model = NaiveLinearRegression::new();
    model.bind_training_set(&data).unwrap();
    model.init(&data).unwrap();
    match model.train(&data) {
        Err(Error::TrainingError(_)) => {}
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn nlr_rejects_incompatible_test_set() {
    let data: VectorDataset = (0..4)
        .map(|i| Instance::new(format!("{}", i), vec![0.0, i as f64], vec![i as f64]))
        .collect();

    let mut model = NaiveLinearRegression::new();
    model.bind_training_set(&data).unwrap();
    model.init(&data).unwrap();
    model.train(&data).unwrap();
    assert_eq!(model.feature(), Some(1));

    let narrow: VectorDataset = vec![Instance::new("n".to_owned(), vec![1.0], vec![1.0])]
        .into_iter()
        .collect();
    match model.test_on(&narrow) {
        Err(Error::IncompatibleBinding(_)) => {}
        other => panic!("unexpected {:?}", other),
    }

    let unlabeled: VectorDataset = vec![Instance::new("u".to_owned(), vec![1.0, 1.0], vec![])]
        .into_iter()
        .collect();
    match model.test_on(&unlabeled) {
        Err(Error::IncompatibleBinding(_)) => {}
        other => panic!("unexpected {:?}", other),
    }
}
