use std::cmp::Ordering;
use std::collections::HashMap;
use std::f64;
use std::fmt;
use std::hash::Hash;
use std::iter::FromIterator;

use crate::dataset::{Dataset, Instance, VectorDataset};
use crate::error::{Error, Result};
use crate::measure_accumulator::{evaluate, MeasureAccumulator, PredictiveAccuracy};
use crate::model::{Measures, Model, Prediction};

/// smallest variance of a feature distribution, keeps constant features from producing NaN
const MIN_VARIANCE: f64 = 1e-9;

/// Gaussian naive Bayes classifier.
///
/// As a `Model` over a `VectorDataset` the class of an instance is its first output, rounded to
/// an integer.
#[derive(Debug)]
pub struct NaiveBayesClassifier<C>
where
    C: Eq + Hash,
{
    class_distributions: HashMap<C, FeatureDistribution>,
}

#[derive(Debug, Clone)]
struct FeatureDistribution {
    distributions: Vec<UniformNormalDistribution>
}

#[derive(Copy, Clone)]
struct UniformNormalDistribution {
    sum: f64,
    sqsum: f64,
    n: usize
}

impl<C, J> FromIterator<(J, C)> for NaiveBayesClassifier<C>
where
    J: IntoIterator<Item=f64>,
    C: Eq + Hash,
{
    fn from_iter<I: IntoIterator<Item=(J, C)>>(iter: I) -> Self {
        let mut class_distributions = HashMap::new();

        for (x, y) in iter {
            let distributions = &mut class_distributions
                .entry(y)
                .or_insert_with(FeatureDistribution::new)
                .distributions;

            for (i, xi) in x.into_iter().enumerate() {
                if i >= distributions.len() {
                    distributions.resize(1 + i, UniformNormalDistribution::new());
                }

                distributions[i].update(xi);
            }
        }

        NaiveBayesClassifier {
            class_distributions
        }
    }
}

impl<C> NaiveBayesClassifier<C>
where
    C: Eq + Hash,
{
    pub fn new() -> Self {
        NaiveBayesClassifier {
            class_distributions: HashMap::new(),
        }
    }

    /// most probable class of `x`; `None` if no class is known
    pub fn predict(&self, x: &[f64]) -> Option<&C> {
        self.class_distributions
            .iter()
            .map(|(c, dists)| {
                let mut lnprob = 0.0;
                for (&xi, dist) in x.iter().zip(dists.distributions.iter()) {
                    lnprob += dist.lnprob(xi);
                }
                (c, lnprob)
            })
            .max_by(|(_, lnp1), (_, lnp2)| {
                lnp1.partial_cmp(lnp2).unwrap_or(Ordering::Equal)
            })
            .map(|(c, _)| c)
    }

    pub fn n_classes(&self) -> usize {
        self.class_distributions.len()
    }
}

impl<C> Default for NaiveBayesClassifier<C>
where
    C: Eq + Hash,
{
    fn default() -> Self {
        NaiveBayesClassifier::new()
    }
}

/// class label of an instance
fn class_of(inst: &Instance<Vec<f64>>) -> i64 {
    inst.output[0].round() as i64
}

impl NaiveBayesClassifier<i64> {
    fn accuracy<'a, I>(&self, instances: I) -> f64
    where
        I: Iterator<Item = &'a Instance<Vec<f64>>>,
    {
        let m: PredictiveAccuracy<i64> = evaluate(instances.filter_map(|inst| {
            self.predict(&inst.input).map(|&c| (class_of(inst), c))
        }));
        m.result()
    }
}

impl Model<VectorDataset> for NaiveBayesClassifier<i64> {
    fn bind_training_set(&mut self, data: &VectorDataset) -> Result<()> {
        if data.tr_set_size() == 0 {
            return Err(Error::IncompatibleBinding("empty training set".to_owned()));
        }
        if data.output_size() == 0 {
            return Err(Error::IncompatibleBinding(
                "classifier needs a class label output".to_owned(),
            ));
        }
        Ok(())
    }

    fn init(&mut self, _data: &VectorDataset) -> Result<()> {
        self.class_distributions.clear();
        Ok(())
    }

    fn train(&mut self, data: &VectorDataset) -> Result<()> {
        let trained: NaiveBayesClassifier<i64> = data
            .training_set()
            .map(|inst| (inst.input.iter().cloned(), class_of(inst)))
            .collect();

        if trained.n_classes() == 0 {
            return Err(Error::TrainingError("no training instances".to_owned()));
        }

        debug!("trained naive Bayes on {} classes", trained.n_classes());
        self.class_distributions = trained.class_distributions;
        Ok(())
    }

    fn is_trained(&self) -> bool {
        !self.class_distributions.is_empty()
    }

    fn test(&self, data: &VectorDataset) -> Result<Measures> {
        if !self.is_trained() {
            return Err(Error::TrainingError("model is not trained".to_owned()));
        }

        let mut measures = Measures::new();
        measures.insert("train-accuracy".to_owned(), self.accuracy(data.training_set()));
        if data.test_fold_size() > 0 {
            measures.insert("test-accuracy".to_owned(), self.accuracy(data.test_set()));
        }
        Ok(measures)
    }

    fn test_on(&self, testset: &VectorDataset) -> Result<Measures> {
        if !self.is_trained() {
            return Err(Error::TrainingError("model is not trained".to_owned()));
        }
        if let Some(inst) = testset.iter().find(|inst| inst.output.is_empty()) {
            return Err(Error::IncompatibleBinding(format!(
                "test instance '{}' has no class label",
                inst.id
            )));
        }

        let mut measures = Measures::new();
        measures.insert("accuracy".to_owned(), self.accuracy(testset.iter()));
        Ok(measures)
    }

    fn predictions(&self, data: &VectorDataset) -> Result<Vec<Prediction>> {
        Ok(data
            .test_set()
            .filter_map(|inst| {
                self.predict(&inst.input).map(|&c| Prediction {
                    id: inst.id.clone(),
                    expected: inst.output.clone(),
                    predicted: vec![c as f64],
                })
            })
            .collect())
    }
}

impl FeatureDistribution {
    fn new() -> Self {
        FeatureDistribution {
            distributions: Vec::new()
        }
    }
}

impl UniformNormalDistribution {
    fn new() -> Self {
        UniformNormalDistribution {
            sum: 0.0,
            sqsum: 0.0,
            n: 0
        }
    }

    fn update(&mut self, x: f64) {
        self.sum += x;
        self.sqsum += x * x;
        self.n += 1;
    }

    fn mean(&self) -> f64 {
        self.sum / self.n as f64
    }

    fn variance(&self) -> f64 {
        if self.n < 2 {
            return 1.0;
        }
        let v = (self.sqsum - (self.sum * self.sum) / self.n as f64) / (self.n as f64 - 1.0);
        v.max(MIN_VARIANCE)
    }

    fn lnprob(&self, x: f64) -> f64 {
        let v = self.variance();
        let xm = x - self.mean();

        0.5 * ((1.0 / (2.0 * f64::consts::PI * v)).ln() - (xm * xm) / v)

    }
}

impl fmt::Debug for UniformNormalDistribution {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "N{{{}; {}}}", self.mean(), self.variance())
    }
}

#[test]
fn nbc() {
    let data = vec![(vec![1.0, 2.0], 'A'),
                    (vec![2.0, 1.0], 'A'),
                    (vec![1.0, 5.0], 'B'),
                    (vec![2.0, 6.0], 'B')];

    let nbc: NaiveBayesClassifier<_> = data
        .iter()
        .map(|(x, y)| {
            (
                x.iter().map(|xi| *xi),
                *y
            )
        })
        .collect();

    assert_eq!(nbc.predict(&[1.5, 1.5]), Some(&'A'));
    assert_eq!(nbc.predict(&[5.5, 1.5]), Some(&'A'));
    assert_eq!(nbc.predict(&[1.5, 5.5]), Some(&'B'));
    assert_eq!(nbc.predict(&[5.5, 5.5]), Some(&'B'));
}

#[test]
fn nbc_untrained_predicts_nothing() {
    let nbc: NaiveBayesClassifier<u8> = NaiveBayesClassifier::new();
    assert_eq!(nbc.predict(&[1.0]), None);
}

#[test]
fn nbc_model_on_folds() {
    let mut data: VectorDataset = (0..12)
        .map(|i| {
            let class = (i % 2) as f64;
            let x = class * 10.0 + (i / 2) as f64 * 0.1;
            Instance::new(format!("{}", i), vec![x], vec![class])
        })
        .collect();
    data.split_in_stratified_folds(3).unwrap();
    data.set_test_fold(2).unwrap();

    let mut model: NaiveBayesClassifier<i64> = NaiveBayesClassifier::new();
    model.bind_training_set(&data).unwrap();
    model.init(&data).unwrap();
    model.train(&data).unwrap();
    assert!(model.is_trained());

    let measures = model.test(&data).unwrap();
    assert_eq!(measures["train-accuracy"], 1.0);
    assert_eq!(measures["test-accuracy"], 1.0);

    let independent = data.clone_test_set();
    let measures = model.test_on(&independent).unwrap();
    assert_eq!(measures["accuracy"], 1.0);
    assert_eq!(model.predictions(&data).unwrap().len(), 4);
}

#[test]
fn nbc_rejects_unlabeled_test_set() {
    let data: VectorDataset = (0..4)
        .map(|i| Instance::new(format!("{}", i), vec![i as f64], vec![(i % 2) as f64]))
        .collect();

    let mut model: NaiveBayesClassifier<i64> = NaiveBayesClassifier::new();
    model.bind_training_set(&data).unwrap();
    model.init(&data).unwrap();
    model.train(&data).unwrap();

    let unlabeled: VectorDataset = vec![Instance::new("u".to_owned(), vec![1.0], vec![])]
        .into_iter()
        .collect();
    match model.test_on(&unlabeled) {
        Err(Error::IncompatibleBinding(_)) => {}
        other => panic!("unexpected {:?}", other),
    }
}
