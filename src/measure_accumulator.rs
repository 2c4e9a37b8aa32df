//! Measure accumulators summarize model performance, such as classification accuracy or
//! regression error, over the instances of one test set.

use std::marker::PhantomData;

use num_traits::AsPrimitive;

/// Trait implemented by performance measures
pub trait MeasureAccumulator<T> {
    /// initialize new measure
    fn new() -> Self;

    /// short metric name, used as key in step results
    fn name(&self) -> &'static str;

    /// update with one prediction
    fn update_one(&mut self, known: &T, pred: &T);

    /// get resulting performance; NaN if nothing was accumulated
    fn result(&self) -> f64;

    /// update with multiple predictions
    fn update<I: Iterator<Item = T>>(&mut self, known: I, predicted: I) {
        for (k, p) in known.zip(predicted) {
            self.update_one(&k, &p)
        }
    }
}

/// Evaluate a measure over pairs of `(known, predicted)` values
pub fn evaluate<T, M, I>(pairs: I) -> M
where
    M: MeasureAccumulator<T>,
    I: IntoIterator<Item = (T, T)>,
{
    let mut measure = M::new();
    for (known, pred) in pairs {
        measure.update_one(&known, &pred);
    }
    measure
}

/// Classification Accuracy: relative amount of correctly classified labels
#[derive(Debug)]
pub struct PredictiveAccuracy<T> {
    n_correct: usize,
    n_wrong: usize,
    _t: PhantomData<T>,
}

impl<T> MeasureAccumulator<T> for PredictiveAccuracy<T>
where
    T: PartialEq,
{
    fn new() -> Self {
        PredictiveAccuracy {
            n_correct: 0,
            n_wrong: 0,
            _t: PhantomData,
        }
    }

    fn name(&self) -> &'static str {
        "accuracy"
    }

    fn update_one(&mut self, known: &T, pred: &T) {
        if known == pred {
            self.n_correct += 1;
        } else {
            self.n_wrong += 1;
        }
    }

    fn result(&self) -> f64 {
        self.n_correct as f64 / (self.n_correct + self.n_wrong) as f64
    }
}

/// Root Mean Squared Error
#[derive(Debug)]
pub struct RootMeanSquaredError<T> {
    sum_of_squares: f64,
    n: usize,
    _t: PhantomData<T>,
}

impl<T> MeasureAccumulator<T> for RootMeanSquaredError<T>
where
    T: AsPrimitive<f64>,
{
    fn new() -> Self {
        RootMeanSquaredError {
            sum_of_squares: 0.0,
            n: 0,
            _t: PhantomData,
        }
    }

    fn name(&self) -> &'static str {
        "rmse"
    }

    fn update_one(&mut self, known: &T, pred: &T) {
        let diff = known.as_() - pred.as_();
        self.sum_of_squares += diff * diff;
        self.n += 1;
    }

    fn result(&self) -> f64 {
        (self.sum_of_squares / self.n as f64).sqrt()
    }
}

/// Mean Absolute Error
#[derive(Debug)]
pub struct MeanAbsoluteError<T> {
    sum_of_abs: f64,
    n: usize,
    _t: PhantomData<T>,
}

impl<T> MeasureAccumulator<T> for MeanAbsoluteError<T>
where
    T: AsPrimitive<f64>,
{
    fn new() -> Self {
        MeanAbsoluteError {
            sum_of_abs: 0.0,
            n: 0,
            _t: PhantomData,
        }
    }

    fn name(&self) -> &'static str {
        "mae"
    }

    fn update_one(&mut self, known: &T, pred: &T) {
        self.sum_of_abs += (known.as_() - pred.as_()).abs();
        self.n += 1;
    }

    fn result(&self) -> f64 {
        self.sum_of_abs / self.n as f64
    }
}

#[test]
fn accuracy() {
    let m: PredictiveAccuracy<i64> = evaluate(vec![(1i64, 1i64), (2, 2), (1, 2), (3, 3)]);
    assert_eq!(m.result(), 0.75);
    assert_eq!(m.name(), "accuracy");
}

#[test]
fn rmse_and_mae() {
    let pairs: Vec<(f64, f64)> = vec![(1.0, 2.0), (3.0, 1.0), (0.0, 0.0), (2.0, 2.0)];

    let m: RootMeanSquaredError<f64> = evaluate(pairs.clone());
    assert_eq!(m.result(), (5.0f64 / 4.0).sqrt());

    let m: MeanAbsoluteError<f64> = evaluate(pairs);
    assert_eq!(m.result(), 0.75);
}

#[test]
fn empty_measure_is_nan() {
    let m = <RootMeanSquaredError<f64> as MeasureAccumulator<f64>>::new();
    assert!(m.result().is_nan());

    let m = <PredictiveAccuracy<u8> as MeasureAccumulator<u8>>::new();
    assert!(m.result().is_nan());
}
