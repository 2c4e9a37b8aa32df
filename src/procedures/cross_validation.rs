use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::dataset::Dataset;
use crate::error::{Error, Result};
use crate::model::Model;
use crate::output::PredictionFile;
use crate::results::{Report, ResultAccumulator};

use super::events::{Event, Observer};
use super::parameters::{FailPolicy, Parameters};

/// Where a cross-validation run currently is
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RunState {
    /// not started, or finished successfully
    Idle,
    Running { time: usize, step: usize },
    /// the last run was aborted
    Failed,
}

/// Repeated k-fold cross-validation of a model `M` on a dataset `D`.
///
/// Model, dataset and optional independent test set are borrowed for the lifetime of the
/// runner. `start` repartitions the dataset and retrains the model for every step; results
/// remain available through `results` until the runner is reconfigured.
pub struct CrossValidation<'a, D, M>
where
    D: Dataset,
    M: Model<D>,
{
    params: Parameters,
    dataset: Option<&'a mut D>,
    model: Option<&'a mut M>,
    testset: Option<&'a D>,
    observers: Vec<Box<dyn Observer + 'a>>,
    cancel: Option<Arc<AtomicBool>>,
    results: ResultAccumulator,
    state: RunState,
}

impl<'a, D, M> CrossValidation<'a, D, M>
where
    D: Dataset,
    M: Model<D>,
{
    pub fn new() -> Self {
        CrossValidation {
            params: Parameters::default(),
            dataset: None,
            model: None,
            testset: None,
            observers: Vec::new(),
            cancel: None,
            results: ResultAccumulator::new(),
            state: RunState::Idle,
        }
    }

    /// Replace the parameters. Previous results are discarded.
    pub fn set_parameters(&mut self, params: Parameters) -> Result<()> {
        params.validate()?;
        self.params = params;
        self.results.clear();
        self.state = RunState::Idle;
        Ok(())
    }

    pub fn parameters(&self) -> &Parameters {
        &self.params
    }

    pub fn bind_dataset(&mut self, dataset: &'a mut D) {
        self.dataset = Some(dataset);
    }

    pub fn bind_model(&mut self, model: &'a mut M) {
        self.model = Some(model);
    }

    /// Additionally test every step on an independent test set
    pub fn bind_test_set(&mut self, testset: &'a D) {
        self.testset = Some(testset);
    }

    pub fn add_observer<O: Observer + 'a>(&mut self, observer: O) {
        self.observers.push(Box::new(observer));
    }

    /// The run stops with `Error::Cancelled` at the next step boundary once `flag` is set
    pub fn set_cancel_flag(&mut self, flag: Arc<AtomicBool>) {
        self.cancel = Some(flag);
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn accumulator(&self) -> &ResultAccumulator {
        &self.results
    }

    /// Summary of every step completed so far. After an aborted run this holds the partial
    /// results and is marked as failed.
    pub fn results(&self) -> Report {
        Report {
            folds: self.params.cv_folds,
            steps: self.params.steps(),
            times: self.params.cv_times,
            completed_steps: self.results.n_steps(),
            failed: self.state == RunState::Failed,
            metrics: self.results.current_summary(),
        }
    }

    /// Run the complete cross-validation.
    ///
    /// Configuration problems are reported before the dataset or model is touched. Failures
    /// during the run leave the results collected so far in place.
    pub fn start(&mut self) -> Result<Report> {
        self.check_configuration()?;

        self.results.clear();
        let mut output = match self.params.save_output_file {
            Some(ref path) => Some(PredictionFile::create(path)?),
            None => None,
        };

        info!(
            "Starting {}-fold cross-validation: {} steps x {} times",
            self.params.cv_folds,
            self.params.steps(),
            self.params.cv_times
        );

        match self.run(output.as_mut()) {
            Ok(()) => {
                if let Some(ref mut file) = output {
                    file.flush()?;
                }
                self.results.accumulate_times_results();
                self.state = RunState::Idle;
                let report = self.results();
                info!("Cross-validation finished\n{}", report);
                notify(
                    &mut self.observers,
                    Event::CrossValidationEnd {
                        report: report.clone(),
                    },
                );
                Ok(report)
            }
            Err(e) => {
                error!("Cross-validation aborted: {}", e);
                self.state = RunState::Failed;
                Err(e)
            }
        }
    }

    fn check_configuration(&self) -> Result<()> {
        self.params.validate()?;

        let dataset = match self.dataset {
            Some(ref d) => d,
            None => return Err(Error::IncompatibleBinding("no dataset bound".to_owned())),
        };
        if self.model.is_none() {
            return Err(Error::IncompatibleBinding("no model bound".to_owned()));
        }

        if self.params.cv_folds >= dataset.size() {
            return Err(Error::InvalidArgument(format!(
                "cannot split {} instances into {} folds",
                dataset.size(),
                self.params.cv_folds
            )));
        }
        if self.params.stratified_split {
            dataset.check_stratifiable()?;
        }
        Ok(())
    }

    fn run(&mut self, mut output: Option<&mut PredictionFile>) -> Result<()> {
        let CrossValidation {
            ref params,
            ref mut dataset,
            ref mut model,
            testset,
            ref mut observers,
            ref cancel,
            ref mut results,
            ref mut state,
        } = *self;

        let unbound = || Error::IncompatibleBinding("dataset or model unbound".to_owned());
        let dataset: &mut D = dataset.as_deref_mut().ok_or_else(unbound)?;
        let model: &mut M = model.as_deref_mut().ok_or_else(unbound)?;

        let folds = params.cv_folds;
        let steps = params.steps();

        if let Some(seed) = params.dataset_random_seed {
            dataset.set_random_number_generator_seed(seed);
        }

        *state = RunState::Running { time: 0, step: 0 };
        notify(
            observers,
            Event::Started {
                folds,
                steps,
                times: params.cv_times,
            },
        );

        for time in 0..params.cv_times {
            if time > 0 && params.cv_times_dataset_shuffle {
                debug!("Shuffling dataset before time {}", time);
                dataset.random_shuffle_dataset();
            }

            if params.stratified_split {
                dataset.split_in_stratified_folds(folds)?;
            } else {
                dataset.split_in_folds(folds)?;
            }

            for step in 0..steps {
                if let Some(ref flag) = *cancel {
                    if flag.load(Ordering::SeqCst) {
                        warn!("Cross-validation cancelled before time {} step {}", time, step);
                        return Err(Error::Cancelled);
                    }
                }

                *state = RunState::Running { time, step };
                notify(observers, Event::StepStart { time, step });

                dataset.set_test_fold(step)?;
                if params.shuffle_training_set {
                    dataset.random_shuffle_training_set();
                }
                debug!(
                    "time {} step {}: {} training, {} test instances",
                    time,
                    step,
                    dataset.tr_set_size(),
                    dataset.test_fold_size()
                );

                model.bind_training_set(dataset)?;
                model.init(dataset)?;
                notify(observers, Event::ModelInitialized { time, step });

                train_with_policy(params, model, dataset, observers, time, step)?;

                let mut measures = model.test(dataset)?;
                if let Some(testset) = testset {
                    for (name, value) in model.test_on(testset)? {
                        measures.insert(format!("testset-{}", name), value);
                    }
                }

                results.add_step_results(&measures);
                notify(
                    observers,
                    Event::StepEnd {
                        time,
                        step,
                        results: measures,
                    },
                );

                if let Some(ref mut file) = output {
                    let predictions = model.predictions(dataset)?;
                    file.write_step(time, step, &predictions)?;
                }
            }

            let summary = results.accumulate_steps_results();
            notify(observers, Event::TimeEnd { time, summary });
        }

        Ok(())
    }
}

impl<'a, D, M> Default for CrossValidation<'a, D, M>
where
    D: Dataset,
    M: Model<D>,
{
    fn default() -> Self {
        CrossValidation::new()
    }
}

/// Train the model, handling failures according to the fail policy
fn train_with_policy<D, M>(
    params: &Parameters,
    model: &mut M,
    dataset: &D,
    observers: &mut [Box<dyn Observer + '_>],
    time: usize,
    step: usize,
) -> Result<()>
where
    D: Dataset,
    M: Model<D>,
{
    let max_retries = params.max_retries();
    let mut attempt = 0;

    loop {
        attempt += 1;
        let e = match model.train(dataset) {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };

        warn!(
            "Training failed at time {} step {} (attempt {}): {}",
            time, step, attempt, e
        );
        notify(
            observers,
            Event::TrainingFail {
                time,
                step,
                attempt,
                error: e.to_string(),
            },
        );

        match params.train_fail_behaviour {
            FailPolicy::Stop => return Err(e),
            FailPolicy::Repeat if attempt > max_retries => {
                error!("Giving up after {} retries", max_retries);
                return Err(e);
            }
            FailPolicy::Repeat => {
                model.init(dataset)?;
                notify(observers, Event::ModelInitialized { time, step });
            }
        }
    }
}

fn notify(observers: &mut [Box<dyn Observer + '_>], event: Event) {
    for observer in observers.iter_mut() {
        observer.notify(&event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Instance, VectorDataset};
    use crate::model::Measures;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Predicts the training mean. Can be told to fail training a number of times.
    #[derive(Default)]
    struct MeanModel {
        mean: Option<f64>,
        /// fail the training call with this (0-based) number
        fail_on_call: Option<usize>,
        /// fail this many training calls from now on
        failures_left: usize,
        trainings: usize,
        inits: usize,
    }

    impl Model<VectorDataset> for MeanModel {
        fn bind_training_set(&mut self, data: &VectorDataset) -> Result<()> {
            if data.tr_set_size() == 0 {
                return Err(Error::IncompatibleBinding("empty".to_owned()));
            }
            Ok(())
        }

        fn init(&mut self, _data: &VectorDataset) -> Result<()> {
            self.inits += 1;
            self.mean = None;
            Ok(())
        }

        fn train(&mut self, data: &VectorDataset) -> Result<()> {
            let call = self.trainings;
            self.trainings += 1;
            if self.fail_on_call == Some(call) || self.failures_left > 0 {
                self.failures_left = self.failures_left.saturating_sub(1);
                return Err(Error::TrainingError("diverged".to_owned()));
            }
            let n = data.tr_set_size() as f64;
            self.mean = Some(data.training_set().map(|i| i.output[0]).sum::<f64>() / n);
            Ok(())
        }

        fn is_trained(&self) -> bool {
            self.mean.is_some()
        }

        fn test(&self, data: &VectorDataset) -> Result<Measures> {
            let mean = self.mean.ok_or_else(|| Error::TrainingError("untrained".to_owned()))?;
            let mut m = Measures::new();
            m.insert("test-size".to_owned(), data.test_fold_size() as f64);
            m.insert("prediction".to_owned(), mean);
            Ok(m)
        }

        fn test_on(&self, testset: &VectorDataset) -> Result<Measures> {
            let mut m = Measures::new();
            m.insert("size".to_owned(), testset.size() as f64);
            Ok(m)
        }
    }

    fn dataset(n: usize) -> VectorDataset {
        (0..n)
            .map(|i| Instance::new(format!("{}", i), vec![i as f64], vec![(i % 2) as f64]))
            .collect()
    }

    fn params(folds: usize, steps: usize, times: usize) -> Parameters {
        Parameters {
            cv_folds: folds,
            cv_steps: Some(steps),
            cv_times: times,
            ..Parameters::default()
        }
    }

    fn recorder(log: &Rc<RefCell<Vec<Event>>>) -> impl FnMut(&Event) {
        let log = log.clone();
        move |e: &Event| log.borrow_mut().push(e.clone())
    }

    fn step_ends(events: &[Event]) -> Vec<(usize, usize)> {
        events
            .iter()
            .filter_map(|e| match *e {
                Event::StepEnd { time, step, .. } => Some((time, step)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn step_end_order() {
        let mut data = dataset(20);
        let mut model = MeanModel::default();
        let events = Rc::new(RefCell::new(Vec::new()));

        {
            let mut cv = CrossValidation::new();
            cv.set_parameters(params(5, 3, 2)).unwrap();
            cv.bind_dataset(&mut data);
            cv.bind_model(&mut model);
            cv.add_observer(recorder(&events));

            let report = cv.start().unwrap();
            assert_eq!(report.completed_steps, 6);
            assert!(!report.failed);
            assert_eq!(report.metrics["test-size"].mean, 4.0);
            assert_eq!(report.metrics["test-size"].stdev, 0.0);
            assert_eq!(report.metrics["test-size"].n, 6);
            assert_eq!(cv.state(), RunState::Idle);
            assert_eq!(cv.accumulator().time_summaries().len(), 2);
        }

        let events = events.borrow();
        assert_eq!(
            step_ends(&events),
            vec![(0, 0), (0, 1), (0, 2), (1, 0), (1, 1), (1, 2)]
        );
        assert_eq!(
            events[0],
            Event::Started {
                folds: 5,
                steps: 3,
                times: 2
            }
        );
        match events.last() {
            Some(Event::CrossValidationEnd { report }) => assert_eq!(report.completed_steps, 6),
            other => panic!("unexpected {:?}", other),
        }
        let time_ends = events
            .iter()
            .filter(|e| match e {
                Event::TimeEnd { .. } => true,
                _ => false,
            })
            .count();
        assert_eq!(time_ends, 2);
        assert_eq!(model.inits, 6);
        assert_eq!(data.number_of_folds(), 5);
    }

    #[test]
    fn stop_policy_aborts_and_keeps_partial_results() {
        let mut data = dataset(20);
        let mut model = MeanModel {
            fail_on_call: Some(1),
            ..MeanModel::default()
        };
        let events = Rc::new(RefCell::new(Vec::new()));

        let mut cv = CrossValidation::new();
        cv.set_parameters(params(5, 5, 1)).unwrap();
        cv.bind_dataset(&mut data);
        cv.bind_model(&mut model);
        cv.add_observer(recorder(&events));

        match cv.start() {
            Err(Error::TrainingError(_)) => {}
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(cv.state(), RunState::Failed);

        let report = cv.results();
        assert!(report.failed);
        assert_eq!(report.completed_steps, 1);
        assert_eq!(report.metrics["test-size"].n, 1);

        let events = events.borrow();
        assert_eq!(step_ends(&events), vec![(0, 0)]);
        let fails = events
            .iter()
            .filter(|e| match e {
                Event::TrainingFail { step: 1, attempt: 1, .. } => true,
                _ => false,
            })
            .count();
        assert_eq!(fails, 1);
        assert!(events.iter().all(|e| match e {
            Event::CrossValidationEnd { .. } => false,
            _ => true,
        }));
    }

    #[test]
    fn repeat_policy_retries() {
        let mut data = dataset(12);
        let mut model = MeanModel {
            failures_left: 2,
            ..MeanModel::default()
        };
        let events = Rc::new(RefCell::new(Vec::new()));

        {
            let mut cv = CrossValidation::new();
            cv.set_parameters(Parameters {
                train_fail_behaviour: FailPolicy::Repeat,
                train_max_retries: Some(3),
                ..params(3, 3, 1)
            })
            .unwrap();
            cv.bind_dataset(&mut data);
            cv.bind_model(&mut model);
            cv.add_observer(recorder(&events));

            let report = cv.start().unwrap();
            assert_eq!(report.completed_steps, 3);
        }

        let fails = events
            .borrow()
            .iter()
            .filter(|e| match e {
                Event::TrainingFail { .. } => true,
                _ => false,
            })
            .count();
        assert_eq!(fails, 2);
        assert_eq!(model.inits, 5);
    }

    #[test]
    fn repeat_policy_gives_up() {
        let mut data = dataset(12);
        let mut model = MeanModel {
            failures_left: 10,
            ..MeanModel::default()
        };

        let mut cv = CrossValidation::new();
        cv.set_parameters(Parameters {
            train_fail_behaviour: FailPolicy::Repeat,
            train_max_retries: Some(2),
            ..params(3, 3, 1)
        })
        .unwrap();
        cv.bind_dataset(&mut data);
        cv.bind_model(&mut model);

        assert!(cv.start().is_err());
        assert_eq!(cv.state(), RunState::Failed);
        assert_eq!(cv.results().completed_steps, 0);
        drop(cv);
        assert_eq!(model.trainings, 3);
    }

    #[test]
    fn degenerate_stratified_split_aborts_merged() {
        // two classes of two instances each cannot fill three folds
        let mut data: VectorDataset = vec![0.0, 0.0, 1.0, 1.0]
            .into_iter()
            .enumerate()
            .map(|(i, y)| Instance::new(format!("{}", i), vec![0.0], vec![y]))
            .collect();
        let mut model = MeanModel::default();

        {
            let mut cv = CrossValidation::new();
            cv.set_parameters(Parameters {
                stratified_split: true,
                ..params(3, 3, 1)
            })
            .unwrap();
            cv.bind_dataset(&mut data);
            cv.bind_model(&mut model);

            match cv.start() {
                Err(Error::DegenerateSplit { .. }) => {}
                other => panic!("unexpected {:?}", other),
            }
            assert_eq!(cv.state(), RunState::Failed);
        }
        assert_eq!(data.number_of_folds(), 0);
        assert_eq!(model.inits, 0);
    }

    #[test]
    fn configuration_errors_come_first() {
        let mut data = dataset(4);
        let mut model = MeanModel::default();

        let mut cv: CrossValidation<VectorDataset, MeanModel> = CrossValidation::new();
        match cv.start() {
            Err(Error::IncompatibleBinding(_)) => {}
            other => panic!("unexpected {:?}", other),
        }

        cv.bind_dataset(&mut data);
        match cv.start() {
            Err(Error::IncompatibleBinding(_)) => {}
            other => panic!("unexpected {:?}", other),
        }

        cv.bind_model(&mut model);
        cv.set_parameters(params(5, 5, 1)).unwrap();
        match cv.start() {
            Err(Error::InvalidArgument(_)) => {}
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(cv.state(), RunState::Idle);
        drop(cv);
        assert_eq!(model.inits, 0);
        assert_eq!(data.number_of_folds(), 0);

        let mut cv: CrossValidation<VectorDataset, MeanModel> = CrossValidation::new();
        assert!(cv.set_parameters(params(3, 4, 1)).is_err());
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        let run = || {
            let mut data = dataset(30);
            let mut model = MeanModel::default();
            let events = Rc::new(RefCell::new(Vec::new()));
            {
                let mut cv = CrossValidation::new();
                cv.set_parameters(Parameters {
                    cv_times_dataset_shuffle: true,
                    shuffle_training_set: true,
                    dataset_random_seed: Some(11),
                    ..params(3, 3, 3)
                })
                .unwrap();
                cv.bind_dataset(&mut data);
                cv.bind_model(&mut model);
                cv.add_observer(recorder(&events));
                cv.start().unwrap();
            }
            let order = data.view().full_order().to_vec();
            let events = events.borrow().clone();
            (order, events)
        };

        let (order_a, events_a) = run();
        let (order_b, events_b) = run();
        assert_eq!(order_a, order_b);
        assert_eq!(events_a, events_b);
        assert_ne!(order_a, (0..30).collect::<Vec<_>>());
    }

    #[test]
    fn independent_test_set() {
        let mut data = dataset(10);
        let testset = dataset(7);
        let mut model = MeanModel::default();

        let mut cv = CrossValidation::new();
        cv.set_parameters(params(2, 2, 1)).unwrap();
        cv.bind_dataset(&mut data);
        cv.bind_model(&mut model);
        cv.bind_test_set(&testset);

        let report = cv.start().unwrap();
        assert_eq!(report.metrics["testset-size"].mean, 7.0);
        assert_eq!(report.metrics["test-size"].mean, 5.0);
    }

    #[test]
    fn cancellation_at_step_boundary() {
        let mut data = dataset(10);
        let mut model = MeanModel::default();
        let flag = Arc::new(AtomicBool::new(false));

        let mut cv = CrossValidation::new();
        cv.set_parameters(params(5, 5, 1)).unwrap();
        cv.bind_dataset(&mut data);
        cv.bind_model(&mut model);
        cv.set_cancel_flag(flag.clone());
        let trigger = flag.clone();
        cv.add_observer(move |e: &Event| {
            if let Event::StepEnd { step: 1, .. } = *e {
                trigger.store(true, Ordering::SeqCst);
            }
        });

        match cv.start() {
            Err(Error::Cancelled) => {}
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(cv.results().completed_steps, 2);
    }

    #[test]
    fn unlabeled_instances_rejected_before_stratifying() {
        let mut data: VectorDataset = (0..6)
            .map(|i| Instance::new(format!("{}", i), vec![i as f64], vec![]))
            .collect();
        data.split_in_folds(2).unwrap();
        let mut model = MeanModel::default();
        let events = Rc::new(RefCell::new(Vec::new()));

        {
            let mut cv = CrossValidation::new();
            cv.set_parameters(Parameters {
                stratified_split: true,
                ..params(3, 3, 1)
            })
            .unwrap();
            cv.bind_dataset(&mut data);
            cv.bind_model(&mut model);
            cv.add_observer(recorder(&events));

            match cv.start() {
                Err(Error::InvalidArgument(_)) => {}
                other => panic!("unexpected {:?}", other),
            }
            assert_eq!(cv.state(), RunState::Idle);
        }

        assert!(events.borrow().is_empty());
        assert_eq!(data.number_of_folds(), 2);
        assert_eq!(model.inits, 0);
    }

    #[test]
    fn predictions_written_per_step() {
        use crate::baseline::NaiveLinearRegression;
        use std::fs;

        let path = std::env::temp_dir().join(format!(
            "crossval-run-predictions-{}.csv",
            std::process::id()
        ));
        let mut data: VectorDataset = (0..20)
            .map(|i| {
                let x = i as f64;
                Instance::new(format!("{}", i), vec![x], vec![2.0 * x + 1.0])
            })
            .collect();
        let mut model = NaiveLinearRegression::new();

        {
            let mut cv = CrossValidation::new();
            cv.set_parameters(Parameters {
                save_output_file: Some(path.clone()),
                ..params(4, 4, 2)
            })
            .unwrap();
            cv.bind_dataset(&mut data);
            cv.bind_model(&mut model);
            let report = cv.start().unwrap();
            assert_eq!(report.completed_steps, 8);
        }

        let content = fs::read_to_string(&path).unwrap();
        fs::remove_file(&path).unwrap();

        let mut reader = csv::Reader::from_reader(content.as_bytes());
        let mut rows_per_step = std::collections::BTreeMap::new();
        for record in reader.records() {
            let record = record.unwrap();
            assert_eq!(record.len(), 5);
            let time: usize = record[0].parse().unwrap();
            let step: usize = record[1].parse().unwrap();
            *rows_per_step.entry((time, step)).or_insert(0usize) += 1;
        }

        let expected: Vec<((usize, usize), usize)> = (0..2)
            .flat_map(|t| (0..4).map(move |s| ((t, s), 5)))
            .collect();
        assert_eq!(rows_per_step.into_iter().collect::<Vec<_>>(), expected);
        assert_eq!(content.lines().count(), 41);
    }
}
