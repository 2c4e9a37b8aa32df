extern crate crossval;
extern crate log;
extern crate simple_logger;

use crossval::baseline::NaiveBayesClassifier;
use crossval::prelude::*;

const IRIS_SAMPLE: &str = "@RELATION iris-sample

@ATTRIBUTE sepallength NUMERIC
@ATTRIBUTE sepalwidth NUMERIC
@ATTRIBUTE petallength NUMERIC
@ATTRIBUTE petalwidth NUMERIC
@ATTRIBUTE class NUMERIC

@DATA
5.1,3.5,1.4,0.2,0
4.9,3.0,1.4,0.2,0
4.7,3.2,1.3,0.2,0
4.6,3.1,1.5,0.2,0
5.0,3.6,1.4,0.2,0
5.4,3.9,1.7,0.4,0
7.0,3.2,4.7,1.4,1
6.4,3.2,4.5,1.5,1
6.9,3.1,4.9,1.5,1
5.5,2.3,4.0,1.3,1
6.5,2.8,4.6,1.5,1
5.7,2.8,4.5,1.3,1
6.3,3.3,6.0,2.5,2
5.8,2.7,5.1,1.9,2
7.1,3.0,5.9,2.1,2
6.3,2.9,5.6,1.8,2
6.5,3.0,5.8,2.2,2
7.6,3.0,6.6,2.1,2
";

fn main() {
    simple_logger::init_with_level(log::Level::Info).unwrap();

    let mut data = VectorDataset::from_arff(IRIS_SAMPLE, 1).unwrap();

    let params = Parameters::from_json(
        r#"{
            "cv-folds": 3,
            "cv-times": 5,
            "cv-times-dataset-shuffle": true,
            "stratified-split": true,
            "dataset-random-seed": 1
        }"#,
    )
    .unwrap();

    let mut model: NaiveBayesClassifier<i64> = NaiveBayesClassifier::new();
    let mut cv = CrossValidation::new();
    cv.set_parameters(params).unwrap();
    cv.bind_dataset(&mut data);
    cv.bind_model(&mut model);

    let report = cv.start().unwrap();

    println!("{}", report);
    println!("{}", summary_line(&report));
}

fn summary_line(report: &crossval::Report) -> String {
    format!(
        "accuracy over {} steps: {:.3}",
        report.completed_steps, report.metrics["test-accuracy"].mean
    )
}
