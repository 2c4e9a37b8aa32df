extern crate crossval;
extern crate log;
extern crate simple_logger;

use crossval::baseline::NaiveLinearRegression;
use crossval::prelude::*;

fn main() {
    simple_logger::init_with_level(log::Level::Info).unwrap();

    // noisy line, the second feature carries the signal
    let mut data: VectorDataset = (0..60)
        .map(|i| {
            let x = i as f64 / 6.0;
            let noise = ((i * 7919) % 13) as f64 / 13.0 - 0.5;
            Instance::new(format!("{}", i), vec![(i % 5) as f64, x], vec![2.0 * x + 1.0 + noise])
        })
        .collect();

    let params = Parameters::from_pairs(std::env::args().skip(1)).unwrap();

    let mut model = NaiveLinearRegression::new();
    let mut cv = CrossValidation::new();
    cv.set_parameters(params).unwrap();
    cv.bind_dataset(&mut data);
    cv.bind_model(&mut model);
    cv.add_observer(|event: &Event| {
        if let Event::StepEnd { time, step, ref results } = *event {
            println!("time {} step {}: {:?}", time, step, results);
        }
    });

    let report = cv.start().unwrap();

    println!("{}", report);
    println!("{}", report.csv_header().unwrap());
    println!("{}", report.csv_line().unwrap());
}
