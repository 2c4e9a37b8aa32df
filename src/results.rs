//! Aggregation of step results into per-time and final summaries.

use std::collections::BTreeMap;
use std::f64;
use std::fmt;

use crate::error::Result;
use crate::model::Measures;

/// Mean and population standard deviation of one metric
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub mean: f64,
    pub stdev: f64,
    pub n: usize,
}

impl Summary {
    /// Summarize `values`. An empty slice gives NaN mean and deviation with `n == 0`.
    pub fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Summary {
                mean: f64::NAN,
                stdev: f64::NAN,
                n: 0,
            };
        }

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / n;

        Summary {
            mean,
            stdev: var.sqrt(),
            n: values.len(),
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ± {}", self.mean, self.stdev)
    }
}

/// Summaries keyed by metric name
pub type Summaries = BTreeMap<String, Summary>;

/// Collects the raw values of every metric, per step and per time
#[derive(Debug, Clone, Default)]
pub struct ResultAccumulator {
    /// values of the steps of the current time
    steps: BTreeMap<String, Vec<f64>>,

    /// every step value of every time
    all_steps: BTreeMap<String, Vec<f64>>,

    /// one summary per completed time
    times: Vec<Summaries>,

    n_steps: usize,
    final_summary: Summaries,
}

impl ResultAccumulator {
    pub fn new() -> Self {
        ResultAccumulator::default()
    }

    pub fn clear(&mut self) {
        *self = ResultAccumulator::default();
    }

    /// Record the results of one step
    pub fn add_step_results(&mut self, measures: &Measures) {
        for (name, &value) in measures {
            self.steps
                .entry(name.clone())
                .or_insert_with(Vec::new)
                .push(value);
            self.all_steps
                .entry(name.clone())
                .or_insert_with(Vec::new)
                .push(value);
        }
        self.n_steps += 1;
    }

    /// Summarize the steps of the current time and start a new time
    pub fn accumulate_steps_results(&mut self) -> Summaries {
        let summary = summarize(&self.steps);
        self.steps.clear();
        self.times.push(summary.clone());
        summary
    }

    /// Summarize every step of every time into the final result
    pub fn accumulate_times_results(&mut self) -> &Summaries {
        self.final_summary = summarize(&self.all_steps);
        &self.final_summary
    }

    /// Number of steps recorded since the last `clear`
    pub fn n_steps(&self) -> usize {
        self.n_steps
    }

    pub fn time_summaries(&self) -> &[Summaries] {
        &self.times
    }

    /// Values of `metric` over all recorded steps
    pub fn step_values(&self, metric: &str) -> &[f64] {
        self.all_steps.get(metric).map_or(&[][..], Vec::as_slice)
    }

    /// Summary over every step recorded so far, whether or not the run completed
    pub fn current_summary(&self) -> Summaries {
        summarize(&self.all_steps)
    }

    pub fn final_summary(&self) -> &Summaries {
        &self.final_summary
    }
}

fn summarize(values: &BTreeMap<String, Vec<f64>>) -> Summaries {
    values
        .iter()
        .map(|(name, v)| (name.clone(), Summary::from_values(v)))
        .collect()
}

/// Outcome of a cross-validation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub folds: usize,
    pub steps: usize,
    pub times: usize,
    pub completed_steps: usize,
    pub failed: bool,
    pub metrics: Summaries,
}

impl Report {
    /// Column names matching `csv_line`
    pub fn csv_header(&self) -> Result<String> {
        let mut columns = vec![
            "folds".to_owned(),
            "steps".to_owned(),
            "times".to_owned(),
            "completed".to_owned(),
        ];
        for name in self.metrics.keys() {
            columns.push(format!("{}-mean", name));
            columns.push(format!("{}-stdev", name));
        }
        csv_record(&columns)
    }

    pub fn csv_line(&self) -> Result<String> {
        let mut fields = vec![
            self.folds.to_string(),
            self.steps.to_string(),
            self.times.to_string(),
            self.completed_steps.to_string(),
        ];
        for summary in self.metrics.values() {
            fields.push(summary.mean.to_string());
            fields.push(summary.stdev.to_string());
        }
        csv_record(&fields)
    }
}

/// One CSV record, without the line terminator
fn csv_record(fields: &[String]) -> Result<String> {
    let mut buf = Vec::new();
    {
        let mut writer = csv::Writer::from_writer(&mut buf);
        writer.write_record(fields)?;
        writer.flush()?;
    }
    let line = String::from_utf8_lossy(&buf);
    Ok(line.trim_end_matches(|c| c == '\r' || c == '\n').to_owned())
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(
            f,
            "{}-fold cross-validation, {} steps x {} times ({} steps completed{})",
            self.folds,
            self.steps,
            self.times,
            self.completed_steps,
            if self.failed { ", FAILED" } else { "" }
        )?;
        for (name, summary) in &self.metrics {
            writeln!(f, "  {}: {}", name, summary)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn measures(pairs: &[(&str, f64)]) -> Measures {
        pairs.iter().map(|&(k, v)| (k.to_owned(), v)).collect()
    }

    #[test]
    fn population_stdev() {
        let s = Summary::from_values(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_eq!(s.mean, 5.0);
        assert_eq!(s.stdev, 2.0);
        assert_eq!(s.n, 8);
    }

    #[test]
    fn empty_summary_is_nan() {
        let s = Summary::from_values(&[]);
        assert!(s.mean.is_nan());
        assert!(s.stdev.is_nan());
        assert_eq!(s.n, 0);
    }

    #[test]
    fn steps_and_times() {
        let mut acc = ResultAccumulator::new();
        acc.add_step_results(&measures(&[("err", 1.0)]));
        acc.add_step_results(&measures(&[("err", 3.0)]));
        let t0 = acc.accumulate_steps_results();
        assert_eq!(t0["err"].mean, 2.0);
        assert_eq!(t0["err"].stdev, 1.0);

        acc.add_step_results(&measures(&[("err", 5.0)]));
        acc.add_step_results(&measures(&[("err", 7.0)]));
        let t1 = acc.accumulate_steps_results();
        assert_eq!(t1["err"].mean, 6.0);

        let total = acc.accumulate_times_results().clone();
        assert_eq!(total["err"].mean, 4.0);
        assert_eq!(total["err"].stdev, 5.0f64.sqrt());
        assert_eq!(total["err"].n, 4);
        assert_eq!(acc.time_summaries().len(), 2);
        assert_eq!(acc.n_steps(), 4);
        assert_eq!(acc.step_values("err"), &[1.0, 3.0, 5.0, 7.0]);
    }

    #[test]
    fn empty_accumulator() {
        let mut acc = ResultAccumulator::new();
        assert!(acc.accumulate_steps_results().is_empty());
        assert!(acc.accumulate_times_results().is_empty());
        assert!(acc.step_values("anything").is_empty());
    }

    #[test]
    fn report_rendering() {
        let mut metrics = Summaries::new();
        metrics.insert(
            "test-rmse".to_owned(),
            Summary {
                mean: 0.5,
                stdev: 0.25,
                n: 6,
            },
        );
        let report = Report {
            folds: 5,
            steps: 3,
            times: 2,
            completed_steps: 6,
            failed: false,
            metrics,
        };

        assert_eq!(
            report.csv_header().unwrap(),
            "folds,steps,times,completed,test-rmse-mean,test-rmse-stdev"
        );
        assert_eq!(report.csv_line().unwrap(), "5,3,2,6,0.5,0.25");
        assert!(report.to_string().contains("test-rmse: 0.5 ± 0.25"));

        let json = serde_json::to_string(&report).unwrap();
        let back: Report = serde_json::from_str(&json).unwrap();
        assert_eq!(back, report);
    }

    #[test]
    fn csv_header_quotes_metric_names() {
        let mut metrics = Summaries::new();
        metrics.insert(
            "f1, macro".to_owned(),
            Summary {
                mean: 0.75,
                stdev: 0.0,
                n: 2,
            },
        );
        let report = Report {
            folds: 2,
            steps: 2,
            times: 1,
            completed_steps: 2,
            failed: false,
            metrics,
        };

        let header = report.csv_header().unwrap();
        assert_eq!(
            header,
            "folds,steps,times,completed,\"f1, macro-mean\",\"f1, macro-stdev\""
        );
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader(header.as_bytes());
        let record = reader.records().next().unwrap().unwrap();
        assert_eq!(record.len(), 6);
        assert_eq!(report.csv_line().unwrap(), "2,2,1,2,0.75,0");
    }
}
