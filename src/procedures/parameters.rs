//! Configuration of a cross-validation run.

use std::path::PathBuf;
use std::str::FromStr;

use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// What to do when a model fails to train
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailPolicy {
    /// abort the whole run
    Stop,

    /// re-initialize the model and train again, up to `train-max-retries` times
    Repeat,
}

impl Default for FailPolicy {
    fn default() -> Self {
        FailPolicy::Stop
    }
}

impl FromStr for FailPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "stop" => Ok(FailPolicy::Stop),
            "repeat" => Ok(FailPolicy::Repeat),
            _ => Err(Error::InvalidArgument(format!(
                "unknown train-fail-behaviour '{}'",
                s
            ))),
        }
    }
}

/// Cross-validation parameters. Keys are spelled in kebab-case, e.g. `cv-folds`; unknown keys
/// are ignored so that model and validation parameters can share one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Parameters {
    pub cv_folds: usize,

    /// number of folds used as test fold in each time; defaults to `cv_folds`
    pub cv_steps: Option<usize>,

    pub cv_times: usize,

    /// shuffle the whole dataset before every time but the first
    pub cv_times_dataset_shuffle: bool,

    pub stratified_split: bool,
    pub dataset_random_seed: Option<u64>,
    pub train_fail_behaviour: FailPolicy,

    /// required for `FailPolicy::Repeat`
    pub train_max_retries: Option<usize>,

    /// shuffle the training set of every step
    pub shuffle_training_set: bool,

    /// write test set predictions of every step to this file
    pub save_output_file: Option<PathBuf>,
}

impl Default for Parameters {
    fn default() -> Self {
        Parameters {
            cv_folds: 10,
            cv_steps: None,
            cv_times: 1,
            cv_times_dataset_shuffle: false,
            stratified_split: false,
            dataset_random_seed: None,
            train_fail_behaviour: FailPolicy::Stop,
            train_max_retries: None,
            shuffle_training_set: false,
            save_output_file: None,
        }
    }
}

impl Parameters {
    /// Parse parameters from a JSON object
    pub fn from_json(json: &str) -> Result<Self> {
        let params: Parameters = serde_json::from_str(json)?;
        params.validate()?;
        Ok(params)
    }

    /// Parse parameters from `key=value` strings, as given on a command line
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut map = Map::new();
        for pair in pairs {
            let pair = pair.as_ref();
            let mut parts = pair.splitn(2, '=');
            let key = parts.next().unwrap_or("").trim();
            let value = match parts.next() {
                Some(v) => v.trim(),
                None => {
                    return Err(Error::InvalidArgument(format!(
                        "expected key=value, got '{}'",
                        pair
                    )))
                }
            };
            map.insert(key.to_owned(), parse_value(value));
        }

        let params: Parameters = serde_json::from_value(Value::Object(map))?;
        params.validate()?;
        Ok(params)
    }

    pub fn steps(&self) -> usize {
        self.cv_steps.unwrap_or(self.cv_folds)
    }

    /// Retries allowed after a training failure
    pub fn max_retries(&self) -> usize {
        match self.train_fail_behaviour {
            FailPolicy::Stop => 0,
            FailPolicy::Repeat => self.train_max_retries.unwrap_or(0),
        }
    }

    /// Check the parameters for consistency
    pub fn validate(&self) -> Result<()> {
        if self.cv_folds < 2 {
            return Err(Error::InvalidArgument(format!(
                "cv-folds must be at least 2, got {}",
                self.cv_folds
            )));
        }
        let steps = self.steps();
        if steps == 0 || steps > self.cv_folds {
            return Err(Error::InvalidArgument(format!(
                "cv-steps must be in 1..={}, got {}",
                self.cv_folds, steps
            )));
        }
        if self.cv_times == 0 {
            return Err(Error::InvalidArgument("cv-times must be at least 1".to_owned()));
        }
        if self.train_fail_behaviour == FailPolicy::Repeat {
            match self.train_max_retries {
                Some(n) if n > 0 => {}
                _ => {
                    return Err(Error::InvalidArgument(
                        "train-fail-behaviour 'repeat' requires train-max-retries > 0".to_owned(),
                    ))
                }
            }
        }
        Ok(())
    }
}

/// Interpret a command line value as number, boolean or string
fn parse_value(value: &str) -> Value {
    if let Ok(n) = value.parse::<u64>() {
        return Value::from(n);
    }
    match value {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(value.to_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let params = Parameters::default();
        params.validate().unwrap();
        assert_eq!(params.steps(), 10);
        assert_eq!(params.max_retries(), 0);
    }

    #[test]
    fn json_keys() {
        let params = Parameters::from_json(
            r#"{
                "cv-folds": 5,
                "cv-steps": 3,
                "cv-times": 2,
                "cv-times-dataset-shuffle": true,
                "stratified-split": true,
                "dataset-random-seed": 42,
                "train-fail-behaviour": "repeat",
                "train-max-retries": 4,
                "save-output-file": "out.csv",
                "reservoir-size": 100
            }"#,
        )
        .unwrap();

        assert_eq!(params.cv_folds, 5);
        assert_eq!(params.steps(), 3);
        assert_eq!(params.cv_times, 2);
        assert!(params.cv_times_dataset_shuffle);
        assert!(params.stratified_split);
        assert_eq!(params.dataset_random_seed, Some(42));
        assert_eq!(params.train_fail_behaviour, FailPolicy::Repeat);
        assert_eq!(params.max_retries(), 4);
        assert_eq!(params.save_output_file, Some(PathBuf::from("out.csv")));
    }

    #[test]
    fn command_line_pairs() {
        let params = Parameters::from_pairs(vec![
            "cv-folds=4",
            "cv-times = 3",
            "stratified-split=true",
            "train-fail-behaviour=stop",
        ])
        .unwrap();

        assert_eq!(params.cv_folds, 4);
        assert_eq!(params.steps(), 4);
        assert_eq!(params.cv_times, 3);
        assert!(params.stratified_split);
        assert_eq!(params.train_fail_behaviour, FailPolicy::Stop);

        assert!(Parameters::from_pairs(vec!["cv-folds"]).is_err());
    }

    #[test]
    fn steps_must_not_exceed_folds() {
        match Parameters::from_json(r#"{"cv-folds": 3, "cv-steps": 4}"#) {
            Err(Error::InvalidArgument(_)) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn repeat_needs_a_retry_bound() {
        assert!(Parameters::from_json(r#"{"train-fail-behaviour": "repeat"}"#).is_err());
        assert!(Parameters::from_json(
            r#"{"train-fail-behaviour": "repeat", "train-max-retries": 0}"#
        )
        .is_err());
    }

    #[test]
    fn fail_policy_from_str() {
        assert_eq!("repeat".parse::<FailPolicy>().unwrap(), FailPolicy::Repeat);
        assert!("retry".parse::<FailPolicy>().is_err());
    }
}
