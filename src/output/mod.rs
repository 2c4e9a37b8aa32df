//! Per-instance prediction output of cross-validation runs.

mod file_lock;

use std::fs::File;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::model::Prediction;

use self::file_lock::ExclusiveLock;

/// CSV file receiving the test set predictions of every step.
///
/// The file is locked exclusively while it is open, so concurrent runs can't interleave their
/// lines. Output vectors are written as `;`-separated values within one column.
pub struct PredictionFile {
    path: PathBuf,
    out: csv::Writer<ExclusiveLock>,
}

impl PredictionFile {
    /// Create (or truncate) the file at `path` and write the header
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_owned();
        let file = File::create(&path)?;
        let mut out = csv::Writer::from_writer(ExclusiveLock::new(file)?);
        out.write_record(&["time", "step", "id", "expected", "predicted"])?;
        info!("Writing predictions to {}", path.display());
        Ok(PredictionFile { path, out })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write_step(&mut self, time: usize, step: usize, predictions: &[Prediction]) -> Result<()> {
        let time = time.to_string();
        let step = step.to_string();
        for p in predictions {
            let expected = join(&p.expected);
            let predicted = join(&p.predicted);
            self.out.write_record(&[
                time.as_str(),
                step.as_str(),
                p.id.as_str(),
                expected.as_str(),
                predicted.as_str(),
            ])?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

fn join(values: &[f64]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(";")
}
