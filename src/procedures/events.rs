//! Progress notifications of a cross-validation run.

use crate::model::Measures;
use crate::results::{Report, Summaries};

/// One lifecycle transition of a cross-validation run. Events are delivered synchronously and
/// in the order they happen.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Started {
        folds: usize,
        steps: usize,
        times: usize,
    },

    StepStart {
        time: usize,
        step: usize,
    },

    /// the model was (re-)initialized for a step
    ModelInitialized {
        time: usize,
        step: usize,
    },

    /// training failed; `attempt` counts from 1
    TrainingFail {
        time: usize,
        step: usize,
        attempt: usize,
        error: String,
    },

    StepEnd {
        time: usize,
        step: usize,
        results: Measures,
    },

    TimeEnd {
        time: usize,
        summary: Summaries,
    },

    CrossValidationEnd {
        report: Report,
    },
}

/// Receives events of a cross-validation run
pub trait Observer {
    fn notify(&mut self, event: &Event);
}

impl<F> Observer for F
where
    F: FnMut(&Event),
{
    fn notify(&mut self, event: &Event) {
        self(event)
    }
}
