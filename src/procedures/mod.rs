//! Validation procedures

mod cross_validation;
mod events;
mod parameters;

pub use self::cross_validation::{CrossValidation, RunState};
pub use self::events::{Event, Observer};
pub use self::parameters::{FailPolicy, Parameters};
