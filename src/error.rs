use std::error::Error as StdError;
use std::fmt;
use std::io::Error as IoError;
use std::result::Result as StdResult;

use arff::Error as ArffError;
use csv::Error as CsvError;
use serde_json::Error as JsonError;

pub type Result<T> = StdResult<T, Error>;

#[derive(Debug)]
pub enum Error {
    /// bad fold count, percentage or fold index
    InvalidArgument(String),

    /// a stratified split produced an empty fold; the dataset has been merged
    DegenerateSplit { fold: usize, n_folds: usize },

    /// the model refused initialization with the current parameters or training set
    NotInitializable(String),

    /// the model failed during training or testing
    TrainingError(String),

    /// model and dataset do not fit together, or something is not bound
    IncompatibleBinding(String),

    /// the run was cancelled at a step boundary
    Cancelled,

    IoError(IoError),
    CsvError(CsvError),
    JsonError(JsonError),
    ArffError(ArffError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::InvalidArgument(ref msg) => write!(f, "invalid argument: {}", msg),
            Error::DegenerateSplit { fold, n_folds } => write!(
                f,
                "stratified split into {} folds left fold {} empty",
                n_folds, fold
            ),
            Error::NotInitializable(ref msg) => write!(f, "model not initializable: {}", msg),
            Error::TrainingError(ref msg) => write!(f, "training error: {}", msg),
            Error::IncompatibleBinding(ref msg) => write!(f, "incompatible binding: {}", msg),
            Error::Cancelled => write!(f, "cross-validation cancelled"),
            Error::IoError(ref e) => write!(f, "io error: {}", e),
            Error::CsvError(ref e) => write!(f, "csv error: {}", e),
            Error::JsonError(ref e) => write!(f, "json error: {}", e),
            Error::ArffError(ref e) => write!(f, "arff error: {:?}", e),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match *self {
            Error::IoError(ref e) => Some(e),
            Error::CsvError(ref e) => Some(e),
            Error::JsonError(ref e) => Some(e),
            _ => None,
        }
    }
}

impl From<IoError> for Error {
    fn from(e: IoError) -> Self {
        Error::IoError(e)
    }
}

impl From<CsvError> for Error {
    fn from(e: CsvError) -> Self {
        Error::CsvError(e)
    }
}

impl From<JsonError> for Error {
    fn from(e: JsonError) -> Self {
        Error::JsonError(e)
    }
}

impl From<ArffError> for Error {
    fn from(e: ArffError) -> Self {
        Error::ArffError(e)
    }
}
