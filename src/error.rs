//! Error types for the citation pipeline

use std::fmt;

use thiserror::Error;

/// Pipeline step an error originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Load,
    Discovery,
    Crawl,
    Resolve,
    Cluster,
    Assemble,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::Load => "load",
            Step::Discovery => "discovery",
            Step::Crawl => "crawl",
            Step::Resolve => "resolve",
            Step::Cluster => "cluster",
            Step::Assemble => "assemble",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("store connection failed: {0}")]
    Connection(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("operation not supported by this store: {0}")]
    Unsupported(&'static str),

    #[error("invalid configuration for `{param}`: {reason}")]
    Config { param: &'static str, reason: String },

    #[error("invalid input: {0}")]
    Input(String),

    #[error("{step} step failed: {source}")]
    Step {
        step: Step,
        #[source]
        source: Box<Error>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("bincode error: {0}")]
    Bincode(#[from] bincode::Error),

    #[error("parquet error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Store(err.to_string())
    }
}

impl Error {
    pub fn config(param: &'static str, reason: impl Into<String>) -> Self {
        Error::Config {
            param,
            reason: reason.into(),
        }
    }

    /// The step this error was raised in, if it has been tagged with one
    pub fn step(&self) -> Option<Step> {
        match self {
            Error::Step { step, .. } => Some(*step),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Tags an error with the pipeline step that produced it
pub trait StepContext<T> {
    fn in_step(self, step: Step) -> Result<T>;
}

impl<T> StepContext<T> for Result<T> {
    fn in_step(self, step: Step) -> Result<T> {
        self.map_err(|err| match err {
            tagged @ Error::Step { .. } => tagged,
            other => Error::Step {
                step,
                source: Box::new(other),
            },
        })
    }
}
