//! Error taxonomy for the preprocessing pipeline.
//!
//! Every failure that is scoped to one shot (or one call) has its own
//! variant so the batch driver can log a precise reason and move on.
//! I/O and format failures from the ecosystem crates are wrapped as-is.
use thiserror::Error;

use crate::shot::{Channel, ShotId};

#[derive(Error, Debug)]
pub enum PrepError {
    /// `end` is not strictly after `begin` (or a bound is not finite).
    #[error("invalid resample window: begin={begin}, end={end}")]
    InvalidWindow { begin: f64, end: f64 },

    #[error("channel {0} is not present in the shot")]
    MissingChannel(Channel),

    #[error("channel {0} has no samples inside the requested window")]
    EmptySignal(Channel),

    #[error("shot {0} has none of the requested channels inside its window")]
    NoUsableChannel(ShotId),

    #[error("unusable disruption time: {0}")]
    InvalidDisruptionTime(String),

    #[error("missing shot metadata: {0}")]
    MissingMetadata(&'static str),

    #[error("cut point {cut} lies outside the time range [{first}, {last}]")]
    OutOfBoundsCut { cut: f64, first: f64, last: f64 },

    #[error("unsupported container format: {0}")]
    UnsupportedContainerFormat(String),

    #[error("length mismatch: {what} ({left} vs {right})")]
    LengthMismatch {
        what: &'static str,
        left: usize,
        right: usize,
    },

    #[error("malformed record: {0}")]
    MalformedRecord(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("unknown channel name {0:?}")]
    UnknownChannel(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PrepError>;

impl PrepError {
    /// `true` for failures that only cost one channel, not the whole shot.
    pub fn is_channel_scoped(&self) -> bool {
        matches!(self, PrepError::MissingChannel(_) | PrepError::EmptySignal(_))
    }
}
