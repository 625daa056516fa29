//! Error types shared by the beacons and their platform backends.

use thiserror::Error;

/// Failure to complete an HTTP exchange at all (no status received).
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid request url `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("request to `{url}` failed: {reason}")]
    Network { url: String, reason: String },
}

#[derive(Debug, Error)]
pub enum BeaconError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("unexpected HTTP status {status} from `{url}`")]
    UnexpectedStatus { url: String, status: u16 },
    #[error("malformed resolution response: {0}")]
    MalformedResponse(String),
    #[error("storage failure: {0}")]
    Storage(String),
    #[error("invalid configuration: {0}")]
    Config(String),
}
