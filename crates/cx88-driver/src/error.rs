//! Error types for CX2388x driver operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for driver operations.
pub type Result<T> = std::result::Result<T, CxError>;

/// Errors that can occur during driver operations.
#[derive(Debug, Error)]
pub enum CxError {
    /// Register address or block length not word-aligned. Never rounded.
    #[error("Unaligned access at {addr:#08x}")]
    Alignment {
        /// Offending address or length.
        addr: u32,
    },

    /// Target did not resolve to a register, cluster or raw address.
    #[error("Unknown register or address: {target}")]
    NotFound {
        /// Target string as supplied by the caller.
        target: String,
    },

    /// Value on a set operation did not parse as an integer.
    #[error("Could not parse value: {value}")]
    InvalidValue {
        /// Offending value string.
        value: String,
    },

    /// Duplicate register name or address in the catalog table. Fatal at
    /// startup: the table itself is inconsistent.
    #[error("Register table integrity violation: {reason}")]
    ConfigIntegrity {
        /// What was duplicated or out of range.
        reason: String,
    },

    /// Device read error or short read during acquisition. Fatal to the
    /// acquisition session.
    #[error("Sample stream failure: {reason}")]
    Stream {
        /// Reason for failure.
        reason: String,
    },

    /// Malformed or undecodable settings import payload. No writes applied.
    #[error("Corrupted import blob: {reason}")]
    CorruptImport {
        /// What failed to decode.
        reason: String,
    },

    /// Operation not valid in the current acquisition state.
    #[error("Invalid acquisition state: {state}")]
    InvalidState {
        /// Current state description.
        state: String,
    },

    /// Capture device node not found at the expected path.
    #[error("Device not found: {path}")]
    DeviceNotFound {
        /// Path that was checked.
        path: PathBuf,
    },

    /// No CX2388x capture devices detected on the system.
    #[error("No CX2388x devices detected")]
    NoDevicesFound,

    /// I/O error during device communication.
    #[error("I/O error: {source}")]
    Io {
        /// Underlying I/O error.
        #[from]
        source: std::io::Error,
    },
}

impl CxError {
    /// Create an alignment error.
    pub const fn alignment(addr: u32) -> Self {
        Self::Alignment { addr }
    }

    /// Create a not-found error.
    pub fn not_found(target: impl Into<String>) -> Self {
        Self::NotFound {
            target: target.into(),
        }
    }

    /// Create an invalid-value error.
    pub fn invalid_value(value: impl Into<String>) -> Self {
        Self::InvalidValue {
            value: value.into(),
        }
    }

    /// Create a table-integrity error.
    pub fn config_integrity(reason: impl Into<String>) -> Self {
        Self::ConfigIntegrity {
            reason: reason.into(),
        }
    }

    /// Create a stream-failure error.
    pub fn stream(reason: impl Into<String>) -> Self {
        Self::Stream {
            reason: reason.into(),
        }
    }

    /// Create a corrupt-import error.
    pub fn corrupt_import(reason: impl Into<String>) -> Self {
        Self::CorruptImport {
            reason: reason.into(),
        }
    }

    /// Create an invalid-state error.
    pub fn invalid_state(state: impl Into<String>) -> Self {
        Self::InvalidState {
            state: state.into(),
        }
    }

    /// Create a device-not-found error.
    pub fn device_not_found(path: impl Into<PathBuf>) -> Self {
        Self::DeviceNotFound { path: path.into() }
    }
}
