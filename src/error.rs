//! Unified error types for the garage controller firmware.
//!
//! Two families live here:
//!
//! - [`Error`]: the crate-wide error every subsystem can convert into,
//!   so the main loop has one thing to log.
//! - [`ResultCode`] / [`RequestError`]: the structured outcome returned
//!   to the HTTP / broker request boundary.  Rejected requests never
//!   leave core state half-modified.

use core::fmt;

use crate::app::ports::{ConfigError, LogError, NotifyError};

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Option store failed to load or persist.
    Config(ConfigError),
    /// Event log store failed.
    Log(LogError),
    /// A notification could not be delivered.
    Notify(NotifyError),
    /// An inbound request was rejected.
    Request(RequestError),
    /// Peripheral initialisation failed.
    Init(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Log(e) => write!(f, "log: {e}"),
            Self::Notify(e) => write!(f, "notify: {e}"),
            Self::Request(e) => write!(f, "request: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<LogError> for Error {
    fn from(e: LogError) -> Self {
        Self::Log(e)
    }
}

impl From<NotifyError> for Error {
    fn from(e: NotifyError) -> Self {
        Self::Notify(e)
    }
}

impl From<RequestError> for Error {
    fn from(e: RequestError) -> Self {
        Self::Request(e)
    }
}

// ---------------------------------------------------------------------------
// Request result codes
// ---------------------------------------------------------------------------

/// Numeric result code reported to API clients as `{"result": code}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ResultCode {
    Success = 1,
    Unauthorized = 2,
    Mismatch = 3,
    DataMissing = 16,
    DataOutOfBound = 17,
    DataFormatError = 18,
    NotPermitted = 48,
    UploadFailed = 64,
}

impl ResultCode {
    pub const fn code(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Unauthorized => write!(f, "unauthorized"),
            Self::Mismatch => write!(f, "mismatch"),
            Self::DataMissing => write!(f, "data missing"),
            Self::DataOutOfBound => write!(f, "data out of bound"),
            Self::DataFormatError => write!(f, "data format error"),
            Self::NotPermitted => write!(f, "not permitted"),
            Self::UploadFailed => write!(f, "upload failed"),
        }
    }
}

/// A rejected request: the code plus the option / parameter name at fault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestError {
    pub code: ResultCode,
    pub item: Option<&'static str>,
}

impl RequestError {
    pub const fn new(code: ResultCode) -> Self {
        Self { code, item: None }
    }

    pub const fn with_item(code: ResultCode, item: &'static str) -> Self {
        Self {
            code,
            item: Some(item),
        }
    }
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.item {
            Some(item) => write!(f, "{} ({})", self.code, item),
            None => write!(f, "{}", self.code),
        }
    }
}

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
