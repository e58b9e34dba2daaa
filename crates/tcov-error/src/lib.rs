use thiserror::Error;

/// Primary error type for tcov operations.
///
/// Only conditions that abort a whole analysis run, or that reject a single
/// entity outright, are modeled here. Recoverable per-entity problems
/// (dangling references, malformed filters) are reported as warnings by the
/// engine and never surface as `TcovError`.
#[derive(Error, Debug)]
pub enum TcovError {
    // === Configuration Errors ===
    /// Module depth must be at least one path segment.
    #[error("invalid module depth {depth}: must be >= 1")]
    InvalidModuleDepth { depth: i64 },

    /// Any other configuration value that makes aggregation meaningless.
    #[error("invalid configuration: {detail}")]
    InvalidConfig { detail: String },

    /// Configuration file could not be decoded.
    #[error("configuration decode failed: {detail}")]
    ConfigDecode { detail: String },

    // === Entity Errors ===
    /// A raw record carries neither a GUID nor a usable path.
    #[error("record '{name}' has neither an identifier nor a usable path")]
    MissingIdentifier { name: String },

    // === Input Errors ===
    /// Project snapshot could not be decoded.
    #[error("snapshot decode failed: {detail}")]
    SnapshotDecode { detail: String },

    /// Report could not be encoded.
    #[error("report encode failed: {detail}")]
    ReportEncode { detail: String },

    // === I/O Errors ===
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification used for process exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ErrorClass {
    /// Entity-level problem; the run continues without the entity.
    Entity = 1,
    /// Configuration or usage problem; the run is aborted.
    Configuration = 2,
    /// Input/output problem outside the engine proper.
    Io = 3,
}

impl TcovError {
    /// Classify this error.
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::InvalidModuleDepth { .. }
            | Self::InvalidConfig { .. }
            | Self::ConfigDecode { .. } => ErrorClass::Configuration,
            Self::MissingIdentifier { .. } => ErrorClass::Entity,
            Self::SnapshotDecode { .. } | Self::ReportEncode { .. } | Self::Io(_) => ErrorClass::Io,
        }
    }

    /// Whether this error aborts the whole run rather than one entity.
    pub const fn is_fatal(&self) -> bool {
        !matches!(self.class(), ErrorClass::Entity)
    }

    /// Human-friendly suggestion for fixing this error.
    pub const fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::InvalidModuleDepth { .. } => Some("Pass --module-depth 1 or greater"),
            Self::ConfigDecode { .. } => Some("Check the TOML syntax of the configuration file"),
            Self::MissingIdentifier { .. } => {
                Some("Give the entity a GUID or make sure it has a project-relative path")
            }
            Self::SnapshotDecode { .. } => {
                Some("Regenerate the snapshot with the project reader")
            }
            _ => None,
        }
    }

    /// Get the process exit code for this error (for CLI use).
    pub const fn exit_code(&self) -> i32 {
        self.class() as i32
    }

    /// Create a configuration error.
    pub fn config(detail: impl Into<String>) -> Self {
        Self::InvalidConfig {
            detail: detail.into(),
        }
    }

    /// Create a missing-identifier error.
    pub fn missing_identifier(name: impl Into<String>) -> Self {
        Self::MissingIdentifier { name: name.into() }
    }

    /// Create a snapshot decode error.
    pub fn snapshot(detail: impl Into<String>) -> Self {
        Self::SnapshotDecode {
            detail: detail.into(),
        }
    }
}

/// Result type alias using `TcovError`.
pub type Result<T> = std::result::Result<T, TcovError>;
