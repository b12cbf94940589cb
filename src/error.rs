//! # Error Handling
//!
//! Error types for the viewfinder: a single [`ScanError`] enum carrying an
//! [`ErrorContext`], plus classification traits the scan loop and the shell
//! use to decide what to do with a failure.
//!
//! ## Error Taxonomy
//!
//! | Variant | Raised by | Handling |
//! |---------|-----------|----------|
//! | `CaptureDenied` | capture source | user notification, session waits until remount |
//! | `Decode` | decoder | logged, tick skipped, never fatal |
//! | `Region` | region extraction | logged, tick skipped |
//! | `Encoding` | capture freezer | logged, tick skipped |
//! | `State` | scan session | refused transition |
//! | `Config` / `Validation` | configuration | rejected before mount |
//! | `Io` / `External` | download, adapters | surfaced to caller |
//!
//! "No code in this frame" is not an error; decoders report it as `Ok(None)`.
//!
//! ## Usage
//!
//! ```rust
//! use qr_viewfinder::error::{Recoverable, ScanError};
//!
//! let error = ScanError::decode("rqrr", "pixel buffer shorter than width * height * 4")
//!     .with_context("decoding scan band 800x266");
//!
//! assert!(error.is_recoverable());
//! ```

use std::{error::Error as StdError, fmt, time::SystemTime};

use scan_region::RegionError;

/// Severity levels for errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Debug-level errors that don't affect operation
    Debug,
    /// Informational errors
    Info,
    /// Warnings that may indicate potential issues
    Warning,
    /// Errors that affect operation but can be recovered from
    Error,
    /// Critical errors that require immediate attention
    Critical,
}

/// Metadata about when and where an error occurred
#[derive(Debug, Clone)]
pub struct ErrorContext {
    /// When the error occurred
    pub timestamp: SystemTime,
    /// The operation being performed when the error occurred
    pub operation: Option<String>,
    /// Additional context about the error
    pub context: Option<String>,
    /// Suggested recovery action
    pub recovery_suggestion: Option<String>,
    /// Error severity level
    pub severity: ErrorSeverity,
    /// Whether this error is retryable
    pub retryable: bool,
    /// Whether this error is recoverable
    pub recoverable: bool,
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self {
            timestamp: SystemTime::now(),
            operation: None,
            context: None,
            recovery_suggestion: None,
            severity: ErrorSeverity::Error,
            retryable: false,
            recoverable: false,
        }
    }
}

impl ErrorContext {
    /// Create a new error context
    pub fn new() -> Self {
        Self::default()
    }

    fn with_severity(mut self, severity: ErrorSeverity) -> Self {
        self.severity = severity;
        self
    }

    fn with_recovery_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.recovery_suggestion = Some(suggestion.into());
        self
    }
}

/// Base error type for the viewfinder
#[derive(Debug)]
pub enum ScanError {
    /// Configuration validation errors
    Config {
        field: String,
        value: String,
        reason: String,
        context: ErrorContext,
    },
    /// Camera permission refused or device unavailable
    CaptureDenied {
        device: String,
        reason: String,
        context: ErrorContext,
    },
    /// Decoder rejected its input
    Decode {
        decoder: String,
        reason: String,
        context: ErrorContext,
    },
    /// Image serialization failures
    Encoding {
        format: String,
        reason: String,
        context: ErrorContext,
    },
    /// Scan region extraction failures
    Region {
        operation: String,
        source: RegionError,
        context: ErrorContext,
    },
    /// I/O errors
    Io {
        operation: String,
        path: Option<String>,
        source: std::io::Error,
        context: ErrorContext,
    },
    /// External library errors
    External {
        library: String,
        source: Box<dyn StdError + Send + Sync>,
        context: ErrorContext,
    },
    /// Validation errors
    Validation {
        field: String,
        constraint: String,
        value: String,
        context: ErrorContext,
    },
    /// State errors (invalid state transitions)
    State {
        current_state: String,
        attempted_operation: String,
        reason: String,
        context: ErrorContext,
    },
}

impl ScanError {
    /// Create a configuration error
    pub fn config(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Config {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create a capture-denied error
    pub fn capture_denied(device: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CaptureDenied {
            device: device.into(),
            reason: reason.into(),
            context: ErrorContext::new()
                .with_severity(ErrorSeverity::Critical)
                .with_recovery_suggestion("Grant camera access and reopen the viewfinder"),
        }
    }

    /// Create a decode error
    pub fn decode(decoder: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Decode {
            decoder: decoder.into(),
            reason: reason.into(),
            context: ErrorContext::new().with_severity(ErrorSeverity::Warning),
        }
    }

    /// Create an encoding error
    pub fn encoding(format: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Encoding {
            format: format.into(),
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create a region extraction error
    pub fn region(operation: impl Into<String>, source: RegionError) -> Self {
        Self::Region {
            operation: operation.into(),
            source,
            context: ErrorContext::new().with_severity(ErrorSeverity::Warning),
        }
    }

    /// Create an I/O error
    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            path: None,
            source,
            context: ErrorContext::new(),
        }
    }

    /// Create an external library error
    pub fn external(
        library: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::External {
            library: library.into(),
            source: Box::new(source),
            context: ErrorContext::new(),
        }
    }

    /// Create a validation error
    pub fn validation(
        field: impl Into<String>,
        constraint: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::Validation {
            field: field.into(),
            constraint: constraint.into(),
            value: value.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create a state error
    pub fn state(
        current_state: impl Into<String>,
        attempted_operation: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::State {
            current_state: current_state.into(),
            attempted_operation: attempted_operation.into(),
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    /// Attach the path an I/O error refers to
    pub fn with_path(mut self, p: impl Into<String>) -> Self {
        if let Self::Io { path, .. } = &mut self {
            *path = Some(p.into());
        }
        self
    }

    /// Add context to the error
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context_mut().context = Some(context.into());
        self
    }

    /// Set the operation being performed
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.context_mut().operation = Some(operation.into());
        self
    }

    /// Add recovery suggestion
    pub fn with_recovery_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.context_mut().recovery_suggestion = Some(suggestion.into());
        self
    }

    /// Set severity level
    pub fn with_severity(mut self, severity: ErrorSeverity) -> Self {
        self.context_mut().severity = severity;
        self
    }

    /// Mark as retryable
    pub fn retryable(mut self) -> Self {
        self.context_mut().retryable = true;
        self
    }

    /// Mark as recoverable
    pub fn recoverable(mut self) -> Self {
        self.context_mut().recoverable = true;
        self
    }

    /// Get the error context
    pub fn context(&self) -> &ErrorContext {
        match self {
            Self::Config { context, .. }
            | Self::CaptureDenied { context, .. }
            | Self::Decode { context, .. }
            | Self::Encoding { context, .. }
            | Self::Region { context, .. }
            | Self::Io { context, .. }
            | Self::External { context, .. }
            | Self::Validation { context, .. }
            | Self::State { context, .. } => context,
        }
    }

    fn context_mut(&mut self) -> &mut ErrorContext {
        match self {
            Self::Config { context, .. }
            | Self::CaptureDenied { context, .. }
            | Self::Decode { context, .. }
            | Self::Encoding { context, .. }
            | Self::Region { context, .. }
            | Self::Io { context, .. }
            | Self::External { context, .. }
            | Self::Validation { context, .. }
            | Self::State { context, .. } => context,
        }
    }

    /// Short, stable category name used in logs
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config { .. } => "config",
            Self::CaptureDenied { .. } => "capture_denied",
            Self::Decode { .. } => "decode",
            Self::Encoding { .. } => "encoding",
            Self::Region { .. } => "region",
            Self::Io { .. } => "io",
            Self::External { .. } => "external",
            Self::Validation { .. } => "validation",
            Self::State { .. } => "state",
        }
    }
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanError::Config {
                field,
                value,
                reason,
                ..
            } => {
                write!(
                    f,
                    "Configuration error in '{}': {} (value: {})",
                    field, reason, value
                )
            }
            ScanError::CaptureDenied { device, reason, .. } => {
                write!(f, "Camera access denied for {}: {}", device, reason)
            }
            ScanError::Decode {
                decoder, reason, ..
            } => {
                write!(f, "Decoder {} rejected input: {}", decoder, reason)
            }
            ScanError::Encoding { format, reason, .. } => {
                write!(f, "Failed to encode {}: {}", format, reason)
            }
            ScanError::Region {
                operation, source, ..
            } => {
                write!(f, "Scan region {} failed: {}", operation, source)
            }
            ScanError::Io {
                operation,
                path,
                source,
                ..
            } => {
                if let Some(path) = path {
                    write!(
                        f,
                        "I/O error during {} on '{}': {}",
                        operation, path, source
                    )
                } else {
                    write!(f, "I/O error during {}: {}", operation, source)
                }
            }
            ScanError::External {
                library, source, ..
            } => {
                write!(f, "External library error in {}: {}", library, source)
            }
            ScanError::Validation {
                field,
                constraint,
                value,
                ..
            } => {
                write!(
                    f,
                    "Validation failed for '{}': {} (value: {})",
                    field, constraint, value
                )
            }
            ScanError::State {
                current_state,
                attempted_operation,
                reason,
                ..
            } => {
                write!(
                    f,
                    "Invalid state transition from '{}' when attempting '{}': {}",
                    current_state, attempted_operation, reason
                )
            }
        }
    }
}

impl StdError for ScanError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Region { source, .. } => Some(source),
            Self::External { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

/// Result type alias using our custom error type
pub type ScanResult<T> = Result<T, ScanError>;

/// Trait for errors that can be retried
pub trait Retryable {
    /// Check if this error can be retried
    fn is_retryable(&self) -> bool;

    /// Get the recommended retry delay in milliseconds
    fn retry_delay_ms(&self) -> Option<u64> {
        None
    }
}

impl Retryable for ScanError {
    fn is_retryable(&self) -> bool {
        // A denied camera is never retried automatically; only a remount asks again.
        self.context().retryable || matches!(self, Self::Io { .. })
    }

    fn retry_delay_ms(&self) -> Option<u64> {
        match self {
            Self::Io { .. } => Some(100),
            _ => None,
        }
    }
}

/// Trait for errors that can be recovered from
pub trait Recoverable {
    /// Check if this error can be recovered from
    fn is_recoverable(&self) -> bool;

    /// Get recovery strategies for this error
    fn recovery_strategies(&self) -> Vec<RecoveryStrategy>;
}

/// Recovery strategies for handling errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryStrategy {
    /// Retry the operation
    Retry { max_attempts: usize, delay_ms: u64 },
    /// Reinitialize the component
    Reinitialize { component: String },
    /// Skip the current operation
    Skip { reason: String },
}

impl Recoverable for ScanError {
    fn is_recoverable(&self) -> bool {
        self.context().recoverable
            || matches!(
                self,
                Self::Decode { .. } | Self::Region { .. } | Self::Encoding { .. } | Self::Io { .. }
            )
    }

    fn recovery_strategies(&self) -> Vec<RecoveryStrategy> {
        match self {
            Self::Decode { .. } | Self::Region { .. } | Self::Encoding { .. } => {
                vec![RecoveryStrategy::Skip {
                    reason: "Skip current frame".to_string(),
                }]
            }
            Self::CaptureDenied { .. } => vec![RecoveryStrategy::Reinitialize {
                component: "viewfinder".to_string(),
            }],
            Self::Io { .. } => vec![RecoveryStrategy::Retry {
                max_attempts: 3,
                delay_ms: 100,
            }],
            _ => vec![],
        }
    }
}

/// Trait for errors with severity levels
pub trait HasSeverity {
    /// Get the severity level of this error
    fn severity(&self) -> ErrorSeverity;
}

impl HasSeverity for ScanError {
    fn severity(&self) -> ErrorSeverity {
        self.context().severity
    }
}

/// Trait for errors that provide recovery suggestions
pub trait HasRecoverySuggestion {
    /// Get recovery suggestion for this error
    fn recovery_suggestion(&self) -> Option<&str>;
}

impl HasRecoverySuggestion for ScanError {
    fn recovery_suggestion(&self) -> Option<&str> {
        self.context().recovery_suggestion.as_deref()
    }
}

/// Error classification utilities
pub mod classify {
    use super::*;

    /// Errors the user has to see. Everything else stays in the log.
    pub fn is_user_visible(error: &ScanError) -> bool {
        matches!(error, ScanError::CaptureDenied { .. })
    }

    /// Errors that end a tick without ending the session
    pub fn skips_tick(error: &ScanError) -> bool {
        error
            .recovery_strategies()
            .iter()
            .any(|s| matches!(s, RecoveryStrategy::Skip { .. }))
    }
}

impl From<std::io::Error> for ScanError {
    fn from(error: std::io::Error) -> Self {
        Self::io("unknown", error)
    }
}

impl From<RegionError> for ScanError {
    fn from(error: RegionError) -> Self {
        Self::region("extract", error)
    }
}

impl From<image::ImageError> for ScanError {
    fn from(error: image::ImageError) -> Self {
        Self::encoding("png", error.to_string())
    }
}

impl From<base64::DecodeError> for ScanError {
    fn from(error: base64::DecodeError) -> Self {
        Self::encoding("base64", error.to_string())
    }
}

impl From<serde_json::Error> for ScanError {
    fn from(error: serde_json::Error) -> Self {
        Self::external("serde_json", error)
    }
}
