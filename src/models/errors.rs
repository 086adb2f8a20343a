//! Centralized Error Handling Module
//!
//! Every failure that crosses a module boundary carries a unique error code,
//! so log lines and API responses can be grepped and alerted on.
//!
//! Error codes follow pattern: CATEGORY_SPECIFIC_ERROR
//! - WS_xxx: Realtime feed errors
//! - AI_xxx: Compute inference errors
//! - API_xxx: API errors
//! - CFG_xxx: Configuration errors

use std::fmt;

/// Application-wide error type
#[derive(Debug)]
pub struct AppError {
    /// Unique error code for logging/monitoring
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Optional underlying error
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new AppError
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Create AppError with source error
    pub fn with_source(
        code: ErrorCode,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Get error code as string (for logging)
    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Unique error codes for monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // ============================================
    // Realtime Feed Errors (1xx)
    // ============================================
    /// WebSocket connection could not be opened
    RealtimeConnectionFailed,
    /// Outbound message could not be serialized
    RealtimeEncodeFailed,
    /// Inbound frame is not a valid envelope
    RealtimeInvalidMessage,
    /// Reconnect budget exhausted
    RealtimeGaveUp,

    // ============================================
    // Compute Inference Errors (2xx)
    // ============================================
    /// Inference provider not configured
    InferenceNotConfigured,
    /// Inference request failed in transport
    InferenceRequestFailed,
    /// Inference request timed out
    InferenceTimeout,
    /// Inference response could not be decoded
    InferenceInvalidResponse,

    // ============================================
    // API Errors (3xx)
    // ============================================
    /// Invalid request format
    ApiBadRequest,
    /// Rate limit exceeded
    ApiRateLimited,
    /// Internal server error
    ApiInternalError,
    /// Resource not found
    ApiNotFound,

    // ============================================
    // Configuration Errors (4xx)
    // ============================================
    /// Invalid configuration value
    ConfigInvalidValue,

    // ============================================
    // Generic Errors (9xx)
    // ============================================
    /// Unknown error
    Unknown,
}

impl ErrorCode {
    /// Get string representation of error code
    pub fn as_str(&self) -> &'static str {
        match self {
            // Realtime Errors
            Self::RealtimeConnectionFailed => "WS_CONNECTION_FAILED",
            Self::RealtimeEncodeFailed => "WS_ENCODE_FAILED",
            Self::RealtimeInvalidMessage => "WS_INVALID_MESSAGE",
            Self::RealtimeGaveUp => "WS_GAVE_UP",

            // Inference Errors
            Self::InferenceNotConfigured => "AI_NOT_CONFIGURED",
            Self::InferenceRequestFailed => "AI_REQUEST_FAILED",
            Self::InferenceTimeout => "AI_TIMEOUT",
            Self::InferenceInvalidResponse => "AI_INVALID_RESPONSE",

            // API Errors
            Self::ApiBadRequest => "API_BAD_REQUEST",
            Self::ApiRateLimited => "API_RATE_LIMITED",
            Self::ApiInternalError => "API_INTERNAL_ERROR",
            Self::ApiNotFound => "API_NOT_FOUND",

            // Configuration Errors
            Self::ConfigInvalidValue => "CFG_INVALID_VALUE",

            // Generic
            Self::Unknown => "UNKNOWN_ERROR",
        }
    }

    /// Get HTTP status code for API responses
    pub fn http_status(&self) -> u16 {
        match self {
            Self::ApiBadRequest | Self::ConfigInvalidValue | Self::RealtimeInvalidMessage => 400,
            Self::ApiNotFound => 404,
            Self::ApiRateLimited => 429,
            Self::InferenceTimeout => 504,
            Self::InferenceNotConfigured => 503,
            _ => 500,
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RealtimeConnectionFailed
                | Self::InferenceRequestFailed
                | Self::InferenceTimeout
                | Self::ApiRateLimited
        )
    }
}

// ============================================
// Convenience constructors
// ============================================

impl AppError {
    /// Realtime connection failed
    pub fn connection_failed(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::RealtimeConnectionFailed, msg)
    }

    /// Inbound envelope rejected
    pub fn invalid_message(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::RealtimeInvalidMessage, msg)
    }

    /// Inference provider missing
    pub fn inference_not_configured() -> Self {
        Self::new(
            ErrorCode::InferenceNotConfigured,
            "No compute inference endpoint configured",
        )
    }

    /// Inference response could not be decoded
    pub fn invalid_inference(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InferenceInvalidResponse, msg)
    }

    /// Invalid configuration value
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigInvalidValue, msg)
    }

    /// API bad request
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ApiBadRequest, msg)
    }

    /// API resource not found
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ApiNotFound, msg)
    }

    /// API internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ApiInternalError, msg)
    }
}

// ============================================
// Result type alias
// ============================================

/// Application Result type
pub type AppResult<T> = Result<T, AppError>;

// ============================================
// Conversion from common error types
// ============================================

impl From<eyre::Report> for AppError {
    fn from(err: eyre::Report) -> Self {
        Self::new(ErrorCode::Unknown, err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorCode::Unknown, "IO error", err)
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::new(ErrorCode::InferenceTimeout, "Inference request timeout")
        } else if err.is_decode() {
            Self::with_source(
                ErrorCode::InferenceInvalidResponse,
                "Inference response decode failed",
                err,
            )
        } else {
            Self::with_source(ErrorCode::InferenceRequestFailed, "Inference request failed", err)
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(ErrorCode::Unknown, "JSON error", err)
    }
}
