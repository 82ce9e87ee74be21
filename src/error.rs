//! Error kinds shared across the engine (§7).
//!
//! All fallible internal paths return `Result<T, ZrError>` and propagate with `?`.
//! The numeric `OK=0`/negative-`ERR_*` convention described in §6.1 belongs to the
//! FFI shim that wraps this crate, not to the crate itself.

use thiserror::Error;

/// The six error kinds from §7, each carrying enough context to log without
/// the caller needing to parse a string.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ZrError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("out of memory: {0}")]
    Oom(String),

    #[error("limit exceeded ({limit}): {detail}")]
    Limit { limit: &'static str, detail: String },

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("format error at offset {offset}: {detail}")]
    Format { offset: usize, detail: String },

    #[error("platform error: {0}")]
    Platform(String),
}

impl ZrError {
    pub fn limit(limit: &'static str, detail: impl Into<String>) -> Self {
        ZrError::Limit { limit, detail: detail.into() }
    }

    pub fn format(offset: usize, detail: impl Into<String>) -> Self {
        ZrError::Format { offset, detail: detail.into() }
    }

    pub fn unsupported(detail: impl Into<String>) -> Self {
        ZrError::Unsupported(detail.into())
    }

    pub fn invalid_argument(detail: impl Into<String>) -> Self {
        ZrError::InvalidArgument(detail.into())
    }

    pub fn platform(detail: impl Into<String>) -> Self {
        ZrError::Platform(detail.into())
    }

    /// The §7 error kind name, stable across `Display` wording changes.
    pub fn kind(&self) -> &'static str {
        match self {
            ZrError::InvalidArgument(_) => "INVALID_ARGUMENT",
            ZrError::Oom(_) => "OOM",
            ZrError::Limit { .. } => "LIMIT",
            ZrError::Unsupported(_) => "UNSUPPORTED",
            ZrError::Format { .. } => "FORMAT",
            ZrError::Platform(_) => "PLATFORM",
        }
    }
}

pub type ZrResult<T> = Result<T, ZrError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_match_spec() {
        assert_eq!(ZrError::invalid_argument("x").kind(), "INVALID_ARGUMENT");
        assert_eq!(ZrError::limit("dl_max_cmds", "x").kind(), "LIMIT");
        assert_eq!(ZrError::unsupported("x").kind(), "UNSUPPORTED");
        assert_eq!(ZrError::format(4, "x").kind(), "FORMAT");
        assert_eq!(ZrError::platform("x").kind(), "PLATFORM");
        assert_eq!(ZrError::Oom("x".into()).kind(), "OOM");
    }
}
