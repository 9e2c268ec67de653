use std::fmt::{Display, Formatter};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SyncErrorCode {
    InvalidArgument,
    Internal,
    Downstream,
    Environment,
}

impl SyncErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncErrorCode::InvalidArgument => "sync/invalid-argument",
            SyncErrorCode::Internal => "sync/internal",
            SyncErrorCode::Downstream => "sync/downstream",
            SyncErrorCode::Environment => "sync/environment",
        }
    }
}

#[derive(Clone, Debug)]
pub struct SyncError {
    pub code: SyncErrorCode,
    message: String,
}

impl SyncError {
    pub fn new(code: SyncErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for SyncError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code_str())
    }
}

impl std::error::Error for SyncError {}

pub type SyncResult<T> = Result<T, SyncError>;

pub fn invalid_argument(message: impl Into<String>) -> SyncError {
    SyncError::new(SyncErrorCode::InvalidArgument, message)
}

pub fn internal_error(message: impl Into<String>) -> SyncError {
    SyncError::new(SyncErrorCode::Internal, message)
}

pub fn downstream_error(message: impl Into<String>) -> SyncError {
    SyncError::new(SyncErrorCode::Downstream, message)
}

pub fn environment_error(message: impl Into<String>) -> SyncError {
    SyncError::new(SyncErrorCode::Environment, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_code() {
        let err = downstream_error("client rejected track");
        assert_eq!(err.to_string(), "client rejected track (sync/downstream)");
        assert_eq!(err.code, SyncErrorCode::Downstream);
    }
}
