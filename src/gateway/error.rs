use thiserror::Error;

use super::compensation::Compensation;
use crate::backend::ServiceError;

/// Coarse classification callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Invalid,
    NotFound,
    Unauthorized,
    Rejected,
    Transient,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Invalid => "invalid",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Rejected => "rejected",
            ErrorKind::Transient => "transient",
            ErrorKind::Internal => "internal",
        }
    }
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Invalid request: {0}")]
    Invalid(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("Unexpected document shape: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("{primary}; {compensation}")]
    Compensated {
        primary: Box<GatewayError>,
        compensation: Compensation,
    },
}

impl GatewayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::Invalid(_) => ErrorKind::Invalid,
            GatewayError::NotFound(_) => ErrorKind::NotFound,
            GatewayError::Service(e) => match e {
                ServiceError::NotFound(_) => ErrorKind::NotFound,
                ServiceError::Unauthorized(_) => ErrorKind::Unauthorized,
                ServiceError::Rejected { .. } => ErrorKind::Rejected,
                ServiceError::Unavailable(_) => ErrorKind::Transient,
                ServiceError::Malformed(_) => ErrorKind::Internal,
            },
            GatewayError::Decode(_) => ErrorKind::Internal,
            GatewayError::Compensated { primary, .. } => primary.kind(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }

    /// The fault that started it, looking through any compensation.
    pub fn primary(&self) -> &GatewayError {
        match self {
            GatewayError::Compensated { primary, .. } => primary.primary(),
            other => other,
        }
    }

    pub fn compensation(&self) -> Option<&Compensation> {
        match self {
            GatewayError::Compensated { compensation, .. } => Some(compensation),
            _ => None,
        }
    }

    /// HTTP status of a remote rejection, when there is one.
    pub fn rejected_status(&self) -> Option<u16> {
        match self.primary() {
            GatewayError::Service(ServiceError::Rejected { status, .. }) => Some(*status),
            _ => None,
        }
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::compensation::CleanupOutcome;

    #[test]
    fn service_errors_classify() {
        let cases = [
            (ServiceError::NotFound("x".into()), ErrorKind::NotFound),
            (ServiceError::Unauthorized("x".into()), ErrorKind::Unauthorized),
            (
                ServiceError::Rejected {
                    status: 409,
                    message: "x".into(),
                },
                ErrorKind::Rejected,
            ),
            (ServiceError::Unavailable("x".into()), ErrorKind::Transient),
            (ServiceError::Malformed("x".into()), ErrorKind::Internal),
        ];
        for (service, kind) in cases {
            assert_eq!(GatewayError::from(service).kind(), kind);
        }
    }

    #[test]
    fn only_transient_is_retryable() {
        assert!(GatewayError::from(ServiceError::Unavailable("x".into())).is_retryable());
        assert!(!GatewayError::NotFound("x".into()).is_retryable());
        assert!(!GatewayError::Invalid("x".into()).is_retryable());
    }

    #[test]
    fn compensation_does_not_mask_primary_kind() {
        let err = GatewayError::Compensated {
            primary: Box::new(ServiceError::Unavailable("write failed".into()).into()),
            compensation: Compensation {
                file_id: "f1".into(),
                outcome: CleanupOutcome::Failed("delete failed".into()),
            },
        };
        assert_eq!(err.kind(), ErrorKind::Transient);
        assert!(err.is_retryable());
        assert!(matches!(err.primary(), GatewayError::Service(_)));
        assert_eq!(err.compensation().unwrap().file_id, "f1");

        let message = err.to_string();
        assert!(message.contains("write failed"));
        assert!(message.contains("f1"));
    }
}
