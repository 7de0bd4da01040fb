//! Kingsoft Cloud adapter error types

use cloudbridge::{CloudError, ErrorClassifier, ErrorKind};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum KsyunError {
    /// `{"Error": {"Code", "Message"}, "RequestId"}` answer
    #[error("{action} failed ({request_id}): {code}: {message}")]
    Api {
        action: String,
        code: String,
        message: String,
        request_id: String,
    },

    #[error("Malformed {action} response: {reason}")]
    Decode { action: String, reason: String },

    #[error("Cloud error: {0}")]
    CloudError(#[from] CloudError),
}

pub type Result<T> = std::result::Result<T, KsyunError>;

pub fn classifier() -> ErrorClassifier {
    ErrorClassifier::default()
        .override_rule("SignatureDoesNotMatch", ErrorKind::InvalidConfig)
        .override_rule("InvalidClientTokenId", ErrorKind::InvalidConfig)
        .override_rule("AuthFailure", ErrorKind::InvalidConfig)
        .rule("InvalidInstanceState", ErrorKind::InvalidStatus)
        .rule("InstanceStatusNotSupport", ErrorKind::InvalidStatus)
        .rule("OperationNotSupport", ErrorKind::NotSupported)
}

impl From<KsyunError> for CloudError {
    fn from(err: KsyunError) -> Self {
        match err {
            KsyunError::Api {
                action,
                code,
                message,
                request_id,
            } => classifier()
                .classify(&code, &message)
                .context(format!("{} ({})", action, request_id)),
            KsyunError::Decode { action, reason } => {
                CloudError::ApiError(format!("malformed {} response: {}", action, reason))
            }
            KsyunError::CloudError(e) => e,
        }
    }
}
