//! VolcEngine adapter error types

use cloudbridge::{CloudError, ErrorClassifier, ErrorKind};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VolcEngineError {
    /// Error object returned in `ResponseMetadata.Error`
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

pub type Result<T> = std::result::Result<T, VolcEngineError>;

/// Vendor code rules on top of the shared defaults
pub fn classifier() -> ErrorClassifier {
    ErrorClassifier::default()
        .override_rule("InvalidAccessKey", ErrorKind::InvalidConfig)
        .override_rule("SignatureDoesNotMatch", ErrorKind::InvalidConfig)
        .rule("OperationDenied.ResourceLocked", ErrorKind::InvalidStatus)
        .rule("Forbidden.NotSupport", ErrorKind::NotSupported)
        .rule("InvalidVolume.Unsupported", ErrorKind::NotSupported)
        .rule("NoSuchBucket", ErrorKind::NotFound)
        .rule("NoSuchKey", ErrorKind::NotFound)
        .rule("BucketNotEmpty", ErrorKind::InvalidStatus)
        .rule("BucketAlreadyOwnedByYou", ErrorKind::InvalidStatus)
}

impl From<VolcEngineError> for CloudError {
    fn from(err: VolcEngineError) -> Self {
        match err {
            VolcEngineError::Api {
                action,
                code,
                message,
                request_id,
            } => classifier()
                .classify(&code, &message)
                .context(format!("{} ({})", action, request_id)),
            VolcEngineError::Decode { action, reason } => {
                CloudError::ApiError(format!("malformed {} response: {}", action, reason))
            }
            VolcEngineError::CloudError(e) => e,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(code: &str) -> VolcEngineError {
        VolcEngineError::Api {
            action: "DescribeInstances".to_string(),
            code: code.to_string(),
            message: "something went wrong".to_string(),
            request_id: "req-1".to_string(),
        }
    }

    #[test]
    fn test_vendor_codes_map_to_kinds() {
        let cases = [
            ("InvalidInstance.NotFound", ErrorKind::NotFound),
            ("IncorrectInstanceStatus.Initializing", ErrorKind::InvalidStatus),
            ("InvalidAccessKey", ErrorKind::InvalidConfig),
            ("Forbidden.NotSupport", ErrorKind::NotSupported),
            ("QuotaExceeded.Volume", ErrorKind::Api),
        ];
        for (code, kind) in cases {
            let err: CloudError = api(code).into();
            assert_eq!(err.kind(), kind, "{}", code);
        }
    }

    #[test]
    fn test_vendor_code_kept_in_text() {
        let err: CloudError = api("InvalidOperation.Conflict").into();
        let text = err.to_string();
        assert!(text.starts_with("DescribeInstances (req-1)"));
        assert!(text.contains("InvalidOperation.Conflict"));
    }

    #[test]
    fn test_wrapped_cloud_error_passes_through() {
        let err: CloudError = VolcEngineError::from(CloudError::Timeout("poll".into())).into();
        assert_eq!(err.kind(), ErrorKind::Timeout);
    }
}
