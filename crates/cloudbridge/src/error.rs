//! Cloud provider error types
//!
//! Every adapter maps its vendor errors onto the small sentinel vocabulary
//! in [`ErrorKind`] before handing them to callers. Callers branch on
//! [`CloudError::kind`], never on vendor message text.

use std::fmt;
use thiserror::Error;

/// Sentinel error kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Requested resource does not exist
    NotFound,
    /// Query by unique id returned more than one result
    DuplicateId,
    /// The vendor or edition does not offer the operation
    NotSupported,
    /// The operation is not wired up in this adapter
    NotImplemented,
    /// Operation attempted against a resource in the wrong state
    InvalidStatus,
    /// Blocked by the read-only guard
    AccountReadOnly,
    /// Caller-supplied argument failed validation
    InputParameter,
    /// A poll did not reach its goal in time
    Timeout,
    /// Provider configuration is unusable
    InvalidConfig,
    /// Vendor error that matched no sentinel
    Api,
    /// Network, IO or decoding failure below the vendor API
    Transport,
}

impl ErrorKind {
    /// Kinds that record a capability or policy decision. Retrying them
    /// cannot change the outcome.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ErrorKind::NotSupported | ErrorKind::NotImplemented | ErrorKind::AccountReadOnly
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::DuplicateId => "duplicate_id",
            ErrorKind::NotSupported => "not_supported",
            ErrorKind::NotImplemented => "not_implemented",
            ErrorKind::InvalidStatus => "invalid_status",
            ErrorKind::AccountReadOnly => "account_read_only",
            ErrorKind::InputParameter => "input_parameter",
            ErrorKind::Timeout => "timeout",
            ErrorKind::InvalidConfig => "invalid_config",
            ErrorKind::Api => "api",
            ErrorKind::Transport => "transport",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cloud provider errors
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Duplicate id: {0}")]
    DuplicateId(String),

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Account is read-only: {0}")]
    AccountReadOnly(String),

    #[error("Invalid input parameter: {0}")]
    InputParameter(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<CloudError>,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, CloudError>;

impl CloudError {
    /// Build the error carrying `kind`.
    pub fn from_kind(kind: ErrorKind, message: impl Into<String>) -> Self {
        let message = message.into();
        match kind {
            ErrorKind::NotFound => CloudError::NotFound(message),
            ErrorKind::DuplicateId => CloudError::DuplicateId(message),
            ErrorKind::NotSupported => CloudError::NotSupported(message),
            ErrorKind::NotImplemented => CloudError::NotImplemented(message),
            ErrorKind::InvalidStatus => CloudError::InvalidStatus(message),
            ErrorKind::AccountReadOnly => CloudError::AccountReadOnly(message),
            ErrorKind::InputParameter => CloudError::InputParameter(message),
            ErrorKind::Timeout => CloudError::Timeout(message),
            ErrorKind::InvalidConfig => CloudError::InvalidConfig(message),
            ErrorKind::Api => CloudError::ApiError(message),
            ErrorKind::Transport => CloudError::Transport(message),
        }
    }

    /// The sentinel kind, looking through any context layers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CloudError::Context { source, .. } => source.kind(),
            CloudError::NotFound(_) => ErrorKind::NotFound,
            CloudError::DuplicateId(_) => ErrorKind::DuplicateId,
            CloudError::NotSupported(_) => ErrorKind::NotSupported,
            CloudError::NotImplemented(_) => ErrorKind::NotImplemented,
            CloudError::InvalidStatus(_) => ErrorKind::InvalidStatus,
            CloudError::AccountReadOnly(_) => ErrorKind::AccountReadOnly,
            CloudError::InputParameter(_) => ErrorKind::InputParameter,
            CloudError::Timeout(_) => ErrorKind::Timeout,
            CloudError::InvalidConfig(_) | CloudError::Yaml(_) => ErrorKind::InvalidConfig,
            CloudError::ApiError(_) | CloudError::Json(_) => ErrorKind::Api,
            CloudError::Transport(_) | CloudError::Http(_) | CloudError::Io(_) => {
                ErrorKind::Transport
            }
        }
    }

    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind() == kind
    }

    pub fn is_not_found(&self) -> bool {
        self.is(ErrorKind::NotFound)
    }

    /// The innermost error below all context layers.
    pub fn root(&self) -> &CloudError {
        let mut current = self;
        while let CloudError::Context { source, .. } = current {
            current = source;
        }
        current
    }

    /// Wrap with operation/resource context, keeping the kind.
    pub fn context(self, context: impl Into<String>) -> Self {
        CloudError::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

/// Context helpers for results carrying a [`CloudError`]
pub trait ResultExt<T> {
    fn context(self, context: impl Into<String>) -> Result<T>;

    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<CloudError>,
{
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| Into::<CloudError>::into(e).context(context))
    }

    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| Into::<CloudError>::into(e).context(f()))
    }
}

/// Maps vendor error codes and messages onto [`ErrorKind`]s.
///
/// Rules are literal substrings checked in order against the vendor code
/// first and the message second; the first hit wins. Unmatched errors
/// become [`ErrorKind::Api`] and keep the vendor code in their text so the
/// retry classifier can still match on it.
#[derive(Debug, Clone)]
pub struct ErrorClassifier {
    rules: Vec<(String, ErrorKind)>,
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self::empty()
            .rule("NotFound", ErrorKind::NotFound)
            .rule("NotExist", ErrorKind::NotFound)
            .rule("InvalidParameter", ErrorKind::InputParameter)
            .rule("MissingParameter", ErrorKind::InputParameter)
            .rule("IncorrectInstanceStatus", ErrorKind::InvalidStatus)
            .rule("InvalidStatus", ErrorKind::InvalidStatus)
            .rule("Unsupported", ErrorKind::NotSupported)
            .rule("AccountReadOnly", ErrorKind::AccountReadOnly)
    }
}

impl ErrorClassifier {
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Append a rule checked after the existing ones.
    pub fn rule(mut self, pattern: impl Into<String>, kind: ErrorKind) -> Self {
        self.rules.push((pattern.into(), kind));
        self
    }

    /// Insert a rule that takes precedence over the existing ones.
    pub fn override_rule(mut self, pattern: impl Into<String>, kind: ErrorKind) -> Self {
        self.rules.insert(0, (pattern.into(), kind));
        self
    }

    pub fn kind_of(&self, code: &str, message: &str) -> ErrorKind {
        for text in [code, message] {
            if text.is_empty() {
                continue;
            }
            if let Some((_, kind)) = self.rules.iter().find(|(p, _)| text.contains(p.as_str())) {
                return *kind;
            }
        }
        ErrorKind::Api
    }

    pub fn classify(&self, code: &str, message: &str) -> CloudError {
        let kind = self.kind_of(code, message);
        let text = if code.is_empty() {
            message.to_string()
        } else {
            format!("{}: {}", code, message)
        };
        CloudError::from_kind(kind, text)
    }

    /// Fallback for vendors that answer with a bare HTTP status.
    pub fn classify_status(&self, status: u16, body: &str) -> CloudError {
        let kind = match status {
            404 => ErrorKind::NotFound,
            400 | 422 => ErrorKind::InputParameter,
            409 => ErrorKind::InvalidStatus,
            501 => ErrorKind::NotImplemented,
            _ => ErrorKind::Api,
        };
        CloudError::from_kind(kind, format!("HTTP {}: {}", status, body))
    }
}

/// Resolve a by-id query into its single result.
pub fn expect_single<T>(items: Vec<T>, id: &str) -> Result<T> {
    let count = items.len();
    let mut iter = items.into_iter();
    match (iter.next(), count) {
        (Some(item), 1) => Ok(item),
        (None, _) => Err(CloudError::NotFound(id.to_string())),
        (Some(_), n) => Err(CloudError::DuplicateId(format!("{} ({} results)", id, n))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_survives_context() {
        let err = CloudError::NotFound("disk-1".to_string())
            .context("GetDisk")
            .context("region cn-beijing");

        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.is_not_found());
        assert_eq!(
            err.to_string(),
            "region cn-beijing: GetDisk: Resource not found: disk-1"
        );
    }

    #[test]
    fn test_result_ext_context() {
        let result: std::result::Result<(), CloudError> =
            Err(CloudError::InvalidStatus("stopped".to_string()));
        let err = result.with_context(|| format!("StartInstance {}", "i-1")).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidStatus);
        assert!(err.to_string().starts_with("StartInstance i-1"));
    }

    #[test]
    fn test_terminal_kinds() {
        assert!(ErrorKind::NotSupported.is_terminal());
        assert!(ErrorKind::NotImplemented.is_terminal());
        assert!(ErrorKind::AccountReadOnly.is_terminal());
        assert!(!ErrorKind::NotFound.is_terminal());
        assert!(!ErrorKind::Api.is_terminal());
    }

    #[test]
    fn test_from_kind_keeps_kind() {
        let kinds = [
            ErrorKind::NotFound,
            ErrorKind::DuplicateId,
            ErrorKind::NotSupported,
            ErrorKind::NotImplemented,
            ErrorKind::InvalidStatus,
            ErrorKind::AccountReadOnly,
            ErrorKind::InputParameter,
            ErrorKind::Timeout,
            ErrorKind::InvalidConfig,
            ErrorKind::Api,
            ErrorKind::Transport,
        ];
        for kind in kinds {
            assert_eq!(CloudError::from_kind(kind, "x").kind(), kind);
        }
        assert!(
            CloudError::from_kind(ErrorKind::Transport, "connection reset")
                .to_string()
                .starts_with("Transport error")
        );
    }

    #[test]
    fn test_default_classifier() {
        let classifier = ErrorClassifier::default();

        assert_eq!(
            classifier.kind_of("InvalidInstance.NotFound", "instance does not exist"),
            ErrorKind::NotFound
        );
        assert_eq!(
            classifier.kind_of("IncorrectInstanceStatus.Initializing", ""),
            ErrorKind::InvalidStatus
        );
        assert_eq!(
            classifier.kind_of("", "MissingParameter: ZoneId"),
            ErrorKind::InputParameter
        );
        assert_eq!(
            classifier.kind_of("InvalidOperation.Conflict", "volume is busy"),
            ErrorKind::Api
        );
    }

    #[test]
    fn test_classified_error_keeps_vendor_code() {
        let err = ErrorClassifier::default().classify("InvalidOperation.Conflict", "busy");

        assert_eq!(err.kind(), ErrorKind::Api);
        assert!(err.to_string().contains("InvalidOperation.Conflict"));
    }

    #[test]
    fn test_override_rule_wins() {
        let classifier =
            ErrorClassifier::default().override_rule("Volume.NotFound", ErrorKind::InvalidStatus);

        assert_eq!(
            classifier.kind_of("Volume.NotFound", ""),
            ErrorKind::InvalidStatus
        );
    }

    #[test]
    fn test_classify_status() {
        let classifier = ErrorClassifier::default();
        assert!(classifier.classify_status(404, "").is_not_found());
        assert_eq!(
            classifier.classify_status(503, "unavailable").kind(),
            ErrorKind::Api
        );
    }

    #[test]
    fn test_expect_single() {
        assert_eq!(expect_single(vec!["a"], "id").unwrap(), "a");
        assert_eq!(
            expect_single(Vec::<&str>::new(), "id").unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            expect_single(vec!["a", "b"], "id").unwrap_err().kind(),
            ErrorKind::DuplicateId
        );
    }
}
