use crate::client::VolcEngineClient;
use cloudbridge::testing::{ReplyFormat, ScopeSigner};
use cloudbridge::{ApiResponse, ProviderConfig};
use serde_json::{Value, json};
use std::sync::Arc;

/// OpenAPI envelope: `Result` on success, `ResponseMetadata.Error` on failure
pub struct OpenApiReplies;

impl ReplyFormat for OpenApiReplies {
    fn ok(action: &str, result: Value) -> ApiResponse {
        let body = json!({
            "ResponseMetadata": {"RequestId": "req-ok", "Action": action},
            "Result": result,
        });
        ApiResponse::ok(body.to_string())
    }

    fn error(action: &str, code: &str, message: &str) -> ApiResponse {
        let body = json!({
            "ResponseMetadata": {
                "RequestId": "req-err",
                "Action": action,
                "Error": {"Code": code, "Message": message}
            }
        });
        ApiResponse::new(400, body.to_string())
    }
}

pub type MockTransport = cloudbridge::testing::MockTransport<OpenApiReplies>;

pub fn client(transport: Arc<MockTransport>) -> Arc<VolcEngineClient> {
    let config = ProviderConfig::new(crate::PROVIDER_ID, "AKLTexample", "secret");
    let client = VolcEngineClient::new(&config, transport).unwrap();
    Arc::new(client.with_signer(Arc::new(ScopeSigner)))
}
