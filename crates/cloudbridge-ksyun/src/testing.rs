use crate::client::KsyunClient;
use cloudbridge::testing::{ReplyFormat, ScopeSigner};
use cloudbridge::{ApiResponse, ProviderConfig};
use serde_json::{Value, json};
use std::sync::Arc;

/// Flat answers with `RequestId`; errors carry an `Error` object
pub struct KsyunReplies;

impl ReplyFormat for KsyunReplies {
    fn ok(_action: &str, mut body: Value) -> ApiResponse {
        if let Some(map) = body.as_object_mut() {
            map.insert("RequestId".to_string(), json!("req-ok"));
        }
        ApiResponse::ok(body.to_string())
    }

    fn error(_action: &str, code: &str, message: &str) -> ApiResponse {
        let body = json!({
            "RequestId": "req-err",
            "Error": {"Code": code, "Message": message, "Type": "Sender"}
        });
        ApiResponse::new(400, body.to_string())
    }
}

pub type MockTransport = cloudbridge::testing::MockTransport<KsyunReplies>;

pub fn client(transport: Arc<MockTransport>) -> Arc<KsyunClient> {
    let config = ProviderConfig::new(crate::PROVIDER_ID, "AKLTksyun", "secret");
    let client = KsyunClient::new(&config, transport).unwrap();
    Arc::new(client.with_signer(Arc::new(ScopeSigner)))
}
