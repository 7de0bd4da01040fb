use cloudbridge::testing::{MockTransport, ReplyFormat, ScopeSigner};
use cloudbridge::{ApiResponse, ProviderConfig};
use cloudbridge_ksyun::{KsyunProvider, PROVIDER_ID};
use serde_json::{Value, json};
use std::sync::Arc;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Kingsoft Cloud answers are the body itself
pub struct FlatReplies;

impl ReplyFormat for FlatReplies {
    fn ok(_action: &str, body: Value) -> ApiResponse {
        ApiResponse::ok(body.to_string())
    }

    fn error(_action: &str, code: &str, message: &str) -> ApiResponse {
        let body = json!({"RequestId": "req", "Error": {"Code": code, "Message": message}});
        ApiResponse::new(400, body.to_string())
    }
}

/// Scripted Kingsoft Cloud endpoint; the last answer per action repeats
pub type KsyunStub = MockTransport<FlatReplies>;

pub fn provider(stub: Arc<KsyunStub>) -> KsyunProvider {
    let config = ProviderConfig::new(PROVIDER_ID, "AKLTksyun", "secret")
        .with_option("project_ids", json!(["100"]));
    KsyunProvider::new(&config, stub, Arc::new(ScopeSigner)).unwrap()
}

pub fn instances(state: &str) -> Value {
    json!({
        "RequestId": "req",
        "InstancesSet": [{
            "InstanceId": "i-web",
            "InstanceName": "web",
            "InstanceType": "S6.2B",
            "InstanceConfigure": {"VCPU": 2, "MemoryGb": 4},
            "InstanceState": {"Name": state},
            "AvailabilityZone": "cn-beijing-6a"
        }],
        "Marker": 1,
        "InstanceCount": 1
    })
}
