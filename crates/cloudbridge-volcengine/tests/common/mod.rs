use cloudbridge::testing::{MockTransport, ReplyFormat, ScopeSigner};
use cloudbridge::{ApiResponse, ProviderConfig};
use cloudbridge_volcengine::{PROVIDER_ID, VolcEngineProvider};
use serde_json::{Value, json};
use std::sync::Arc;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// OpenAPI envelope around each canned result
pub struct Envelope;

impl ReplyFormat for Envelope {
    fn ok(action: &str, result: Value) -> ApiResponse {
        let body = json!({
            "ResponseMetadata": {"RequestId": "req-stub", "Action": action},
            "Result": result,
        });
        ApiResponse::ok(body.to_string())
    }

    fn error(action: &str, code: &str, message: &str) -> ApiResponse {
        let body = json!({
            "ResponseMetadata": {"RequestId": "req-stub", "Action": action, "Error": {"Code": code, "Message": message}}
        });
        ApiResponse::new(400, body.to_string())
    }
}

/// Canned OpenAPI responses keyed by action; the last one repeats
pub type OpenApiStub = MockTransport<Envelope>;

pub fn provider(stub: Arc<OpenApiStub>, read_only: bool) -> VolcEngineProvider {
    let config = ProviderConfig::new(PROVIDER_ID, "AKLTexample", "secret").with_read_only(read_only);
    VolcEngineProvider::new(&config, stub, Arc::new(ScopeSigner)).unwrap()
}

pub fn beijing(stub: &OpenApiStub) {
    stub.ok(
        "DescribeRegions",
        json!({"Regions": [{"RegionId": "cn-beijing"}], "NextToken": ""}),
    );
    stub.ok(
        "DescribeZones",
        json!({"Zones": [{"ZoneId": "cn-beijing-a"}]}),
    );
}

pub fn volume(id: &str, status: &str) -> Value {
    json!({
        "VolumeId": id,
        "VolumeName": "data",
        "VolumeType": "ESSD_PL0",
        "Kind": "data",
        "Size": 20,
        "Status": status,
        "ZoneId": "cn-beijing-a",
    })
}
