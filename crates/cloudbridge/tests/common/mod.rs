use async_trait::async_trait;
use cloudbridge::{
    ApiRequest, ApiResponse, CloudError, CloudResource, ErrorClassifier, HttpMethod, ReadOnlyGuard,
    Result, Tags, Transport,
};
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Transport answering each action from a per-action script
#[derive(Default)]
pub struct ScriptedTransport {
    scripts: Mutex<HashMap<String, VecDeque<ApiResponse>>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue a response for `action`; the last queued response repeats
    pub fn push(&self, action: &str, response: ApiResponse) {
        self.scripts
            .lock()
            .unwrap()
            .entry(action.to_string())
            .or_default()
            .push_back(response);
    }

    pub fn push_ok(&self, action: &str, body: Value) {
        self.push(action, ApiResponse::ok(body.to_string()));
    }

    pub fn push_error(&self, action: &str, code: &str, message: &str) {
        let body = json!({"Error": {"Code": code, "Message": message}});
        self.push(action, ApiResponse::new(400, body.to_string()));
    }

    pub fn actions(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.param("Action").unwrap_or("").to_string())
            .collect()
    }

    #[allow(dead_code)]
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let action = request.param("Action").unwrap_or("").to_string();
        self.requests.lock().unwrap().push(request);

        let mut scripts = self.scripts.lock().unwrap();
        let queue = scripts
            .get_mut(&action)
            .ok_or_else(|| CloudError::ApiError(format!("no script for {}", action)))?;
        let response = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        response.ok_or_else(|| CloudError::ApiError(format!("empty script for {}", action)))
    }
}

/// Minimal query-style client over a guarded transport
pub struct TestClient {
    transport: ReadOnlyGuard<Arc<ScriptedTransport>>,
    classifier: ErrorClassifier,
}

impl TestClient {
    pub fn new(transport: Arc<ScriptedTransport>, read_only: bool) -> Arc<Self> {
        Arc::new(Self {
            transport: ReadOnlyGuard::new(transport, "storage", read_only),
            classifier: ErrorClassifier::default(),
        })
    }

    pub async fn call(&self, action: &str, params: &[(&str, &str)]) -> Result<Value> {
        let request = ApiRequest::new(HttpMethod::Post, "https://api.test/")
            .with_param("Action", action)
            .with_params(params.iter().copied());
        let response = self.transport.send(request).await?;
        let body: Value = response.json()?;

        if let Some(error) = body.get("Error") {
            let code = error.get("Code").and_then(Value::as_str).unwrap_or("");
            let message = error.get("Message").and_then(Value::as_str).unwrap_or("");
            return Err(self.classifier.classify(code, message).context(action.to_string()));
        }
        if !response.is_success() {
            return Err(self.classifier.classify_status(response.status, &response.body));
        }
        Ok(body)
    }
}

/// Disk backed by [`TestClient`]
pub struct TestDisk {
    pub client: Arc<TestClient>,
    pub id: String,
    pub status: String,
}

#[async_trait]
impl CloudResource for TestDisk {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn name(&self) -> String {
        self.id.clone()
    }

    fn global_id(&self) -> String {
        format!("test/{}", self.id)
    }

    fn status(&self) -> String {
        self.status.clone()
    }

    async fn refresh(&mut self) -> Result<()> {
        let body = self.client.call("DescribeDisk", &[("DiskId", self.id.as_str())]).await?;
        self.status = body
            .get("Status")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();
        Ok(())
    }

    async fn get_tags(&self) -> Result<Tags> {
        let body = self.client.call("ListTags", &[("DiskId", self.id.as_str())]).await?;
        cloudbridge::tags::normalize(body.get("Tags").unwrap_or(&Value::Null))
    }
}
