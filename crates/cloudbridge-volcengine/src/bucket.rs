//! TOS object storage buckets
//!
//! `ListBuckets` is account-wide, so the client caches one listing and
//! regions filter it by location. Creating or deleting a bucket clears the
//! cache; the next listing goes back to the vendor.

use crate::PROVIDER_ID;
use crate::client::VolcEngineClient;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cloudbridge::resource::{ObjectInfo, status};
use cloudbridge::{ApiRequest, Bucket, CloudError, CloudResource, HttpMethod, Page, Result};
use serde::Deserialize;
use std::sync::Arc;

pub const DEFAULT_STORAGE_CLASS: &str = "STANDARD";
pub const DEFAULT_ACL: &str = "private";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct BucketInfo {
    pub name: String,
    /// Region the bucket lives in
    pub location: String,
    pub creation_date: String,
    pub extranet_endpoint: String,
    pub storage_class: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct BucketList {
    buckets: Vec<BucketInfo>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct ObjectEntry {
    key: String,
    size: i64,
    #[serde(rename = "ETag")]
    etag: String,
    last_modified: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct ObjectList {
    contents: Vec<ObjectEntry>,
    is_truncated: bool,
    next_marker: String,
}

/// Percent-encode each segment of an object key
fn object_path(key: &str) -> String {
    key.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

impl VolcEngineClient {
    /// Every bucket of the account, served from the bucket cache
    pub async fn list_buckets(&self) -> Result<Vec<BucketInfo>> {
        self.buckets
            .get_or_fetch(|| async {
                let region = self.default_region();
                let request = ApiRequest::get(self.tos_url(region, None));
                let list: BucketList = self.tos(region, request).await?.json()?;
                tracing::debug!("listed {} volcengine buckets", list.buckets.len());
                Ok(list.buckets)
            })
            .await
    }

    pub async fn create_bucket(
        &self,
        region: &str,
        name: &str,
        storage_class: &str,
        acl: &str,
    ) -> Result<()> {
        if name.is_empty() {
            return Err(CloudError::InputParameter("bucket name is empty".to_string()));
        }
        let storage_class = if storage_class.is_empty() {
            DEFAULT_STORAGE_CLASS
        } else {
            storage_class
        };
        let acl = if acl.is_empty() { DEFAULT_ACL } else { acl };

        let request = ApiRequest::new(HttpMethod::Put, self.tos_url(region, Some(name)))
            .with_header("x-tos-storage-class", storage_class)
            .with_header("x-tos-acl", acl);
        self.tos(region, request).await?;
        self.buckets.invalidate();
        tracing::info!("created bucket {} in {}", name, region);
        Ok(())
    }

    pub async fn delete_bucket(&self, region: &str, name: &str) -> Result<()> {
        let request = ApiRequest::new(HttpMethod::Delete, self.tos_url(region, Some(name)));
        self.tos(region, request).await?;
        self.buckets.invalidate();
        tracing::info!("deleted bucket {} in {}", name, region);
        Ok(())
    }
}

pub struct VolcEngineBucket {
    client: Arc<VolcEngineClient>,
    info: BucketInfo,
    acl: String,
}

impl VolcEngineBucket {
    pub fn new(client: Arc<VolcEngineClient>, info: BucketInfo) -> Self {
        Self {
            client,
            info,
            acl: String::new(),
        }
    }

    fn region(&self) -> &str {
        &self.info.location
    }

    fn url(&self) -> String {
        self.client.tos_url(self.region(), Some(&self.info.name))
    }
}

#[async_trait]
impl CloudResource for VolcEngineBucket {
    fn id(&self) -> String {
        self.info.name.clone()
    }

    fn name(&self) -> String {
        self.info.name.clone()
    }

    fn global_id(&self) -> String {
        format!("{}/{}/{}", PROVIDER_ID, self.info.location, self.info.name)
    }

    fn status(&self) -> String {
        status::common::AVAILABLE.to_string()
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.info.creation_date)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }

    async fn refresh(&mut self) -> Result<()> {
        self.client.buckets.invalidate();
        let buckets = self.client.list_buckets().await?;
        let found = buckets
            .into_iter()
            .find(|b| b.name == self.info.name)
            .ok_or_else(|| CloudError::NotFound(self.global_id()))?;
        self.info = found;
        Ok(())
    }
}

#[async_trait]
impl Bucket for VolcEngineBucket {
    fn region_id(&self) -> String {
        self.info.location.clone()
    }

    fn location(&self) -> String {
        self.info.location.clone()
    }

    fn storage_class(&self) -> String {
        if self.info.storage_class.is_empty() {
            DEFAULT_STORAGE_CLASS.to_string()
        } else {
            self.info.storage_class.clone()
        }
    }

    /// Last ACL set through this handle; the listing does not report it
    fn acl(&self) -> String {
        self.acl.clone()
    }

    async fn set_acl(&mut self, acl: &str) -> Result<()> {
        let request = ApiRequest::new(HttpMethod::Put, self.url())
            .with_param("acl", "")
            .with_header("x-tos-acl", acl);
        self.client.tos(self.region(), request).await?;
        self.acl = acl.to_string();
        Ok(())
    }

    async fn list_objects(
        &self,
        prefix: &str,
        marker: &str,
        max_keys: u32,
    ) -> Result<Page<ObjectInfo>> {
        let mut request = ApiRequest::get(self.url()).with_param("max-keys", max_keys.to_string());
        if !prefix.is_empty() {
            request = request.with_param("prefix", prefix);
        }
        if !marker.is_empty() {
            request = request.with_param("marker", marker);
        }

        let list: ObjectList = self.client.tos(self.region(), request).await?.json()?;
        let objects = list
            .contents
            .into_iter()
            .map(|entry| ObjectInfo {
                last_modified: DateTime::parse_from_rfc3339(&entry.last_modified)
                    .ok()
                    .map(|t| t.with_timezone(&Utc)),
                key: entry.key,
                size_bytes: entry.size,
                etag: entry.etag.trim_matches('"').to_string(),
            })
            .collect();

        let next = if list.is_truncated { list.next_marker } else { String::new() };
        Ok(Page::with_marker(objects, next))
    }

    async fn delete_object(&self, key: &str) -> Result<()> {
        let url = format!("{}{}", self.url(), object_path(key));
        self.client
            .tos(self.region(), ApiRequest::new(HttpMethod::Delete, url))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockTransport, client};
    use cloudbridge::ErrorKind;
    use serde_json::json;

    const LIST: &str = "GET https://tos-cn-beijing.volces.com/";
    const LOGS: &str = "https://logs.tos-cn-beijing.volces.com/";

    fn listing(names: &[(&str, &str)]) -> String {
        let buckets: Vec<_> = names
            .iter()
            .map(|(name, location)| {
                json!({
                    "Name": name,
                    "Location": location,
                    "CreationDate": "2024-03-01T08:30:00Z",
                    "ExtranetEndpoint": format!("tos-{}.volces.com", location),
                })
            })
            .collect();
        json!({"Owner": {"ID": "2100000001"}, "Buckets": buckets}).to_string()
    }

    #[tokio::test]
    async fn test_listing_is_cached() {
        let transport = MockTransport::new();
        transport.raw(LIST, 200, &listing(&[("logs", "cn-beijing")]));
        let client = client(transport.clone());

        assert_eq!(client.list_buckets().await.unwrap().len(), 1);
        assert_eq!(client.list_buckets().await.unwrap().len(), 1);
        assert_eq!(transport.actions(), vec![LIST]);
    }

    #[tokio::test]
    async fn test_create_clears_cache() {
        let transport = MockTransport::new();
        transport.raw(LIST, 200, &listing(&[("logs", "cn-beijing")]));
        transport.raw(LIST, 200, &listing(&[("logs", "cn-beijing"), ("media", "cn-beijing")]));
        transport.raw("PUT https://media.tos-cn-beijing.volces.com/", 200, "");
        let client = client(transport.clone());

        assert_eq!(client.list_buckets().await.unwrap().len(), 1);
        client
            .create_bucket("cn-beijing", "media", "", "")
            .await
            .unwrap();
        assert_eq!(client.list_buckets().await.unwrap().len(), 2);

        let requests = transport.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[1].header("x-tos-acl"), Some("private"));
        assert_eq!(requests[1].header("x-tos-storage-class"), Some("STANDARD"));
        assert_eq!(requests[1].header("x-signed-scope"), Some("cn-beijing/tos"));
    }

    #[tokio::test]
    async fn test_delete_clears_cache() {
        let transport = MockTransport::new();
        transport.raw(LIST, 200, &listing(&[("logs", "cn-beijing")]));
        transport.raw(LIST, 200, &listing(&[]));
        transport.raw(&format!("DELETE {}", LOGS), 204, "");
        let client = client(transport.clone());

        client.list_buckets().await.unwrap();
        client.delete_bucket("cn-beijing", "logs").await.unwrap();
        assert!(client.list_buckets().await.unwrap().is_empty());
        assert_eq!(transport.actions().iter().filter(|a| a.as_str() == LIST).count(), 2);
    }

    #[tokio::test]
    async fn test_failed_create_keeps_cache() {
        let transport = MockTransport::new();
        transport.raw(LIST, 200, &listing(&[("logs", "cn-beijing")]));
        transport.raw(
            &format!("PUT {}", LOGS),
            409,
            r#"{"Code": "BucketAlreadyOwnedByYou", "Message": "exists", "RequestId": "r"}"#,
        );
        let client = client(transport.clone());

        client.list_buckets().await.unwrap();
        let err = client
            .create_bucket("cn-beijing", "logs", "", "")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidStatus);

        client.list_buckets().await.unwrap();
        assert_eq!(transport.actions().iter().filter(|a| a.as_str() == LIST).count(), 1);
    }

    #[tokio::test]
    async fn test_list_objects_by_marker() {
        let transport = MockTransport::new();
        transport.raw(
            &format!("GET {}", LOGS),
            200,
            &json!({
                "Name": "logs",
                "IsTruncated": true,
                "NextMarker": "app/2.log",
                "Contents": [
                    {"Key": "app/1.log", "Size": 12, "ETag": "\"abc\"", "LastModified": "2024-03-01T08:30:00Z"},
                    {"Key": "app/2.log", "Size": 7, "ETag": "\"def\"", "LastModified": "2024-03-01T08:31:00Z"}
                ]
            })
            .to_string(),
        );
        let bucket = VolcEngineBucket::new(
            client(transport.clone()),
            BucketInfo {
                name: "logs".to_string(),
                location: "cn-beijing".to_string(),
                ..Default::default()
            },
        );

        let page = bucket.list_objects("app/", "", 2).await.unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].etag, "abc");
        assert!(page.items[0].last_modified.is_some());
        assert_eq!(page.continuation(), Some(cloudbridge::Cursor::Marker("app/2.log".to_string())));

        let request = &transport.requests()[0];
        assert_eq!(request.param("prefix"), Some("app/"));
        assert_eq!(request.param("max-keys"), Some("2"));
        assert_eq!(request.param("marker"), None);
    }

    #[tokio::test]
    async fn test_delete_object_encodes_key() {
        let transport = MockTransport::new();
        transport.raw(
            "DELETE https://logs.tos-cn-beijing.volces.com/app/a%20b%2Bc.log",
            204,
            "",
        );
        let bucket = VolcEngineBucket::new(
            client(transport),
            BucketInfo {
                name: "logs".to_string(),
                location: "cn-beijing".to_string(),
                ..Default::default()
            },
        );

        bucket.delete_object("app/a b+c.log").await.unwrap();
    }

    #[test]
    fn test_bucket_fields() {
        let bucket = VolcEngineBucket::new(
            client(MockTransport::new()),
            serde_json::from_str::<BucketList>(&listing(&[("logs", "cn-shanghai")]))
                .unwrap()
                .buckets
                .into_iter()
                .next()
                .unwrap(),
        );
        assert_eq!(bucket.global_id(), "volcengine/cn-shanghai/logs");
        assert_eq!(bucket.region_id(), "cn-shanghai");
        assert_eq!(bucket.location(), "cn-shanghai");
        assert_eq!(bucket.info.extranet_endpoint, "tos-cn-shanghai.volces.com");
        assert_eq!(bucket.storage_class(), "STANDARD");
        assert!(bucket.created_at().is_some());
    }
}
