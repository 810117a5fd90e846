use std::sync::Arc;

use async_trait::async_trait;
use google_cloud_storage::client::{Client, ClientConfig};
use google_cloud_storage::http::Error as StorageError;
use google_cloud_storage::http::objects::delete::DeleteObjectRequest;
use google_cloud_storage::http::objects::list::ListObjectsRequest;
use tracing::{debug, info};
use url::Url;
use wipeout_application::ObjectStore;
use wipeout_core::{AppError, AppResult};
use wipeout_domain::{StorageObject, StoragePrefix};

use crate::google_access_token::{AccessTokenProvider, BearerTokenSource};

/// Production Cloud Storage endpoint.
pub const DEFAULT_STORAGE_BASE_URL: &str = "https://storage.googleapis.com";

/// Cloud Storage object store backed by the `google-cloud-storage` client.
#[derive(Clone)]
pub struct GcsObjectStore {
    client: Client,
    readiness_buckets: Vec<String>,
}

impl GcsObjectStore {
    /// Creates a store against `base_url`, authenticating through `token_provider`.
    ///
    /// `check_ready` lists one object from each of `readiness_buckets`.
    pub fn new(
        base_url: &str,
        token_provider: Arc<dyn AccessTokenProvider>,
        readiness_buckets: Vec<String>,
    ) -> AppResult<Self> {
        let endpoint = Url::parse(base_url).map_err(|error| {
            AppError::Validation(format!("invalid storage base URL '{base_url}': {error}"))
        })?;

        let config = ClientConfig {
            storage_endpoint: endpoint.as_str().trim_end_matches('/').to_owned(),
            token_source_provider: Some(Box::new(BearerTokenSource::new(token_provider))),
            ..ClientConfig::default()
        };

        Ok(Self {
            client: Client::new(config),
            readiness_buckets,
        })
    }
}

#[async_trait]
impl ObjectStore for GcsObjectStore {
    async fn check_ready(&self) -> AppResult<()> {
        for bucket in &self.readiness_buckets {
            let request = ListObjectsRequest {
                bucket: bucket.clone(),
                max_results: Some(1),
                ..ListObjectsRequest::default()
            };

            self.client.list_objects(&request).await.map_err(|error| {
                AppError::Unavailable(format!(
                    "storage bucket '{bucket}' is not reachable: {error}"
                ))
            })?;
        }

        info!(
            bucket_count = self.readiness_buckets.len(),
            "storage buckets reachable"
        );
        Ok(())
    }

    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &StoragePrefix,
    ) -> AppResult<Vec<StorageObject>> {
        let mut objects = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let request = ListObjectsRequest {
                bucket: bucket.to_owned(),
                prefix: Some(prefix.as_str().to_owned()),
                page_token: page_token.take(),
                ..ListObjectsRequest::default()
            };

            let page = self.client.list_objects(&request).await.map_err(|error| {
                AppError::Storage(format!(
                    "failed to list objects in 'gs://{bucket}/{prefix}': {error}"
                ))
            })?;

            objects.extend(page.items.unwrap_or_default().into_iter().map(|item| {
                StorageObject {
                    bucket: bucket.to_owned(),
                    name: item.name,
                    generation: Some(item.generation),
                }
            }));

            match page.next_page_token {
                Some(next) if !next.is_empty() => page_token = Some(next),
                _ => break,
            }
        }

        debug!(bucket, prefix = %prefix, object_count = objects.len(), "listed objects");
        Ok(objects)
    }

    async fn delete_object(&self, object: &StorageObject) -> AppResult<()> {
        let request = DeleteObjectRequest {
            bucket: object.bucket.clone(),
            object: object.name.clone(),
            generation: object.generation,
            ..DeleteObjectRequest::default()
        };

        match self.client.delete_object(&request).await {
            Ok(()) => Ok(()),
            Err(StorageError::Response(response)) if response.code == 404 => {
                debug!(
                    bucket = %object.bucket,
                    object = %object.name,
                    "object already absent"
                );
                Ok(())
            }
            Err(error) => Err(AppError::Storage(format!(
                "failed to delete 'gs://{}/{}': {error}",
                object.bucket, object.name
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::{Value, json};
    use wipeout_application::ObjectStore;
    use wipeout_core::AppError;
    use wipeout_domain::{AgentId, PathTemplate, SessionId, StorageObject, StoragePrefix};
    use wiremock::matchers::{header, method, path, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::GcsObjectStore;
    use crate::google_access_token::StaticAccessTokenProvider;

    fn store(server: &MockServer, readiness_buckets: &[&str]) -> GcsObjectStore {
        GcsObjectStore::new(
            server.uri().as_str(),
            Arc::new(StaticAccessTokenProvider::new("test-token")),
            readiness_buckets.iter().map(|bucket| (*bucket).to_owned()).collect(),
        )
        .unwrap_or_else(|_| unreachable!())
    }

    fn session_prefix() -> StoragePrefix {
        let template = PathTemplate::parse("ttm/{agent_id}/{date_str}/{session_id}/")
            .unwrap_or_else(|_| unreachable!());
        let agent = AgentId::new("agent-7").unwrap_or_else(|_| unreachable!());
        let session = SessionId::new("S1").unwrap_or_else(|_| unreachable!());
        let date = chrono::NaiveDate::from_ymd_opt(2024, 3, 5).unwrap_or_default();

        template.render(&agent, date, &session)
    }

    fn object(name: &str, generation: Option<i64>) -> StorageObject {
        StorageObject {
            bucket: "audio".to_owned(),
            name: name.to_owned(),
            generation,
        }
    }

    fn object_resource(name: &str, generation: i64) -> Value {
        json!({
            "kind": "storage#object",
            "id": format!("audio/{name}/{generation}"),
            "selfLink": format!("https://www.googleapis.com/storage/v1/b/audio/o/{name}"),
            "mediaLink": format!(
                "https://storage.googleapis.com/download/storage/v1/b/audio/o/{name}?alt=media"
            ),
            "name": name,
            "bucket": "audio",
            "generation": generation.to_string(),
            "metageneration": "1",
            "contentType": "audio/wav",
            "storageClass": "STANDARD",
            "size": "48044",
            "md5Hash": "1B2M2Y8AsgTpgAmY7PhCfg==",
            "crc32c": "AAAAAA==",
            "etag": "CJ2Ck9Tz2IQDEAE=",
            "timeCreated": "2024-03-05T10:00:00.000Z",
            "updated": "2024-03-05T10:00:00.000Z"
        })
    }

    fn error_body(code: u16, message: &str) -> Value {
        json!({
            "error": {
                "code": code,
                "message": message,
                "errors": []
            }
        })
    }

    #[tokio::test]
    async fn readiness_lists_one_object_per_bucket() {
        let server = MockServer::start().await;
        for bucket in ["audio", "archive"] {
            Mock::given(method("GET"))
                .and(path(format!("/storage/v1/b/{bucket}/o")))
                .and(query_param("maxResults", "1"))
                .and(header("authorization", "Bearer test-token"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "kind": "storage#objects"
                })))
                .expect(1)
                .mount(&server)
                .await;
        }

        let result = store(&server, &["audio", "archive"]).check_ready().await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn unreachable_bucket_fails_readiness() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/storage/v1/b/audio/o"))
            .respond_with(
                ResponseTemplate::new(403).set_body_json(error_body(
                    403,
                    "caller does not have storage.objects.list access",
                )),
            )
            .mount(&server)
            .await;

        let result = store(&server, &["audio"]).check_ready().await;

        match result {
            Err(AppError::Unavailable(message)) => assert!(message.contains("'audio'")),
            other => panic!("expected unavailable error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn readiness_without_buckets_makes_no_calls() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        assert!(store(&server, &[]).check_ready().await.is_ok());
    }

    #[tokio::test]
    async fn list_objects_follows_page_tokens() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/storage/v1/b/audio/o"))
            .and(query_param("prefix", "ttm/agent-7/2024-03-05/S1/"))
            .and(query_param_is_missing("pageToken"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "kind": "storage#objects",
                "items": [object_resource("ttm/agent-7/2024-03-05/S1/a.wav", 17)],
                "nextPageToken": "next"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/storage/v1/b/audio/o"))
            .and(query_param("pageToken", "next"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "kind": "storage#objects",
                "items": [object_resource("ttm/agent-7/2024-03-05/S1/b.wav", 18)]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let objects = store(&server, &[])
            .list_objects("audio", &session_prefix())
            .await;

        assert!(objects.is_ok());
        assert_eq!(
            objects.unwrap_or_default(),
            vec![
                object("ttm/agent-7/2024-03-05/S1/a.wav", Some(17)),
                object("ttm/agent-7/2024-03-05/S1/b.wav", Some(18)),
            ]
        );
    }

    #[tokio::test]
    async fn empty_listing_yields_no_objects() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/storage/v1/b/audio/o"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "kind": "storage#objects"
            })))
            .mount(&server)
            .await;

        let objects = store(&server, &[])
            .list_objects("audio", &session_prefix())
            .await;

        assert!(objects.is_ok());
        assert!(objects.unwrap_or_default().is_empty());
    }

    #[tokio::test]
    async fn delete_encodes_object_name_as_single_segment() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/storage/v1/b/audio/o/ttm%2Fagent-7%2Fa.wav"))
            .and(query_param("generation", "17"))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let result = store(&server, &[])
            .delete_object(&object("ttm/agent-7/a.wav", Some(17)))
            .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn deleting_missing_object_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_json(error_body(404, "No such object: audio/ttm/gone.wav")),
            )
            .mount(&server)
            .await;

        let result = store(&server, &[])
            .delete_object(&object("ttm/gone.wav", None))
            .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn delete_failure_is_a_storage_error() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .respond_with(
                ResponseTemplate::new(403).set_body_json(error_body(
                    403,
                    "caller does not have storage.objects.delete access",
                )),
            )
            .mount(&server)
            .await;

        let result = store(&server, &[])
            .delete_object(&object("ttm/a.wav", None))
            .await;

        match result {
            Err(AppError::Storage(message)) => {
                assert!(message.contains("gs://audio/ttm/a.wav"));
            }
            other => panic!("expected storage error, got {other:?}"),
        }
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let result = GcsObjectStore::new(
            "not a url",
            Arc::new(StaticAccessTokenProvider::new("token")),
            Vec::new(),
        );

        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
