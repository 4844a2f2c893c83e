// src/upload/minio.rs

//! S3-compatible object storage (MinIO, AWS S3) via `aws-sdk-s3`.
//!
//! Config keys: `endpoint`, `access_key`, `secret_key`, `bucket` (required);
//! `region` (default `us-east-1`), `prefix`, `secure` (default true, only
//! used when `endpoint` carries no scheme).

use std::path::Path;

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::upload::error::UploadError;
use crate::upload::provider::Provider;

const DEFAULT_REGION: &str = "us-east-1";

struct Connection {
    client: Client,
    bucket: String,
    prefix: String,
}

#[derive(Default)]
pub struct MinioProvider {
    conn: Option<Connection>,
}

impl MinioProvider {
    pub const NAME: &'static str = "minio";

    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Provider for MinioProvider {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn configure(&mut self, config: &Map<String, Value>) -> Result<(), UploadError> {
        let endpoint = required(config, "endpoint")?;
        let access_key = required(config, "access_key")?;
        let secret_key = required(config, "secret_key")?;
        let bucket = required(config, "bucket")?;
        let secure = bool_value(config, "secure").unwrap_or(true);
        let endpoint_url = endpoint_url(&endpoint, secure)?;
        let region = string_value(config, "region").unwrap_or_else(|| DEFAULT_REGION.to_string());
        let prefix = string_value(config, "prefix").unwrap_or_default();

        let s3_config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(&endpoint_url)
            .region(Region::new(region))
            .credentials_provider(Credentials::new(access_key, secret_key, None, None, "ghost"))
            .force_path_style(true)
            .build();
        let client = Client::from_conf(s3_config);

        debug!(endpoint = %endpoint_url, bucket = %bucket, "checking bucket");
        if let Err(err) = client.head_bucket().bucket(&bucket).send().await {
            let missing = err.as_service_error().is_some_and(|e| e.is_not_found());
            return Err(if missing {
                UploadError::BucketMissing {
                    provider: Self::NAME,
                    bucket,
                }
            } else {
                UploadError::Backend {
                    provider: Self::NAME,
                    message: format!(
                        "failed to check bucket existence: {}",
                        DisplayErrorContext(&err)
                    ),
                }
            });
        }

        self.conn = Some(Connection {
            client,
            bucket,
            prefix,
        });
        Ok(())
    }

    async fn upload(&self, local: &Path, remote: &str) -> Result<(), UploadError> {
        let conn = self.conn.as_ref().ok_or(UploadError::NotConfigured(Self::NAME))?;
        let key = object_key(&conn.prefix, remote);

        let body = ByteStream::from_path(local).await.map_err(|e| UploadError::Backend {
            provider: Self::NAME,
            message: format!("failed to read {}: {e}", local.display()),
        })?;

        conn.client
            .put_object()
            .bucket(&conn.bucket)
            .key(&key)
            .body(body)
            .send()
            .await
            .map_err(|e| UploadError::Backend {
                provider: Self::NAME,
                message: format!("failed to upload to {key}: {}", DisplayErrorContext(&e)),
            })?;

        info!(bucket = %conn.bucket, key, "uploaded");
        Ok(())
    }
}

fn required(config: &Map<String, Value>, key: &'static str) -> Result<String, UploadError> {
    string_value(config, key)
        .filter(|v| !v.is_empty())
        .ok_or(UploadError::MissingKey {
            provider: MinioProvider::NAME,
            key,
        })
}

/// Scalars are accepted as strings; `key=123` arrives as a number.
fn string_value(config: &Map<String, Value>, key: &str) -> Option<String> {
    match config.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Booleans may arrive typed or as strings, depending on the source layer.
fn bool_value(config: &Map<String, Value>, key: &str) -> Option<bool> {
    match config.get(key)? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "t" | "1" => Some(true),
            "false" | "f" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// An endpoint with an http(s) scheme decides `secure` itself; a bare
/// `host:port` gets the scheme from `secure`.
fn endpoint_url(endpoint: &str, secure: bool) -> Result<String, UploadError> {
    let endpoint = endpoint.trim();
    let scheme = endpoint.split_once("://").map(|(scheme, _)| scheme);

    if let Some(scheme @ ("http" | "https")) = scheme {
        let url = reqwest::Url::parse(endpoint).ok();
        let host = url
            .as_ref()
            .and_then(|u| u.host_str())
            .filter(|h| !h.is_empty())
            .ok_or_else(|| UploadError::InvalidConfig {
                provider: MinioProvider::NAME,
                message: "invalid endpoint URL".to_string(),
            })?;
        return Ok(match url.as_ref().and_then(|u| u.port()) {
            Some(port) => format!("{scheme}://{host}:{port}"),
            None => format!("{scheme}://{host}"),
        });
    }

    let scheme = if secure { "https" } else { "http" };
    Ok(format!("{scheme}://{endpoint}"))
}

fn object_key(prefix: &str, remote: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        remote.to_string()
    } else {
        format!("{prefix}/{}", remote.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn config(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    #[test]
    fn endpoint_scheme_overrides_secure_flag() {
        assert_eq!(endpoint_url("http://minio:9000", true).unwrap(), "http://minio:9000");
        assert_eq!(
            endpoint_url("https://s3.example.com/", false).unwrap(),
            "https://s3.example.com"
        );
        assert_eq!(endpoint_url("minio:9000", false).unwrap(), "http://minio:9000");
        assert_eq!(endpoint_url("minio:9000", true).unwrap(), "https://minio:9000");
        assert!(matches!(
            endpoint_url("http://", true),
            Err(UploadError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn prefix_joins_with_single_slash() {
        assert_eq!(object_key("", "out/stdout.txt"), "out/stdout.txt");
        assert_eq!(object_key("runs/42/", "/stdout.txt"), "runs/42/stdout.txt");
        assert_eq!(object_key("runs", "stdout.txt"), "runs/stdout.txt");
    }

    #[test]
    fn secure_accepts_typed_and_string_values() {
        let cfg = config(json!({"a": false, "b": "TRUE", "c": "nope", "d": 1}));
        assert_eq!(bool_value(&cfg, "a"), Some(false));
        assert_eq!(bool_value(&cfg, "b"), Some(true));
        assert_eq!(bool_value(&cfg, "c"), None);
        assert_eq!(bool_value(&cfg, "d"), None);
        assert_eq!(bool_value(&cfg, "missing"), None);
    }

    #[test]
    fn numeric_values_are_read_as_strings() {
        let cfg = config(json!({"access_key": 12345, "bucket": "", "region": "eu-west-1"}));
        assert_eq!(required(&cfg, "access_key").unwrap(), "12345");
        assert_eq!(string_value(&cfg, "region").as_deref(), Some("eu-west-1"));
        assert!(matches!(
            required(&cfg, "bucket"),
            Err(UploadError::MissingKey { key: "bucket", .. })
        ));
    }

    #[tokio::test]
    async fn missing_keys_are_reported_before_connecting() {
        let mut provider = MinioProvider::new();
        let cfg = config(json!({"endpoint": "localhost:9000", "access_key": "a", "bucket": "b"}));

        match provider.configure(&cfg).await {
            Err(UploadError::MissingKey { key, .. }) => assert_eq!(key, "secret_key"),
            other => panic!("expected missing secret_key, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn upload_before_configure_fails() {
        let provider = MinioProvider::new();
        let err = provider.upload(Path::new("x"), "y").await.unwrap_err();
        assert!(matches!(err, UploadError::NotConfigured("minio")));
    }
}
