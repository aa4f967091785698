//! Blob store adapters
//!
//! `S3ObjectStore` talks to the real bucket; `MemoryObjectStore` stands in
//! when no bucket is configured and drives the test suites, including
//! injected per-prefix failures.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use aws_config::{timeout::TimeoutConfig, BehaviorVersion, Region};
use aws_sdk_s3::error::ProvideErrorMetadata;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::Client;
use tracing::debug;

use reportal_core::{ObjectInfo, ObjectStore, ObjectStoreError};

/// Per-operation timeout for blob store calls
const STORAGE_TIMEOUT: Duration = Duration::from_secs(30);

/// S3-backed object store
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
}

impl S3ObjectStore {
    /// Build a client from ambient AWS configuration, with an optional
    /// explicit region
    pub async fn new(bucket: &str, region: Option<&str>) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest()).timeout_config(
            TimeoutConfig::builder()
                .operation_timeout(STORAGE_TIMEOUT)
                .build(),
        );
        if let Some(region) = region {
            loader = loader.region(Region::new(region.to_string()));
        }
        let shared_config = loader.load().await;

        Self {
            client: Client::new(&shared_config),
            bucket: bucket.to_string(),
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn list_objects(&self, prefix: &str) -> Result<Vec<ObjectInfo>, ObjectStoreError> {
        let mut objects = Vec::new();
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .into_paginator()
            .send();

        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| {
                if e.code() == Some("AccessDenied") {
                    ObjectStoreError::AccessDenied(prefix.to_string())
                } else {
                    ObjectStoreError::Request(e.to_string())
                }
            })?;

            for object in page.contents() {
                let Some(key) = object.key() else { continue };
                objects.push(ObjectInfo {
                    key: key.to_string(),
                    size: object.size().unwrap_or(0),
                    last_modified: object.last_modified().and_then(|dt| {
                        chrono::DateTime::from_timestamp(dt.secs(), dt.subsec_nanos())
                    }),
                });
            }
        }

        debug!(prefix, count = objects.len(), "Listed blob store objects");
        Ok(objects)
    }

    async fn presign_get(&self, key: &str, ttl: Duration) -> Result<String, ObjectStoreError> {
        let config = PresigningConfig::expires_in(ttl)
            .map_err(|e| ObjectStoreError::Request(e.to_string()))?;

        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(config)
            .await
            .map_err(|e| ObjectStoreError::Request(e.to_string()))?;

        Ok(request.uri().to_string())
    }
}

/// In-memory object store with injectable per-prefix failures
#[derive(Debug, Clone, Default)]
pub struct MemoryObjectStore {
    objects: Vec<ObjectInfo>,
    fail_prefixes: HashSet<String>,
    broken_prefixes: HashSet<String>,
}

impl MemoryObjectStore {
    /// Add an object under the given key
    pub fn with_object(
        mut self,
        key: &str,
        size: i64,
        last_modified: Option<chrono::DateTime<chrono::Utc>>,
    ) -> Self {
        self.objects.push(ObjectInfo {
            key: key.to_string(),
            size,
            last_modified,
        });
        self
    }

    /// Make listings under this prefix fail with an access error
    pub fn with_failing_prefix(mut self, prefix: &str) -> Self {
        self.fail_prefixes.insert(prefix.to_string());
        self
    }

    /// Make listings under this prefix fail with a generic request error
    pub fn with_broken_prefix(mut self, prefix: &str) -> Self {
        self.broken_prefixes.insert(prefix.to_string());
        self
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn list_objects(&self, prefix: &str) -> Result<Vec<ObjectInfo>, ObjectStoreError> {
        if self.fail_prefixes.contains(prefix) {
            return Err(ObjectStoreError::AccessDenied(prefix.to_string()));
        }
        if self.broken_prefixes.contains(prefix) {
            return Err(ObjectStoreError::Request(format!(
                "listing failed under {}",
                prefix
            )));
        }
        Ok(self
            .objects
            .iter()
            .filter(|o| o.key.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn presign_get(&self, key: &str, ttl: Duration) -> Result<String, ObjectStoreError> {
        Ok(format!(
            "https://objects.invalid/{}?expires={}",
            key,
            ttl.as_secs()
        ))
    }
}
