//! In-memory gateways and event builders for tests

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use aws_lambda_events::s3::S3Event;
use lambda_runtime::{Context, LambdaEvent};
use serde_json::json;

use crate::notify::{Notification, NotificationGateway, NotifyError};
use crate::storage::{StorageError, StorageGateway};

#[derive(Default)]
pub struct MemoryStorage {
    objects: Mutex<HashMap<(String, String), Vec<u8>>>,
    fail_writes: bool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every put is rejected, as with a destination bucket that is missing
    /// or not writable
    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    pub fn insert(&self, bucket: &str, key: &str, body: Vec<u8>) {
        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()), body);
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }
}

#[async_trait]
impl StorageGateway for MemoryStorage {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        self.object(bucket, key).ok_or_else(|| StorageError::NotFound {
            bucket: bucket.to_string(),
            key: key.to_string(),
        })
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
    ) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::Request(format!(
                "Failed to put S3 object: NoSuchBucket: {}",
                bucket
            )));
        }
        self.insert(bucket, key, body);
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    published: Mutex<Vec<(String, Notification)>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            published: Mutex::default(),
            fail: true,
        }
    }

    pub fn published(&self) -> Vec<(String, Notification)> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationGateway for RecordingNotifier {
    async fn publish(
        &self,
        topic_arn: &str,
        notification: &Notification,
    ) -> Result<(), NotifyError> {
        if self.fail {
            return Err(NotifyError::Publish {
                topic_arn: topic_arn.to_string(),
                reason: "NotFound: Topic does not exist".to_string(),
            });
        }
        self.published
            .lock()
            .unwrap()
            .push((topic_arn.to_string(), notification.clone()));
        Ok(())
    }
}

/// Build an `ObjectCreated:Put` notification with one record per
/// `(bucket, key)` pair
pub fn s3_event(objects: &[(&str, &str)]) -> S3Event {
    let records: Vec<_> = objects
        .iter()
        .map(|(bucket, key)| {
            json!({
                "eventVersion": "2.1",
                "eventSource": "aws:s3",
                "awsRegion": "ap-south-1",
                "eventTime": "2024-03-01T10:15:30.000Z",
                "eventName": "ObjectCreated:Put",
                "userIdentity": {"principalId": "AWS:AIDAEXAMPLE"},
                "requestParameters": {"sourceIPAddress": "203.0.113.10"},
                "responseElements": {
                    "x-amz-request-id": "C3D13FE58DE4C810",
                    "x-amz-id-2": "FMyUVURIY8/IgAtTv8xRjskZQpcIZ9KG4V5Wp6S7S/JRWeUWerMUE5JgHvANOjpD"
                },
                "s3": {
                    "s3SchemaVersion": "1.0",
                    "configurationId": "delivery-filter",
                    "bucket": {
                        "name": bucket,
                        "ownerIdentity": {"principalId": "A3NL1KOZZKExample"},
                        "arn": format!("arn:aws:s3:::{}", bucket)
                    },
                    "object": {
                        "key": key,
                        "size": 1024,
                        "eTag": "d41d8cd98f00b204e9800998ecf8427e",
                        "sequencer": "0055AED6DCD90281E5"
                    }
                }
            })
        })
        .collect();

    serde_json::from_value(json!({ "Records": records })).unwrap()
}

pub fn lambda_event(objects: &[(&str, &str)]) -> LambdaEvent<S3Event> {
    LambdaEvent::new(s3_event(objects), Context::default())
}
