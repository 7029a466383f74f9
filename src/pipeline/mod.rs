//! Ingest, filter and publish pipeline
//!
//! One S3 notification drives one run: the source object is fetched, the
//! records with status `delivered` are written to the destination object, and
//! the outcome is published to the notification topic. Pipeline failures are
//! reported through the topic and returned as a 500 response; only a failure
//! to publish escapes the handler.
//!

mod staging;

pub use staging::{FilterSummary, Staging};

use aws_lambda_events::s3::S3Event;
use lambda_runtime::LambdaEvent;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{Instrument, error, info, info_span, warn};

use crate::aws_attributes::AwsAttributes;
use crate::config::HandlerConfig;
use crate::events::ObjectRef;
use crate::notify::{Notification, NotificationGateway, NotifyError};
use crate::records::RecordError;
use crate::storage::{StorageError, StorageGateway};

pub const SUCCESS_BODY: &str = "Lambda execution completed successfully!";
pub const FAILURE_BODY_PREFIX: &str = "Lambda execution failed:";

/// Step of the pipeline a failure belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Event,
    Fetch,
    Parse,
    Write,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Event => "event",
            Stage::Fetch => "fetch",
            Stage::Parse => "parse",
            Stage::Write => "write",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    #[error("Failed to fetch source object: {0}")]
    Fetch(#[source] StorageError),

    #[error("Failed to parse records: {0}")]
    Parse(#[from] RecordError),

    #[error("Failed to serialize records: {0}")]
    Serialize(#[source] RecordError),

    #[error("Local staging failed: {source}")]
    Staging {
        stage: Stage,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write destination object: {0}")]
    Write(#[source] StorageError),
}

impl PipelineError {
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::InvalidEvent(_) => Stage::Event,
            PipelineError::Fetch(_) => Stage::Fetch,
            PipelineError::Parse(_) => Stage::Parse,
            PipelineError::Staging { stage, .. } => *stage,
            PipelineError::Serialize(_) | PipelineError::Write(_) => Stage::Write,
        }
    }
}

/// Value returned to the Lambda runtime. `body` holds a JSON-encoded string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: String,
}

impl InvocationResponse {
    pub fn success() -> Self {
        Self {
            status_code: 200,
            body: json_string(SUCCESS_BODY),
        }
    }

    pub fn failure(err: &PipelineError) -> Self {
        Self {
            status_code: 500,
            body: json_string(&format!("{} {}", FAILURE_BODY_PREFIX, err)),
        }
    }
}

fn json_string(msg: &str) -> String {
    serde_json::Value::String(msg.to_string()).to_string()
}

/// Handles S3 object-created notifications.
///
/// Both gateways are supplied up front, so the notifier is available no
/// matter which step fails.
pub struct IngestFilterPublish<S, N> {
    storage: S,
    notifier: N,
    config: HandlerConfig,
}

impl<S, N> IngestFilterPublish<S, N>
where
    S: StorageGateway,
    N: NotificationGateway,
{
    pub fn new(storage: S, notifier: N, config: HandlerConfig) -> Self {
        Self {
            storage,
            notifier,
            config,
        }
    }

    pub fn config(&self) -> &HandlerConfig {
        &self.config
    }

    /// Run the pipeline for one event and publish exactly one notification.
    ///
    /// Returns `Err` only when publishing the notification fails.
    pub async fn handle(
        &self,
        event: LambdaEvent<S3Event>,
    ) -> Result<InvocationResponse, NotifyError> {
        let span = info_span!("invocation", request_id = %event.context.request_id);
        self.handle_in_span(event).instrument(span).await
    }

    async fn handle_in_span(
        &self,
        event: LambdaEvent<S3Event>,
    ) -> Result<InvocationResponse, NotifyError> {
        let attributes = AwsAttributes::new(&event.context);

        info!(
            region = %attributes.region,
            function_name = %attributes.function_name,
            records_count = event.payload.records.len(),
            staging = ?self.config.staging,
            "Handling S3 event notification"
        );

        let (notification, response) = match self.run(&event.payload).await {
            Ok(summary) => {
                info!(
                    input_records = summary.input_records,
                    output_records = summary.output_records,
                    destination_bucket = %self.config.destination_bucket,
                    destination_key = %self.config.destination_key,
                    "Successfully wrote delivered records"
                );
                (Notification::Success, InvocationResponse::success())
            }
            Err(e) => {
                error!(
                    stage = %e.stage(),
                    error = %e,
                    "Failed to process S3 event"
                );
                let notification = Notification::Failure {
                    stage: e.stage(),
                    reason: e.to_string(),
                };
                (notification, InvocationResponse::failure(&e))
            }
        };

        self.notifier
            .publish(&self.config.topic_arn, &notification)
            .await?;

        Ok(response)
    }

    async fn run(&self, event: &S3Event) -> Result<FilterSummary, PipelineError> {
        let source = ObjectRef::from_event(event)?;
        let destination = ObjectRef {
            bucket: self.config.destination_bucket.clone(),
            key: self.config.destination_key.clone(),
            size: None,
        };

        if source.bucket == destination.bucket && source.key == destination.key {
            warn!(
                object = %source,
                "Source object is the destination object, it will be overwritten"
            );
        }

        info!(
            bucket = %source.bucket,
            key = %source.key,
            size = ?source.size,
            "Processing S3 object"
        );

        match &self.config.staging {
            Staging::InMemory => staging::run_in_memory(&self.storage, &source, &destination).await,
            Staging::LocalDisk { dir } => {
                staging::run_local_disk(&self.storage, dir, &source, &destination).await
            }
        }
    }
}
