mod sns;

pub use sns::SnsNotifier;

use async_trait::async_trait;
use thiserror::Error;

use crate::pipeline::Stage;

pub const SUCCESS_SUBJECT: &str = "Lambda Execution Success";
pub const FAILURE_SUBJECT: &str = "Lambda Execution Failure";
pub const SUCCESS_MESSAGE: &str = "The Lambda function processed the file successfully.";

/// Outcome of one invocation, as published to the topic
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Success,
    Failure { stage: Stage, reason: String },
}

impl Notification {
    pub fn subject(&self) -> &'static str {
        match self {
            Notification::Success => SUCCESS_SUBJECT,
            Notification::Failure { .. } => FAILURE_SUBJECT,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Notification::Success => SUCCESS_MESSAGE.to_string(),
            Notification::Failure { reason, .. } => {
                format!("The Lambda function encountered an error: {}", reason)
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Failed to publish to {topic_arn}: {reason}")]
    Publish { topic_arn: String, reason: String },
}

/// Pub/sub sink for invocation outcomes
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    async fn publish(
        &self,
        topic_arn: &str,
        notification: &Notification,
    ) -> Result<(), NotifyError>;
}
