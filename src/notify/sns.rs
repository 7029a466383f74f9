use async_trait::async_trait;
use aws_sdk_sns::error::DisplayErrorContext;
use tracing::{debug, error};

use super::{Notification, NotificationGateway, NotifyError};

/// [`NotificationGateway`] backed by Amazon SNS
#[derive(Clone, Debug)]
pub struct SnsNotifier {
    inner: aws_sdk_sns::Client,
}

impl SnsNotifier {
    pub fn new(inner: aws_sdk_sns::Client) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl NotificationGateway for SnsNotifier {
    async fn publish(
        &self,
        topic_arn: &str,
        notification: &Notification,
    ) -> Result<(), NotifyError> {
        let output = self
            .inner
            .publish()
            .topic_arn(topic_arn)
            .subject(notification.subject())
            .message(notification.message())
            .send()
            .await
            .map_err(|e| {
                let reason = DisplayErrorContext(&e).to_string();
                error!(topic_arn = %topic_arn, error = %reason, "Failed to publish notification");
                NotifyError::Publish {
                    topic_arn: topic_arn.to_string(),
                    reason,
                }
            })?;

        debug!(
            topic_arn = %topic_arn,
            message_id = ?output.message_id(),
            subject = notification.subject(),
            "Published notification"
        );

        Ok(())
    }
}
