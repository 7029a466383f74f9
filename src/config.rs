use std::path::PathBuf;

use crate::pipeline::Staging;

pub const DEFAULT_DESTINATION_BUCKET: &str = "doordash-target-zn-assign3";
pub const DEFAULT_DESTINATION_KEY: &str = "delivered_records.json";
pub const DEFAULT_TOPIC_ARN: &str = "arn:aws:sns:ap-south-1:767397926411:aws-sns-assign3";
pub const DEFAULT_STAGING_DIR: &str = "/tmp";

/// Settings for [`IngestFilterPublish`](crate::pipeline::IngestFilterPublish)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerConfig {
    /// Bucket the filtered records are written to
    pub destination_bucket: String,
    /// Key of the filtered records object, overwritten on every run
    pub destination_key: String,
    /// Topic receiving the success or failure notification
    pub topic_arn: String,
    pub staging: Staging,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            destination_bucket: DEFAULT_DESTINATION_BUCKET.to_string(),
            destination_key: DEFAULT_DESTINATION_KEY.to_string(),
            topic_arn: DEFAULT_TOPIC_ARN.to_string(),
            staging: Staging::InMemory,
        }
    }
}

impl HandlerConfig {
    /// Stage through local files under `dir` instead of memory
    pub fn with_local_disk(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging = Staging::LocalDisk { dir: dir.into() };
        self
    }
}
