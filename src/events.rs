use aws_lambda_events::s3::{S3Event, S3EventRecord};
use tracing::{debug, warn};

use crate::pipeline::PipelineError;

/// Location of the object that triggered the invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef {
    pub bucket: String,
    pub key: String,
    pub size: Option<i64>,
}

impl ObjectRef {
    /// Resolve the source object from an S3 notification.
    ///
    /// Only the first record is handled; any further records in the same
    /// notification are logged and skipped.
    pub fn from_event(event: &S3Event) -> Result<Self, PipelineError> {
        let record = event
            .records
            .first()
            .ok_or_else(|| PipelineError::InvalidEvent("event contains no records".to_string()))?;

        if event.records.len() > 1 {
            warn!(
                records_count = event.records.len(),
                "Received multiple S3 records, only the first one is processed"
            );
        }

        Self::from_record(record)
    }

    fn from_record(record: &S3EventRecord) -> Result<Self, PipelineError> {
        debug!(
            event_name = %record.event_name.as_deref().unwrap_or("unknown"),
            aws_region = %record.aws_region.as_deref().unwrap_or("unknown"),
            event_time = %record.event_time.to_rfc3339(),
            "Resolving S3 event record"
        );

        let bucket = record
            .s3
            .bucket
            .name
            .clone()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| PipelineError::InvalidEvent("missing bucket name".to_string()))?;
        let key = record
            .s3
            .object
            .key
            .clone()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| PipelineError::InvalidEvent("missing object key".to_string()))?;
        let key = decode_key(&key)?;

        Ok(Self {
            bucket,
            key,
            size: record.s3.object.size,
        })
    }

    /// Last path segment of the key, used to name the staged copy on disk.
    pub fn file_name(&self) -> &str {
        self.key
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty())
            .unwrap_or("source.json")
    }
}

/// Keys in S3 notifications are form-encoded: a space arrives as `+` and
/// other reserved characters as `%XX`.
fn decode_key(raw: &str) -> Result<String, PipelineError> {
    let plus_decoded = raw.replace('+', " ");
    match urlencoding::decode(&plus_decoded) {
        Ok(decoded) => Ok(decoded.into_owned()),
        Err(e) => {
            warn!(error = ?e, key = %raw, "unable to decode key");
            Err(PipelineError::InvalidEvent(format!(
                "object key {} is not valid percent-encoded UTF-8",
                raw
            )))
        }
    }
}

impl std::fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::s3_event;

    #[test]
    fn test_from_event() {
        let event = s3_event(&[("source-bucket", "incoming/2024-03-01/orders.json")]);
        let obj = ObjectRef::from_event(&event).unwrap();

        assert_eq!(obj.bucket, "source-bucket");
        assert_eq!(obj.key, "incoming/2024-03-01/orders.json");
        assert_eq!(obj.size, Some(1024));
        assert_eq!(obj.file_name(), "orders.json");
        assert_eq!(obj.to_string(), "s3://source-bucket/incoming/2024-03-01/orders.json");
    }

    #[test]
    fn test_only_first_record_used() {
        let event = s3_event(&[("first", "a.json"), ("second", "b.json")]);
        let obj = ObjectRef::from_event(&event).unwrap();
        assert_eq!(obj.bucket, "first");
        assert_eq!(obj.key, "a.json");
    }

    #[test]
    fn test_empty_event() {
        let event = s3_event(&[]);
        let err = ObjectRef::from_event(&event).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidEvent(_)));
    }

    #[test]
    fn test_missing_key() {
        let event = s3_event(&[("source-bucket", "")]);
        let err = ObjectRef::from_event(&event).unwrap_err();
        assert_eq!(err.to_string(), "Invalid event: missing object key");
    }

    #[test]
    fn test_encoded_key_decoded() {
        let event = s3_event(&[("source-bucket", "daily+orders/r%C3%A9sum%C3%A9%2B1.json")]);
        let obj = ObjectRef::from_event(&event).unwrap();
        assert_eq!(obj.key, "daily orders/résumé+1.json");
        assert_eq!(obj.file_name(), "résumé+1.json");
    }

    #[test]
    fn test_undecodable_key() {
        let event = s3_event(&[("source-bucket", "orders%FF.json")]);
        let err = ObjectRef::from_event(&event).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidEvent(_)));
        assert_eq!(err.stage(), crate::pipeline::Stage::Event);
    }

    #[test]
    fn test_file_name() {
        let obj = ObjectRef {
            bucket: "b".to_string(),
            key: "dir/".to_string(),
            size: None,
        };
        assert_eq!(obj.file_name(), "source.json");

        let obj = ObjectRef {
            bucket: "b".to_string(),
            key: "exports/orders.json.gz".to_string(),
            size: None,
        };
        assert_eq!(obj.file_name(), "orders.json.gz");
    }
}
