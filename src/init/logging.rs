use std::env;

use tower::BoxError;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Registry, filter::LevelFilter};

pub type LoggerGuard = tracing_appender::non_blocking::WorkerGuard;

// SDK crates log every request at info
const QUIET_CRATES: &[&str] = &["aws_config", "aws_smithy_runtime", "aws_sdk_s3", "aws_sdk_sns"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    /// Follows the function's logging configuration, which Lambda exposes
    /// as `AWS_LAMBDA_LOG_FORMAT`.
    fn from_lambda_env(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Text,
        }
    }
}

fn build_filter(directives: Option<&str>) -> Result<EnvFilter, BoxError> {
    let builder = EnvFilter::builder().with_default_directive(LevelFilter::INFO.into());
    let mut filter = match directives {
        Some(d) => builder.parse(d)?,
        None => builder.parse("")?,
    };

    for name in QUIET_CRATES {
        filter = filter.add_directive(format!("{}=warn", name).parse()?);
    }
    Ok(filter)
}

/// Install the global subscriber. Events carry the fields of the enclosing
/// `invocation` span, so every line of a run is tagged with its request id.
pub fn setup() -> Result<LoggerGuard, BoxError> {
    let (writer, guard) = tracing_appender::non_blocking(std::io::stdout());

    let filter = build_filter(env::var("RUST_LOG").ok().as_deref())?;
    let format = LogFormat::from_lambda_env(env::var("AWS_LAMBDA_LOG_FORMAT").ok().as_deref());

    // CloudWatch stamps each line and does not render escape codes
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_target(false)
        .without_time()
        .with_ansi(false);

    match format {
        LogFormat::Json => {
            let layer = layer
                .json()
                .flatten_event(true)
                .with_current_span(true)
                .with_span_list(false);
            tracing::subscriber::set_global_default(Registry::default().with(filter).with(layer))?;
        }
        LogFormat::Text => {
            let layer = layer.compact();
            tracing::subscriber::set_global_default(Registry::default().with(filter).with(layer))?;
        }
    }

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format() {
        assert_eq!(LogFormat::from_lambda_env(Some("JSON")), LogFormat::Json);
        assert_eq!(LogFormat::from_lambda_env(Some("json")), LogFormat::Json);
        assert_eq!(LogFormat::from_lambda_env(Some("Text")), LogFormat::Text);
        assert_eq!(LogFormat::from_lambda_env(None), LogFormat::Text);
    }

    #[test]
    fn test_filter_quiets_sdk_crates() {
        let filter = build_filter(Some("debug")).unwrap().to_string();
        assert!(filter.contains("debug"));
        for name in QUIET_CRATES {
            assert!(filter.contains(&format!("{}=warn", name)));
        }
    }

    #[test]
    fn test_invalid_filter() {
        assert!(build_filter(Some("aws_config=loud")).is_err());
    }
}
