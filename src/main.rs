use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use aws_lambda_events::s3::S3Event;
use clap::{Parser, ValueEnum};
use delivery_filter_lambda::config::{
    DEFAULT_DESTINATION_BUCKET, DEFAULT_DESTINATION_KEY, DEFAULT_STAGING_DIR, DEFAULT_TOPIC_ARN,
    HandlerConfig,
};
use delivery_filter_lambda::init::{self, logging::LoggerGuard};
use delivery_filter_lambda::notify::SnsNotifier;
use delivery_filter_lambda::pipeline::IngestFilterPublish;
use delivery_filter_lambda::storage::S3Storage;
use lambda_runtime::{Error, LambdaEvent, service_fn};
use tower::BoxError;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StagingMode {
    /// Stream the object through memory, flattening nested fields
    Memory,
    /// Stage the source and result files on local disk
    LocalDisk,
}

#[derive(Debug, Parser)]
#[command(name = "delivery-filter-lambda")]
#[command(bin_name = "delivery-filter-lambda")]
struct Arguments {
    // This is ignored in these options, but we keep it here to avoid an error on unknown
    // options
    #[arg(long)]
    env_file: Option<String>,

    #[arg(long, env = "DESTINATION_BUCKET", default_value = DEFAULT_DESTINATION_BUCKET)]
    /// Bucket receiving the filtered records
    destination_bucket: String,

    #[arg(long, env = "DESTINATION_KEY", default_value = DEFAULT_DESTINATION_KEY)]
    /// Key of the filtered records object
    destination_key: String,

    #[arg(long, env = "SNS_TOPIC_ARN", default_value = DEFAULT_TOPIC_ARN)]
    /// SNS topic for success and failure notifications
    topic_arn: String,

    #[arg(long, env = "STAGING_MODE", value_enum, default_value_t = StagingMode::Memory)]
    /// How the source object is staged while it is filtered
    staging: StagingMode,

    #[arg(long, env = "STAGING_DIR", default_value = DEFAULT_STAGING_DIR)]
    /// Directory for per-invocation files in local-disk mode
    staging_dir: PathBuf,
}

impl Arguments {
    fn handler_config(&self) -> HandlerConfig {
        let config = HandlerConfig {
            destination_bucket: self.destination_bucket.clone(),
            destination_key: self.destination_key.clone(),
            topic_arn: self.topic_arn.clone(),
            ..Default::default()
        };

        match self.staging {
            StagingMode::Memory => config,
            StagingMode::LocalDisk => config.with_local_disk(&self.staging_dir),
        }
    }
}

// Minimal option to allow us to parse out the env from a file
#[derive(Debug, Parser)]
#[clap(ignore_errors = true)]
struct EnvFileArguments {
    #[arg(long, env = "ENV_FILE")]
    env_file: Option<String>,
}

fn main() -> ExitCode {
    let start_time = Instant::now();

    let env_opt = EnvFileArguments::parse();
    if let Some(env_file) = env_opt.env_file
        && let Err(e) = init::env::load_file(&env_file)
    {
        eprintln!("Can not load envfile: {}", e);
        return ExitCode::FAILURE;
    }

    let opt = Arguments::parse();

    let guard = match init::logging::setup() {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("ERROR: failed to setup logging: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match run_handler(start_time, guard, opt.handler_config()) {
        Ok(_) => {}
        Err(e) => {
            eprintln!("Failed to run handler: {}", e);
            return ExitCode::from(1);
        }
    }

    ExitCode::SUCCESS
}

#[tokio::main]
async fn run_handler(
    start_time: Instant,
    _log_guard: LoggerGuard,
    config: HandlerConfig,
) -> Result<(), BoxError> {
    let aws_config = aws_config::load_from_env().await;

    // Both clients exist before the first event, so a failed fetch can
    // always be reported.
    let storage = S3Storage::new(aws_sdk_s3::Client::new(&aws_config));
    let notifier = SnsNotifier::new(aws_sdk_sns::Client::new(&aws_config));

    let handler = IngestFilterPublish::new(storage, notifier, config);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        destination_bucket = %handler.config().destination_bucket,
        destination_key = %handler.config().destination_key,
        topic_arn = %handler.config().topic_arn,
        staging = ?handler.config().staging,
        "Delivery filter started in {}ms",
        start_time.elapsed().as_millis()
    );

    let handler = &handler;
    lambda_runtime::run(service_fn(move |event: LambdaEvent<S3Event>| async move {
        handler.handle(event).await.map_err(Error::from)
    }))
    .await
}
