use anyhow::Context;
use clap::Parser;
use line_publisher::config::{DEFAULT_KEY, DEFAULT_TOPIC, MAX_TIMEOUT_SECS};
use line_publisher::kafka::KafkaBrokerClient;
use line_publisher::{ConnectionConfig, DeliveryMode, LinePublisher, PublishSettings};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Parser, Debug)]
#[command(name = "line-publisher")]
#[command(about = "Publish each line of a text file to a Kafka topic", long_about = None)]
struct Args {
    #[arg(value_name = "FILE", env = "PUBLISH_INPUT_FILE", help = "Input file, one message per line")]
    input: PathBuf,

    #[arg(short, long, value_name = "FILE", help = "Optional TOML file with broker settings")]
    config: Option<PathBuf>,

    #[arg(short, long, env = "PUBLISH_TOPIC", default_value = DEFAULT_TOPIC)]
    topic: String,

    #[arg(short, long, env = "PUBLISH_KEY", default_value = DEFAULT_KEY)]
    key: String,

    #[arg(
        long,
        value_name = "SECS",
        default_value_t = 10,
        value_parser = clap::value_parser!(u64).range(1..=MAX_TIMEOUT_SECS),
        help = "Flush deadline"
    )]
    flush_timeout: u64,

    #[arg(
        long,
        value_name = "SECS",
        default_value_t = 10,
        value_parser = clap::value_parser!(u64).range(1..=MAX_TIMEOUT_SECS),
        help = "Broker metadata deadline"
    )]
    connect_timeout: u64,

    #[arg(long, help = "Flush and confirm every message before sending the next")]
    per_message: bool,

    #[arg(short, long, help = "Enable JSON output for logs")]
    json_logs: bool,

    #[arg(short, long, help = "Verbose logging")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_logging(args.json_logs, args.verbose);

    info!("Starting line-publisher");

    let config = ConnectionConfig::load(args.config.as_deref())
        .context("failed to load broker configuration")?;

    info!(
        bootstrap_servers = %config.bootstrap_servers(),
        security_protocol = %config.security_protocol,
        ssl_ca_location = ?config.ssl_ca_location,
        ssl_endpoint_identification = config.ssl_endpoint_identification.as_str(),
        sasl_mechanism = ?config.sasl.as_ref().map(|s| s.mechanism.as_str()),
        client_id = %config.client_id,
        enable_idempotence = config.enable_idempotence,
        "Configuration summary"
    );

    let mode = if args.per_message {
        DeliveryMode::PerMessage
    } else {
        DeliveryMode::Batched
    };
    let settings = PublishSettings::new(args.topic, args.key)
        .context("invalid publish settings")?
        .with_flush_timeout(Duration::from_secs(args.flush_timeout))
        .context("invalid flush timeout")?
        .with_mode(mode);

    let client = KafkaBrokerClient::connect(&config, Duration::from_secs(args.connect_timeout))
        .await
        .context("failed to connect to broker")?;

    let publisher = LinePublisher::new(client, settings);
    let settings = publisher.settings();
    info!(
        topic = %settings.topic,
        key = %settings.key,
        mode = ?settings.mode,
        flush_timeout = ?settings.flush_timeout,
        "Publish settings"
    );
    let summary = publisher
        .run(&args.input)
        .await
        .with_context(|| format!("failed to publish {}", args.input.display()))?;

    for failure in &summary.failures {
        warn!(line = failure.line, error = %failure.error, "Line not delivered");
    }
    info!(
        submitted = summary.submitted,
        delivered = summary.delivered,
        failed = summary.failed(),
        "Publish run complete"
    );

    Ok(())
}

fn init_logging(json: bool, verbose: bool) {
    let env_filter = if verbose {
        EnvFilter::new("line_publisher=debug,info")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("line_publisher=info,warn"))
    };

    let fmt_layer = if json {
        tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(false)
            .with_span_list(false)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
