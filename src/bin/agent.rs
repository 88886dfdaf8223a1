use std::time::Duration;

use clap::Parser;
use metrics_hub::{
    client::PushClient,
    collector::Collector,
    config::{AgentArgs, AgentConfig},
};
use tokio::time;
use tracing::{debug, error, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

fn init() {
    let filter = filter::Targets::new().with_targets(vec![
        ("metrics_hub", LevelFilter::DEBUG),
        ("agent", LevelFilter::DEBUG),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init();

    let args = AgentArgs::parse();
    trace!("started with args: {args:?}");
    let config = AgentConfig::from_args(args);

    debug!(
        "pushing to {} every {}s, polling every {}s",
        config.address, config.report_interval, config.poll_interval
    );

    let mut collector = Collector::new();
    let client = PushClient::new(&config.address);

    let mut poll = time::interval(Duration::from_secs(config.poll_interval.max(1)));
    let mut report = time::interval(Duration::from_secs(config.report_interval.max(1)));
    // interval fires immediately; skip the zeroth report so the first batch
    // carries at least one poll
    report.tick().await;

    loop {
        tokio::select! {
            _ = poll.tick() => {
                collector.poll();
            }
            _ = report.tick() => {
                let points = collector.report();
                match client.push_batch(&points).await {
                    Ok(()) => {
                        collector.mark_reported();
                        trace!("pushed {} points", points.len());
                    }
                    Err(e) => error!("push failed: {e}"),
                }
            }
        }
    }
}
