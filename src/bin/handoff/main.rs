use std::time::Duration;

use blocking_handoff::aggregate::Summary;
use blocking_handoff::{capacity_from, Pace, Result, Transfer, TransferConfig};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber;

fn run(options: Options) -> Result<()> {
    let capacity = capacity_from(options.capacity)?;
    let jitter = Duration::from_millis(options.jitter_ms);
    let join_timeout = match options.timeout_ms {
        0 => None,
        ms => Some(Duration::from_millis(ms)),
    };
    let config = TransferConfig::default()
        .capacity(capacity)
        .join_timeout(join_timeout)
        .producer_pace(Pace::new(Duration::from_millis(options.producer_delay_ms), jitter))
        .consumer_pace(Pace::new(Duration::from_millis(options.consumer_delay_ms), jitter));

    let source: Vec<u32> = (1..=options.count).collect();
    info!("source: {:?}", source);

    let report = Transfer::new(config).run(source)?;
    info!("destination: {:?}", report.destination);

    let stats = report.aggregate(&Summary::new(|v: &u32| f64::from(*v)));
    println!(
        "transferred {} items in {:?} (peak occupancy {}/{}, residual {})",
        report.produced, report.elapsed, report.stats.peak, capacity, report.residual
    );
    println!(
        "count {} sum {} min {:?} max {:?} mean {:?}",
        stats.count,
        stats.sum,
        stats.min,
        stats.max,
        stats.mean()
    );
    println!("transfer successful: true");
    Ok(())
}

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Options {
    /// queue capacity
    #[clap(short, long, allow_hyphen_values = true)]
    #[clap(default_value_t = 3)]
    capacity: i64,

    /// number of items to transfer, 1..=count
    #[clap(short = 'n', long)]
    #[clap(default_value_t = 10)]
    count: u32,

    /// producer delay per item in milliseconds
    #[clap(long)]
    #[clap(default_value_t = 0)]
    producer_delay_ms: u64,

    /// consumer delay per item in milliseconds
    #[clap(long)]
    #[clap(default_value_t = 0)]
    consumer_delay_ms: u64,

    /// random jitter added to both delays, in milliseconds
    #[clap(short, long)]
    #[clap(default_value_t = 0)]
    jitter_ms: u64,

    /// give up waiting for the workers after this many milliseconds, 0 waits forever
    #[clap(short, long)]
    #[clap(default_value_t = 5000)]
    timeout_ms: u64,
}

fn main() {
    // install global collector configured based on RUST_LOG env var.
    tracing_subscriber::fmt::init();

    if let Err(e) = run(Options::parse()) {
        error!(cause = %e, defect = e.is_defect(), "transfer failed");
        println!("transfer successful: false");
        std::process::exit(1);
    }
}
