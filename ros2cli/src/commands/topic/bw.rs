//! `ros2 topic bw`: bandwidth used by topics, measured on the receiving side.

use super::{clear_terminal, positive_int, select_topics, subscribe_raw};
use crate::{
    cli::CliContext,
    commands::{every_until_ctrl_c, finish},
    error::Result,
    extension::Verb,
    qos::QosArgs,
    table::ascii_table,
};
use clap::Args;
use parking_lot::Mutex;
use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
    time::{Duration, Instant},
};

const DEFAULT_WINDOW_SIZE: usize = 100;

/// Display bandwidth used by topic.
///
/// This bandwidth reflects the receiving rate on subscription, which might be
/// affected by platform resources and QoS configuration, and may not exactly
/// match the publisher's bandwidth.
#[derive(Debug, Args)]
pub(crate) struct BwArgs {
    /// Names of the ROS topics to monitor for bandwidth utilization (e.g. '/chatter')
    topic_name: Vec<String>,

    /// Subscribe to all available topics
    #[arg(short, long = "all")]
    all_topics: bool,

    /// Consider hidden topics as well
    #[arg(long)]
    include_hidden_topics: bool,

    /// Maximum window size, in # of messages, for calculating rate
    #[arg(
        short,
        long = "window",
        value_name = "WINDOW",
        default_value_t = DEFAULT_WINDOW_SIZE,
        value_parser = positive_int
    )]
    window_size: usize,

    #[command(flatten)]
    qos: QosArgs,
}

#[derive(Debug, Default)]
struct Window {
    times: VecDeque<Instant>,
    sizes: VecDeque<usize>,
    last_printed: Option<Instant>,
}

/// Statistics over one window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct BwStats {
    pub bytes_per_s: f64,
    pub n: usize,
    pub mean: f64,
    pub min: usize,
    pub max: usize,
}

fn str_bytes(num_bytes: f64) -> String {
    format!("{num_bytes:.0} B")
}

fn str_kilobytes(num_bytes: f64) -> String {
    format!("{:.2} KB", num_bytes / 1000.0)
}

fn str_megabytes(num_bytes: f64) -> String {
    format!("{:.2} MB", num_bytes / 1000.0 / 1000.0)
}

/// Rendered statistics; every size uses the unit picked for the bandwidth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BwText {
    pub bandwidth: String,
    pub mean: String,
    pub min: String,
    pub max: String,
    pub n: usize,
}

impl BwStats {
    pub(crate) fn format(&self) -> BwText {
        let unit: fn(f64) -> String = if self.bytes_per_s < 1000.0 {
            str_bytes
        } else if self.bytes_per_s < 1_000_000.0 {
            str_kilobytes
        } else {
            str_megabytes
        };
        BwText {
            bandwidth: format!("{}/s", unit(self.bytes_per_s)),
            mean: unit(self.mean),
            min: unit(self.min as f64),
            max: unit(self.max as f64),
            n: self.n,
        }
    }
}

/// Sliding windows of message arrival times and sizes, one per topic.
pub(crate) struct Bandwidth {
    window_size: usize,
    windows: Mutex<HashMap<String, Window>>,
}

impl Bandwidth {
    pub(crate) fn new(window_size: usize) -> Self {
        Self {
            window_size,
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn record(&self, topic: &str, at: Instant, size: usize) {
        let mut windows = self.windows.lock();
        let window = windows.entry(topic.to_string()).or_default();
        window.times.push_back(at);
        window.sizes.push_back(size);
        if window.times.len() > self.window_size {
            window.times.pop_front();
            window.sizes.pop_front();
        }
    }

    /// Statistics as of `now`; `None` with fewer than two messages or
    /// nothing new since the last call.
    pub(crate) fn stats(&self, topic: &str, now: Instant) -> Option<BwStats> {
        let mut windows = self.windows.lock();
        let window = windows.get_mut(topic)?;
        if window.times.len() < 2 {
            return None;
        }
        let last = *window.times.back()?;
        if window.last_printed == Some(last) {
            return None;
        }
        let first = *window.times.front()?;
        let elapsed = now.checked_duration_since(first).unwrap_or(Duration::ZERO);
        if elapsed.is_zero() {
            return None;
        }

        let n = window.sizes.len();
        let total: usize = window.sizes.iter().sum();
        let stats = BwStats {
            bytes_per_s: total as f64 / elapsed.as_secs_f64(),
            n,
            mean: total as f64 / n as f64,
            min: window.sizes.iter().copied().min()?,
            max: window.sizes.iter().copied().max()?,
        };
        window.last_printed = Some(last);
        Some(stats)
    }

    /// Text to print for `topics` as of `now`, if any.
    pub(crate) fn report(&self, topics: &[String], now: Instant) -> Option<String> {
        if let [topic] = topics {
            let text = self.stats(topic, now)?.format();
            return Some(format!(
                "{} from {} messages\n\tMessage size mean: {} min: {} max: {}",
                text.bandwidth, text.n, text.mean, text.min, text.max
            ));
        }

        let rows: Vec<Vec<String>> = topics
            .iter()
            .filter_map(|topic| {
                let text = self.stats(topic, now)?.format();
                Some(vec![
                    topic.clone(),
                    text.bandwidth,
                    text.n.to_string(),
                    text.mean,
                    text.min,
                    text.max,
                ])
            })
            .collect();
        if rows.is_empty() {
            return None;
        }
        Some(ascii_table(
            &["topic", "bandwidth", "window", "mean", "min", "max"],
            &rows,
        ))
    }
}

#[derive(Default)]
pub(crate) struct BwVerb;

async fn run(cli: &CliContext, args: BwArgs) -> Result<()> {
    let context = cli.connect().await?;
    let result = monitor(&context, args).await;
    finish(context, result).await
}

async fn monitor(context: &ros2cli_zenoh::Context, args: BwArgs) -> Result<()> {
    let graph = context.graph().await?;
    let topics = select_topics(
        &graph,
        &args.topic_name,
        args.all_topics,
        args.include_hidden_topics,
    )?;
    if args.all_topics {
        if topics.is_empty() {
            println!("No topics available");
            return Ok(());
        }
        println!("Subscribing to all {} available topics...", topics.len());
    }

    let bandwidth = Arc::new(Bandwidth::new(args.window_size));
    let recorder = Arc::clone(&bandwidth);
    let monitored = subscribe_raw(
        context,
        &graph,
        topics,
        &args.qos,
        "sensor_data",
        move |sample| recorder.record(&sample.topic, sample.received_at, sample.payload.len()),
    )?;

    every_until_ctrl_c(Duration::from_secs(1), || {
        if args.all_topics {
            clear_terminal();
        }
        if let Some(text) = bandwidth.report(&monitored.topics, Instant::now()) {
            println!("{text}");
        }
    })
    .await
}

impl Verb for BwVerb {
    type Args = BwArgs;

    fn main(&self, cli: &CliContext, args: BwArgs) -> Result<()> {
        cli.block_on(run(cli, args))
    }
}
