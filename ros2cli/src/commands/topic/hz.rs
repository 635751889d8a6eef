//! `ros2 topic hz`: receiving rate of topics.

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

const DEFAULT_WINDOW_SIZE: usize = 10_000;

/// Rates are printed at most once per second per topic.
const PRINT_PERIOD: Duration = Duration::from_secs(1);

/// Print the average receiving rate to screen.
#[derive(Debug, Args)]
pub(crate) struct HzArgs {
    /// Names of the ROS topics to listen to (e.g. '/chatter')
    topic_name: Vec<String>,

    /// Subscribe to all available topics
    #[arg(short, long = "all")]
    all_topics: bool,

    /// Consider hidden topics as well
    #[arg(long)]
    include_hidden_topics: bool,

    /// Window size, in # of messages, for calculating rate
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
    last_received: Option<Instant>,
    periods: VecDeque<Duration>,
    last_printed: Option<Instant>,
}

/// Rate statistics over one window, durations in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct HzStats {
    pub rate: f64,
    pub min_delta: f64,
    pub max_delta: f64,
    pub std_dev: f64,
    pub window: usize,
}

/// Sliding windows of inter-arrival periods, one per topic.
pub(crate) struct Rate {
    window_size: usize,
    windows: Mutex<HashMap<String, Window>>,
}

impl Rate {
    pub(crate) fn new(window_size: usize) -> Self {
        Self {
            window_size,
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn record(&self, topic: &str, at: Instant) {
        let mut windows = self.windows.lock();
        let window = windows.entry(topic.to_string()).or_default();
        match window.last_received {
            Some(last) if last <= at => window.periods.push_back(at - last),
            // first message, or the clock went backwards: start over
            _ => window.periods.clear(),
        }
        window.last_received = Some(at);
        if window.periods.len() > self.window_size {
            window.periods.pop_front();
        }
    }

    /// Statistics if at least a second of new messages arrived since the
    /// last call. The first call with data only arms the timer.
    pub(crate) fn stats(&self, topic: &str) -> Option<HzStats> {
        let mut windows = self.windows.lock();
        let window = windows.get_mut(topic)?;
        if window.periods.is_empty() {
            return None;
        }
        let last = window.last_received?;
        let Some(printed) = window.last_printed else {
            window.last_printed = Some(last);
            return None;
        };
        if last < printed + PRINT_PERIOD {
            return None;
        }

        let periods: Vec<f64> = window.periods.iter().map(Duration::as_secs_f64).collect();
        let n = periods.len();
        let mean = periods.iter().sum::<f64>() / n as f64;
        let variance = periods.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / n as f64;
        let stats = HzStats {
            rate: if mean > 0.0 { 1.0 / mean } else { 0.0 },
            min_delta: periods.iter().copied().fold(f64::INFINITY, f64::min),
            max_delta: periods.iter().copied().fold(0.0, f64::max),
            std_dev: variance.sqrt(),
            window: n,
        };
        window.last_printed = Some(last);
        Some(stats)
    }

    /// Text to print for `topics`, if any.
    pub(crate) fn report(&self, topics: &[String]) -> Option<String> {
        if let [topic] = topics {
            let s = self.stats(topic)?;
            return Some(format!(
                "average rate: {:.3}\n\tmin: {:.3}s max: {:.3}s std dev: {:.5}s window: {}",
                s.rate, s.min_delta, s.max_delta, s.std_dev, s.window
            ));
        }

        let rows: Vec<Vec<String>> = topics
            .iter()
            .filter_map(|topic| {
                let s = self.stats(topic)?;
                Some(vec![
                    topic.clone(),
                    format!("{:.3}", s.rate),
                    format!("{:.3}", s.min_delta),
                    format!("{:.3}", s.max_delta),
                    format!("{:.5}", s.std_dev),
                    s.window.to_string(),
                ])
            })
            .collect();
        if rows.is_empty() {
            return None;
        }
        Some(ascii_table(
            &["topic", "rate", "min_delta", "max_delta", "std_dev", "window"],
            &rows,
        ))
    }
}

#[derive(Default)]
pub(crate) struct HzVerb;

async fn run(cli: &CliContext, args: HzArgs) -> Result<()> {
    let context = cli.connect().await?;
    let result = monitor(&context, args).await;
    finish(context, result).await
}

async fn monitor(context: &ros2cli_zenoh::Context, args: HzArgs) -> Result<()> {
    let graph = context.graph().await?;
    let topics = select_topics(
        &graph,
        &args.topic_name,
        args.all_topics,
        args.include_hidden_topics,
    )?;
    if args.all_topics && topics.is_empty() {
        println!("No topics available");
        return Ok(());
    }

    let rate = Arc::new(Rate::new(args.window_size));
    let recorder = Arc::clone(&rate);
    let monitored = subscribe_raw(
        context,
        &graph,
        topics,
        &args.qos,
        "sensor_data",
        move |sample| recorder.record(&sample.topic, sample.received_at),
    )?;

    every_until_ctrl_c(PRINT_PERIOD, || {
        if let Some(text) = rate.report(&monitored.topics) {
            if args.all_topics {
                clear_terminal();
            }
            println!("{text}");
        }
    })
    .await
}

impl Verb for HzVerb {
    type Args = HzArgs;

    fn main(&self, cli: &CliContext, args: HzArgs) -> Result<()> {
        cli.block_on(run(cli, args))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(rate: &Rate, topic: &str, start: Instant, ms: &[u64]) {
        for ms in ms {
            rate.record(topic, start + Duration::from_millis(*ms));
        }
    }

    #[test]
    fn test_first_report_only_arms() {
        let rate = Rate::new(100);
        let start = Instant::now();
        feed(&rate, "/t", start, &[0]);
        assert!(rate.stats("/t").is_none());
        feed(&rate, "/t", start, &[100]);
        assert!(rate.stats("/t").is_none());
        feed(&rate, "/t", start, &[200, 300, 400, 500, 600, 700, 800, 900, 1000]);
        assert!(rate.stats("/t").is_none());
        feed(&rate, "/t", start, &[1100]);

        let stats = rate.stats("/t").unwrap();
        assert!((stats.rate - 10.0).abs() < 1e-6);
        assert!((stats.min_delta - 0.1).abs() < 1e-9);
        assert!((stats.max_delta - 0.1).abs() < 1e-9);
        assert!(stats.std_dev < 1e-9);
        assert_eq!(stats.window, 11);
        // already printed
        assert!(rate.stats("/t").is_none());
    }

    #[test]
    fn test_std_dev_is_population() {
        let rate = Rate::new(100);
        let start = Instant::now();
        feed(&rate, "/t", start, &[0]);
        feed(&rate, "/t", start, &[1000]);
        rate.stats("/t");
        // periods: 1.0, 1.0, 3.0
        feed(&rate, "/t", start, &[2000, 5000]);
        let stats = rate.stats("/t").unwrap();
        let mean = 5.0 / 3.0;
        let expected =
            (((1.0 - mean) * (1.0 - mean) * 2.0 + (3.0 - mean) * (3.0 - mean)) / 3.0f64).sqrt();
        assert!((stats.std_dev - expected).abs() < 1e-9);
        assert!((stats.rate - 0.6).abs() < 1e-9);
        assert!((stats.max_delta - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_window_is_bounded() {
        let rate = Rate::new(2);
        let start = Instant::now();
        feed(&rate, "/t", start, &[0, 100, 300, 600]);
        rate.stats("/t");
        feed(&rate, "/t", start, &[1600, 2600]);
        assert_eq!(rate.stats("/t").unwrap().window, 2);
    }

    #[test]
    fn test_single_topic_format() {
        let rate = Rate::new(100);
        let start = Instant::now();
        feed(&rate, "/t", start, &[0, 500]);
        rate.stats("/t");
        feed(&rate, "/t", start, &[1000, 1500]);
        let text = rate.report(&["/t".to_string()]).unwrap();
        assert_eq!(
            text,
            "average rate: 2.000\n\tmin: 0.500s max: 0.500s std dev: 0.00000s window: 3"
        );
    }
}
