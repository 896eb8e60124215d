//! Command-line configuration for the agent
//!
//! Defaults mirror the reference deployment: a home collector on the LAN,
//! one-second ticks, 25-reading packets. The packet path keeps its historic
//! spelling; it is the wire contract with existing collectors.

use clap::Parser;

use airlift_core::{RetryPolicy, SchedulerConfig, DEFAULT_SEAL_THRESHOLD};

/// Environmental telemetry agent
#[derive(Parser, Debug)]
#[command(name = "airlift", version, about)]
pub struct AgentArgs {
    /// Collector base URL
    #[arg(long, default_value = "http://192.168.1.147:5000")]
    pub collector: String,

    /// Path sealed packets are POSTed to
    #[arg(long, default_value = "enviornmental_sensors")]
    pub packet_path: String,

    /// Path reference values are fetched from
    #[arg(long, default_value = "api/weather_status")]
    pub reference_path: String,

    /// Tick period in milliseconds
    #[arg(long, default_value_t = 1_000)]
    pub tick_ms: u64,

    /// Readings accumulated per packet before sealing
    #[arg(long, default_value_t = DEFAULT_SEAL_THRESHOLD)]
    pub seal_threshold: usize,

    /// Request attempts per delivery operation
    #[arg(long, default_value_t = 3)]
    pub max_attempts: u32,

    /// Wall-clock budget per delivery operation, in milliseconds
    #[arg(long, default_value_t = 900)]
    pub deadline_ms: u64,

    /// Per-request HTTP timeout in seconds
    #[arg(long, default_value_t = 5)]
    pub timeout_secs: u64,

    /// Ticks between status log lines (0 disables)
    #[arg(long, default_value_t = 50)]
    pub status_interval: u64,

    /// Ticks between reference-value refreshes (0 disables)
    #[arg(long, default_value_t = 3_600)]
    pub calibration_interval: u64,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl AgentArgs {
    /// Scheduler tunables derived from the flags
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            tick_period_ms: self.tick_ms,
            seal_threshold: self.seal_threshold,
            calibration_interval_ticks: self.calibration_interval,
            status_interval_ticks: self.status_interval,
        }
    }

    /// Delivery retry policy derived from the flags
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            backoff_ms: 250,
            deadline_ms: self.deadline_ms,
        }
    }

    /// Log filter matching the verbosity count
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}
