use crate::serial::BaudRate;
use clap::Parser;
use std::time::Duration;

#[derive(Debug, Clone, Parser)]
#[command(name = "latency_monitor", version, about = "Serial line latency monitor")]
pub struct Settings {
    /// Serial device to preselect (defaults to the first port found)
    #[arg(long, env = "LATENCY_PORT")]
    pub port: Option<String>,

    /// One of 9600, 19200, 38400, 57600, 115200
    #[arg(long, env = "LATENCY_BAUD", default_value = "9600")]
    pub baud: BaudRate,

    /// Upper bound for a single blocking read
    #[arg(long, env = "LATENCY_READ_TIMEOUT_MS", default_value_t = 1000,
          value_parser = clap::value_parser!(u64).range(1..))]
    pub read_timeout_ms: u64,

    /// Refresh period of the live latency reading
    #[arg(long, env = "LATENCY_TICK_MS", default_value_t = 10,
          value_parser = clap::value_parser!(u64).range(1..))]
    pub tick_ms: u64,

    #[arg(long, env = "LATENCY_MAX_LOG_LINES", default_value_t = 1000)]
    pub max_log_lines: usize,
}

impl Settings {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: None,
            baud: BaudRate::default(),
            read_timeout_ms: 1000,
            tick_ms: 10,
            max_log_lines: 1000,
        }
    }
}
