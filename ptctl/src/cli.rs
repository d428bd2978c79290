use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use pitop_hal::PollPolicy;

/// CLI for the pi-top hub, battery gauge and speaker
///
/// Queries the battery fuel gauge over I2C, queries and changes the hub state
/// (power, backlight, lid) over SPI, and configures the speaker amplifier by
/// replaying register writes from a directive file.
///
/// Device and command are case-insensitive:
///
///   battery   state | capacity | time
///   system    state | off
///   backlight state | increase | decrease | on | off | 1..10
///   lid       state
///   speaker   left | right | mono  <address-hex>
#[derive(Debug, Parser)]
#[command(version, about, verbatim_doc_comment)]
pub(crate) struct Cli {
    /// Device to talk to
    pub(crate) device: String,
    /// Command for the device
    pub(crate) command: String,
    /// Speaker I2C address in hexadecimal
    pub(crate) address: Option<String>,

    #[command(flatten)]
    pub(crate) buses: BusArgs,

    #[command(flatten)]
    pub(crate) output: OutputArgs,
}

#[derive(Debug, clap::Args)]
#[command(next_help_heading = "Bus Options")]
pub(crate) struct BusArgs {
    /// I2C bus device for the battery gauge and speaker.
    #[arg(long, env = "PTCTL_I2C_BUS", default_value = "/dev/i2c-1")]
    pub(crate) i2c_bus: PathBuf,

    /// SPI device for the hub.
    #[arg(long, env = "PTCTL_SPI_DEVICE", default_value = "/dev/spidev0.1")]
    pub(crate) spi_device: PathBuf,

    /// Speaker directive file [default: speaker.i2c next to the executable]
    #[arg(long, env = "PTCTL_SPEAKER_CONFIG")]
    pub(crate) speaker_config: Option<PathBuf>,

    /// Reads attempted before giving up on a device.
    #[arg(long, default_value_t = PollPolicy::DEFAULT_MAX_ATTEMPTS, value_parser = clap::value_parser!(u32).range(1..))]
    pub(crate) max_attempts: u32,

    /// Pause between read attempts, in milliseconds.
    #[arg(long, default_value_t = 100)]
    pub(crate) retry_delay_ms: u64,
}

impl BusArgs {
    pub(crate) fn poll_policy(&self) -> PollPolicy {
        PollPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.retry_delay_ms),
        )
    }
}

#[derive(Debug, clap::Args)]
#[command(next_help_heading = "Output Options")]
pub(crate) struct OutputArgs {
    /// A list of log-level filters for `tracing-subscriber`.
    #[arg(long = "trace", env = "RUST_LOG", default_value = "warn")]
    filter: tracing_subscriber::filter::Targets,
}

impl OutputArgs {
    /// Log to stderr so stdout carries only the result.
    pub(crate) fn init_tracing(&self) {
        use tracing_subscriber::prelude::*;
        tracing_subscriber::registry()
            .with(self.filter.clone())
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
