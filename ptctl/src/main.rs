use std::process::ExitCode;

use clap::Parser;
use linux_embedded_hal::Delay;
use pitop_hal::request::BatteryQuery;
use pitop_hal::{Gauge, Hub, Poller, Request, Speaker};

use cli::Cli;

mod bus;
mod cli;
mod mixer;
mod util;

fn main() -> ExitCode {
    let cli = Cli::parse();
    cli.output.init_tracing();
    match run(&cli) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Validate the request, then open only the bus its device sits on.
fn run(cli: &Cli) -> anyhow::Result<String> {
    let request = Request::parse(&cli.device, &cli.command, cli.address.as_deref())?;
    tracing::debug!(?request);
    let buses = &cli.buses;
    let poller = Poller::new(buses.poll_policy(), Delay);
    let output = match request {
        Request::Battery(query) => {
            let mut gauge = Gauge::new(bus::open_i2c(&buses.i2c_bus)?, poller);
            match query {
                BatteryQuery::State => gauge.read_state()?.to_string(),
                BatteryQuery::Capacity => gauge.read_capacity()?.to_string(),
                BatteryQuery::Time => gauge.read_time_remaining()?.to_string(),
            }
        }
        Request::Hub(command) => {
            let mut hub = Hub::new(bus::open_spi(&buses.spi_device)?, poller);
            hub.execute(command)?.to_string()
        }
        Request::Speaker { channel, address } => {
            let config = match &buses.speaker_config {
                Some(path) => path.clone(),
                None => util::default_speaker_config()?,
            };
            let mut speaker = Speaker::new(bus::open_i2c(&buses.i2c_bus)?, address);
            speaker
                .configure(channel, &config, &mut mixer::Amixer)?
                .to_string()
        }
    };
    Ok(output)
}
