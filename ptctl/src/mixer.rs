//! Audio routing through the ALSA `amixer` utility.
use std::process::{Command, Stdio};

use pitop_hal::Error;
use pitop_hal::speaker::AudioRouting;

/// PCM playback route control.
const ROUTE_CONTROL: &str = "numid=3";

#[derive(Debug, Default)]
pub(crate) struct Amixer;

impl AudioRouting for Amixer {
    fn query(&mut self) -> Result<String, Error> {
        let output = Command::new("amixer")
            .args(["cget", ROUTE_CONTROL])
            .stderr(Stdio::inherit())
            .output()
            .map_err(Error::Mixer)?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn set_route(&mut self, route: u32) -> Result<(), Error> {
        let status = Command::new("amixer")
            .args(["cset", ROUTE_CONTROL, &route.to_string()])
            .stdout(Stdio::null())
            .status()
            .map_err(Error::Mixer)?;
        if !status.success() {
            tracing::warn!(%status, route, "amixer could not set the audio route");
        }
        Ok(())
    }
}
