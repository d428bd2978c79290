//! Hub microcontroller: system power, backlight and lid.
//!
//! Every hub command follows the same read-modify-write sequence. The status is
//! read twice and the second answer taken as current, the wanted fields are
//! changed and the status is encoded and sent back. The hub's reply to a write
//! is not trustworthy, so the status is then read twice more and the second
//! read reported as the state after the command.
//!
//! Nothing here is transactional. If another process talks to the hub between
//! the write and the confirmation reads, its change is reported as ours, and if
//! the confirmation fails after a successful write the hub stays in the new
//! state while the command reports an error.
use embedded_hal::delay::DelayNs;
use embedded_hal::spi::SpiDevice;

use crate::bus::ShiftRegisterBus;
use crate::poll::{PollResult, Poller};
use crate::status::HubStatus;

/// Command byte asking the hub for its status.
pub const GET_STATUS: u8 = 0xFF;

/// Brightness set by `backlight on`, whatever it was before.
const BACKLIGHT_ON_BRIGHTNESS: u8 = 5;

/// Backlight level accepted from the operator, 1 to 10.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Brightness(u8);

impl Brightness {
    /// Dimmest level the hub operates at.
    pub const MIN: Self = Self(1);
    /// Brightest level the hub operates at.
    pub const MAX: Self = Self(10);

    /// The level as a raw brightness field value.
    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Brightness {
    type Error = &'static str;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if (Self::MIN.0..=Self::MAX.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err("Brightness must be between 1 and 10.")
        }
    }
}

impl std::str::FromStr for Brightness {
    type Err = &'static str;

    /// Only the plain tokens `1` to `10` are accepted: no sign, no leading zero.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.starts_with('0') || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err("Brightness must be a whole number.");
        }
        s.parse::<u8>()
            .map_err(|_| "Brightness must be a whole number.")
            .and_then(Self::try_from)
    }
}

/// Operations understood by the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HubCommand {
    /// Report the whole status.
    SystemState,
    /// Ask the hub to power the system off.
    SystemOff,
    /// Report whether the backlight is on, and how bright.
    BacklightState,
    /// One step brighter, up to [`Brightness::MAX`].
    BacklightIncrease,
    /// One step dimmer, down to [`Brightness::MIN`].
    BacklightDecrease,
    /// Turn the backlight on at a fixed medium level.
    BacklightOn,
    /// Turn the backlight off.
    BacklightOff,
    /// Turn the backlight on at the given level.
    BacklightLevel(Brightness),
    /// Report whether the lid is open.
    LidState,
}

impl HubCommand {
    /// Whether the command changes hub state (as opposed to only reporting it).
    pub fn is_mutating(&self) -> bool {
        !matches!(
            self,
            Self::SystemState | Self::BacklightState | Self::LidState
        )
    }

    /// Compute the status to send for this command, given the current status.
    ///
    /// `None` means nothing is transmitted: either the command only reads, or
    /// the backlight is already at the end of its range.
    pub fn next_status(&self, current: HubStatus) -> Option<HubStatus> {
        let mut next = current;
        match self {
            Self::SystemState | Self::BacklightState | Self::LidState => return None,
            Self::SystemOff => next.power_off = true,
            Self::BacklightIncrease => {
                next.screen_off = false;
                if next.brightness >= Brightness::MAX.0 {
                    return None;
                }
                next.brightness += 1;
            }
            Self::BacklightDecrease => {
                next.screen_off = false;
                if next.brightness <= Brightness::MIN.0 {
                    return None;
                }
                next.brightness -= 1;
            }
            Self::BacklightOn => {
                next.screen_off = false;
                next.brightness = BACKLIGHT_ON_BRIGHTNESS;
            }
            // The hub drops brightness to zero by itself.
            Self::BacklightOff => next.screen_off = true,
            Self::BacklightLevel(level) => {
                next.screen_off = false;
                next.brightness = level.get();
            }
        }
        Some(next)
    }
}

/// Backlight as reported by `backlight state`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BacklightState {
    /// Lit at the given brightness.
    On(u8),
    /// Screen off. Any stored brightness is ignored.
    Off,
}

impl From<HubStatus> for BacklightState {
    fn from(status: HubStatus) -> Self {
        if status.screen_off {
            Self::Off
        } else {
            Self::On(status.brightness)
        }
    }
}

impl std::fmt::Display for BacklightState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::On(brightness) => write!(f, "On: {brightness}"),
            Self::Off => write!(f, "Off"),
        }
    }
}

/// Lid as reported by `lid state`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LidState {
    /// Lid open.
    Open,
    /// Lid closed.
    Closed,
}

impl From<HubStatus> for LidState {
    fn from(status: HubStatus) -> Self {
        if status.lid_open {
            Self::Open
        } else {
            Self::Closed
        }
    }
}

impl std::fmt::Display for LidState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "Open"),
            Self::Closed => write!(f, "Closed"),
        }
    }
}

/// What a hub command reports back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HubReport {
    /// Full status, for `system state` and every mutating command.
    Status(HubStatus),
    /// Backlight only.
    Backlight(BacklightState),
    /// Lid only.
    Lid(LidState),
}

impl std::fmt::Display for HubReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Status(status) => std::fmt::Display::fmt(status, f),
            Self::Backlight(state) => std::fmt::Display::fmt(state, f),
            Self::Lid(state) => std::fmt::Display::fmt(state, f),
        }
    }
}

/// Driver for the hub microcontroller.
#[derive(Debug)]
pub struct Hub<S, D> {
    bus: ShiftRegisterBus<S>,
    poller: Poller<D>,
}

impl<S: SpiDevice, D: DelayNs> Hub<S, D> {
    /// Create a hub driver on the given shift-register bus.
    pub fn new(bus: ShiftRegisterBus<S>, poller: Poller<D>) -> Self {
        Self { bus, poller }
    }

    /// Release the bus and poller.
    pub fn release(self) -> (ShiftRegisterBus<S>, Poller<D>) {
        (self.bus, self.poller)
    }

    /// Send one byte and poll until the reply starts with a non-zero byte.
    ///
    /// A zero first byte cannot be told apart from an undriven bus.
    fn transact(&mut self, byte: u8) -> PollResult<Vec<u8>> {
        let bus = &mut self.bus;
        self.poller.poll(
            || match bus.transfer(&[byte]) {
                Ok(reply) => Some(reply),
                Err(kind) => {
                    tracing::debug!(%kind, "hub transfer failed");
                    None
                }
            },
            |reply| reply.first().is_some_and(|b| *b != 0),
        )
    }

    /// Read the hub status once.
    ///
    /// # Errors
    ///
    /// [`BusFailure`](crate::BusFailure) if the hub never answered plausibly.
    pub fn read_status(&mut self) -> PollResult<HubStatus> {
        let reply = self.transact(GET_STATUS)?;
        // Plausibility guarantees a first byte.
        Ok(HubStatus::decode(reply[0]))
    }

    /// Read the status twice and return the second answer.
    ///
    /// # Errors
    ///
    /// [`BusFailure`](crate::BusFailure) if either read failed.
    pub fn settled_status(&mut self) -> PollResult<HubStatus> {
        self.read_status()?;
        self.read_status()
    }

    /// Encode and send `status`, returning the hub's raw reply.
    ///
    /// # Errors
    ///
    /// [`BusFailure`](crate::BusFailure) if the hub never acknowledged.
    pub fn write_status(&mut self, status: HubStatus) -> PollResult<Vec<u8>> {
        let byte = status.encode();
        tracing::debug!(byte, %status, "sending hub status");
        self.transact(byte)
    }

    /// Run a hub command and report the outcome.
    ///
    /// # Errors
    ///
    /// [`BusFailure`](crate::BusFailure) from any of the reads or the write.
    pub fn execute(&mut self, command: HubCommand) -> PollResult<HubReport> {
        let current = self.settled_status()?;
        let report = match command {
            HubCommand::SystemState => HubReport::Status(current),
            HubCommand::BacklightState => HubReport::Backlight(current.into()),
            HubCommand::LidState => HubReport::Lid(current.into()),
            _ => match command.next_status(current) {
                Some(next) => {
                    self.write_status(next)?;
                    HubReport::Status(self.settled_status()?)
                }
                None => {
                    tracing::debug!(?command, "backlight already at limit, nothing sent");
                    HubReport::Status(current)
                }
            },
        };
        Ok(report)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn status(brightness: u8, screen_off: bool) -> HubStatus {
        HubStatus {
            brightness,
            screen_off,
            ..Default::default()
        }
    }

    #[test]
    fn brightness_parsing() {
        assert_eq!("7".parse::<Brightness>(), Ok(Brightness(7)));
        assert!("0".parse::<Brightness>().is_err());
        assert!("11".parse::<Brightness>().is_err());
        assert!("+5".parse::<Brightness>().is_err());
        assert!("05".parse::<Brightness>().is_err());
        assert!("010".parse::<Brightness>().is_err());
        assert!("".parse::<Brightness>().is_err());
        assert!("up".parse::<Brightness>().is_err());
    }

    #[test]
    fn increase_stops_at_ten() {
        assert_eq!(HubCommand::BacklightIncrease.next_status(status(10, false)), None);
        assert_eq!(
            HubCommand::BacklightIncrease.next_status(status(9, true)),
            Some(status(10, false))
        );
    }

    #[test]
    fn decrease_stops_at_one() {
        assert_eq!(HubCommand::BacklightDecrease.next_status(status(1, false)), None);
        assert_eq!(
            HubCommand::BacklightDecrease.next_status(status(4, false)),
            Some(status(3, false))
        );
    }

    #[test]
    fn on_resets_brightness() {
        assert_eq!(
            HubCommand::BacklightOn.next_status(status(9, true)),
            Some(status(5, false))
        );
    }

    #[test]
    fn off_keeps_brightness() {
        assert_eq!(
            HubCommand::BacklightOff.next_status(status(7, false)),
            Some(status(7, true))
        );
    }

    #[test]
    fn level_sets_brightness_and_screen() {
        let level = Brightness::try_from(3).unwrap();
        assert_eq!(
            HubCommand::BacklightLevel(level).next_status(status(8, true)),
            Some(status(3, false))
        );
    }

    #[test]
    fn system_off_sets_power_off() {
        let next = HubCommand::SystemOff.next_status(status(5, false)).unwrap();
        assert!(next.power_off);
        assert_eq!(next.brightness, 5);
    }

    #[test]
    fn read_only_commands_send_nothing() {
        for command in [
            HubCommand::SystemState,
            HubCommand::BacklightState,
            HubCommand::LidState,
        ] {
            assert!(!command.is_mutating());
            assert_eq!(command.next_status(status(5, false)), None);
        }
    }

    #[test]
    fn backlight_state_reports_off_regardless_of_brightness() {
        assert_eq!(BacklightState::from(status(7, true)).to_string(), "Off");
        assert_eq!(BacklightState::from(status(7, false)).to_string(), "On: 7");
    }
}
