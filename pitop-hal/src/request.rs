//! Operator requests: a device, a command, and for the speaker an address.
//!
//! Parsing is case-insensitive and happens before any bus is opened, so an
//! unknown device or command never touches the hardware.
use crate::Error;
use crate::hub::{Brightness, HubCommand};
use crate::speaker::Channel;

/// Device names, in the order they are listed to the operator.
pub const DEVICES: [&str; 5] = ["battery", "system", "backlight", "lid", "speaker"];

/// Battery gauge queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatteryQuery {
    /// Charging or discharging.
    State,
    /// State of charge in percent.
    Capacity,
    /// Minutes until full or empty.
    Time,
}

/// A validated device/command pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    /// Query the battery gauge.
    Battery(BatteryQuery),
    /// Query or change the hub.
    Hub(HubCommand),
    /// Configure the speaker amplifier at `address`.
    Speaker {
        /// Channel to configure.
        channel: Channel,
        /// I2C address of the amplifier.
        address: u8,
    },
}

impl Request {
    /// Parse a request from its command-line words.
    ///
    /// `address` is only used (and then required) for the speaker, as hexadecimal
    /// with or without a `0x` prefix.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] naming the accepted values.
    pub fn parse(device: &str, command: &str, address: Option<&str>) -> Result<Self, Error> {
        let device = device.to_ascii_lowercase();
        let command = command.to_ascii_lowercase();
        let request = match device.as_str() {
            "battery" => Self::Battery(match command.as_str() {
                "state" => BatteryQuery::State,
                "capacity" => BatteryQuery::Capacity,
                "time" => BatteryQuery::Time,
                _ => return Err(unknown_command(&device)),
            }),
            "system" => Self::Hub(match command.as_str() {
                "state" => HubCommand::SystemState,
                "off" => HubCommand::SystemOff,
                _ => return Err(unknown_command(&device)),
            }),
            "backlight" => Self::Hub(match command.as_str() {
                "state" => HubCommand::BacklightState,
                "increase" => HubCommand::BacklightIncrease,
                "decrease" => HubCommand::BacklightDecrease,
                "on" => HubCommand::BacklightOn,
                "off" => HubCommand::BacklightOff,
                level => HubCommand::BacklightLevel(
                    level
                        .parse::<Brightness>()
                        .map_err(|_| unknown_command(&device))?,
                ),
            }),
            "lid" => Self::Hub(match command.as_str() {
                "state" => HubCommand::LidState,
                _ => return Err(unknown_command(&device)),
            }),
            "speaker" => {
                let channel = match command.as_str() {
                    "left" => Channel::Left,
                    "right" => Channel::Right,
                    "mono" => Channel::Mono,
                    _ => return Err(unknown_command(&device)),
                };
                let address = address.ok_or_else(|| {
                    Error::InvalidArgument(
                        "Speaker commands require a 3rd param with the address of the device"
                            .to_owned(),
                    )
                })?;
                Self::Speaker {
                    channel,
                    address: parse_address(address)?,
                }
            }
            _ => {
                return Err(Error::InvalidArgument(format!(
                    "Device must be one of the following: {}",
                    DEVICES.join(", ")
                )));
            }
        };
        Ok(request)
    }
}

/// Commands accepted by `device`.
pub fn commands_for(device: &str) -> &'static [&'static str] {
    match device {
        "battery" => &["state", "capacity", "time"],
        "system" => &["state", "off"],
        "backlight" => &[
            "state", "increase", "decrease", "on", "off", "1", "2", "3", "4", "5", "6", "7",
            "8", "9", "10",
        ],
        "lid" => &["state"],
        "speaker" => &["left", "right", "mono"],
        _ => &[],
    }
}

fn unknown_command(device: &str) -> Error {
    Error::InvalidArgument(format!(
        "Command must be one of the following: {}",
        commands_for(device).join(", ")
    ))
}

fn parse_address(value: &str) -> Result<u8, Error> {
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);
    u8::from_str_radix(digits, 16)
        .map_err(|_| Error::InvalidArgument(format!("'{value}' is not a hexadecimal address")))
}
