//! Speaker amplifier configuration.
//!
//! The speaker is configured by replaying a list of register writes (the
//! *directives*) kept in a text file next to the tool. Each record is
//!
//! ```text
//! <mode> <label> <register-hex> <value-hex>...
//! ```
//!
//! where `mode` is `w` for a write applied to every channel, or `l`, `r` or `m`
//! for a write applied only when configuring that channel.
use std::path::Path;

use embedded_hal::i2c::I2c;

use crate::Error;
use crate::bus::RegisterBus;

/// Register that must be set to 1 before the amplifier accepts configuration.
pub const WRITE_ENABLE_REGISTER: u8 = 0x00;

/// Codec behind the amplifier, reachable once configuration is enabled.
pub const CODEC_ADDRESS: u8 = 0x18;

/// Audio route the speaker expects the system mixer to be set to.
pub const EXPECTED_ROUTE: u32 = 2;

/// Speaker channel to configure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// Left speaker.
    Left,
    /// Right speaker.
    Right,
    /// Single speaker playing both channels.
    Mono,
}

impl Channel {
    /// Letter tagging directives specific to this channel.
    pub fn mode_char(self) -> char {
        match self {
            Self::Left => 'l',
            Self::Right => 'r',
            Self::Mono => 'm',
        }
    }

    fn from_mode_char(c: char) -> Option<Self> {
        match c {
            'l' => Some(Self::Left),
            'r' => Some(Self::Right),
            'm' => Some(Self::Mono),
            _ => None,
        }
    }
}

/// Which channels a directive applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveMode {
    /// Applied whatever channel is configured (`w`).
    Always,
    /// Applied only for this channel.
    Channel(Channel),
}

impl DirectiveMode {
    /// Whether a directive with this mode is replayed when configuring `channel`.
    pub fn applies_to(self, channel: Channel) -> bool {
        match self {
            Self::Always => true,
            Self::Channel(c) => c == channel,
        }
    }
}

/// One register write from the directive source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    /// Channels the write applies to.
    pub mode: DirectiveMode,
    /// Free-form name of the setting, for humans only.
    pub label: String,
    /// First register written.
    pub register: u8,
    /// Bytes written from `register` onwards.
    pub values: Vec<u8>,
}

/// The parsed directive source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectiveList(Vec<Directive>);

impl DirectiveList {
    /// Parse directive records.
    ///
    /// Blank lines, records with fewer than four fields and records with an
    /// unknown mode letter are skipped.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidDirective`] if a register or value is not hexadecimal.
    pub fn parse(source: &str) -> Result<Self, Error> {
        let mut directives = Vec::new();
        for (index, line) in source.lines().enumerate() {
            let line_number = index + 1;
            let fields: Vec<&str> = line.split_whitespace().collect();
            let [mode, label, register, values @ ..] = fields.as_slice() else {
                continue;
            };
            if values.is_empty() {
                continue;
            }
            let mode = match mode.chars().next().map(|c| c.to_ascii_lowercase()) {
                Some('w') => DirectiveMode::Always,
                Some(c) => match Channel::from_mode_char(c) {
                    Some(channel) => DirectiveMode::Channel(channel),
                    None => continue,
                },
                None => continue,
            };
            let register = parse_hex(register, line_number)?;
            let values = values
                .iter()
                .map(|v| parse_hex(v, line_number))
                .collect::<Result<Vec<_>, _>>()?;
            directives.push(Directive {
                mode,
                label: (*label).to_owned(),
                register,
                values,
            });
        }
        Ok(Self(directives))
    }

    /// Read and parse the directive file at `path`.
    ///
    /// # Errors
    ///
    /// [`Error::ConfigMissing`] if the file does not exist, [`Error::Io`] if it
    /// cannot be read, and parse errors as for [`DirectiveList::parse`].
    pub fn load(path: &Path) -> Result<Self, Error> {
        let source = std::fs::read_to_string(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                Error::ConfigMissing {
                    path: path.to_owned(),
                }
            } else {
                Error::Io {
                    path: path.to_owned(),
                    source,
                }
            }
        })?;
        Self::parse(&source)
    }

    /// Directives replayed when configuring `channel`, in file order.
    pub fn for_channel(&self, channel: Channel) -> impl Iterator<Item = &Directive> {
        self.0.iter().filter(move |d| d.mode.applies_to(channel))
    }

    /// Number of directives, whatever their mode.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no directives at all.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn parse_hex(field: &str, line: usize) -> Result<u8, Error> {
    let digits = field
        .strip_prefix("0x")
        .or_else(|| field.strip_prefix("0X"))
        .unwrap_or(field);
    u8::from_str_radix(digits, 16).map_err(|e| Error::InvalidDirective {
        line,
        reason: format!("'{field}' is not a hexadecimal byte ({e})"),
    })
}

/// System audio routing, as controlled by the ALSA mixer.
pub trait AudioRouting {
    /// Output of the mixer query for the current route.
    ///
    /// # Errors
    ///
    /// [`Error::Mixer`] if the mixer could not be queried at all.
    fn query(&mut self) -> Result<String, Error>;

    /// Switch the route to `route`.
    ///
    /// # Errors
    ///
    /// [`Error::Mixer`] if the mixer could not be run.
    fn set_route(&mut self, route: u32) -> Result<(), Error>;
}

/// Extract the route number from mixer query output.
///
/// The last line containing `values=` wins, and the number runs up to the next
/// comma or whitespace.
pub fn parse_route(output: &str) -> Option<u32> {
    let line = output.lines().rfind(|l| l.contains("values="))?;
    let (_, rest) = line.rsplit_once("values=")?;
    let value = rest
        .split(|c: char| c == ',' || c.is_whitespace())
        .next()?;
    value.parse().ok()
}

/// Make sure audio is routed to the speaker, switching it if needed.
///
/// # Errors
///
/// [`Error::MixerQueryFailed`] if the query output has no route number, and
/// errors from the [`AudioRouting`] implementation.
pub fn ensure_route(mixer: &mut impl AudioRouting) -> Result<(), Error> {
    let output = mixer.query()?;
    let route = parse_route(&output).ok_or(Error::MixerQueryFailed)?;
    if route != EXPECTED_ROUTE {
        tracing::info!(route, expected = EXPECTED_ROUTE, "switching audio route");
        mixer.set_route(EXPECTED_ROUTE)?;
    }
    Ok(())
}

/// Driver for the speaker amplifier.
#[derive(Debug)]
pub struct Speaker<I> {
    bus: RegisterBus<I>,
    address: u8,
}

impl<I: I2c> Speaker<I> {
    /// Create a driver for the amplifier at `address`.
    pub fn new(bus: RegisterBus<I>, address: u8) -> Self {
        Self { bus, address }
    }

    /// Release the bus.
    pub fn release(self) -> RegisterBus<I> {
        self.bus
    }

    fn write(&mut self, address: u8, register: u8, values: &[u8]) -> Result<(), Error> {
        self.bus
            .write_block(address, register, values)
            .map_err(|kind| Error::I2c { address, kind })
    }

    /// Replay the directives for `channel`, returning how many were written.
    ///
    /// Directives go to the codec at [`CODEC_ADDRESS`]. They are bracketed by
    /// enabling and then disabling configuration through
    /// [`WRITE_ENABLE_REGISTER`] on the amplifier's own address.
    ///
    /// # Errors
    ///
    /// [`Error::I2c`] if any write fails. Configuration is left enabled in
    /// that case.
    pub fn apply(&mut self, channel: Channel, directives: &DirectiveList) -> Result<usize, Error> {
        self.write(self.address, WRITE_ENABLE_REGISTER, &[0x01])?;
        let mut count = 0;
        for directive in directives.for_channel(channel) {
            tracing::debug!(
                label = %directive.label,
                register = directive.register,
                values = ?directive.values,
                "speaker write"
            );
            self.write(CODEC_ADDRESS, directive.register, &directive.values)?;
            count += 1;
        }
        self.write(self.address, WRITE_ENABLE_REGISTER, &[0x00])?;
        tracing::info!(count, ?channel, "speaker configured");
        Ok(count)
    }

    /// Configure the speaker for `channel`.
    ///
    /// The audio route is checked (and corrected) first, then the directive file
    /// at `directives` is loaded and replayed.
    ///
    /// # Errors
    ///
    /// See [`ensure_route`], [`DirectiveList::load`] and [`Speaker::apply`].
    pub fn configure(
        &mut self,
        channel: Channel,
        directives: &Path,
        mixer: &mut impl AudioRouting,
    ) -> Result<SpeakerWrites, Error> {
        ensure_route(mixer)?;
        let directives = DirectiveList::load(directives)?;
        self.apply(channel, &directives).map(SpeakerWrites)
    }
}

/// Number of directives written by a speaker configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeakerWrites(pub usize);

impl std::fmt::Display for SpeakerWrites {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} speaker writes", self.0)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const SOURCE: &str = "\
w reset 01 80
l left_gain 0x40 1c
r right_gain 40 2c
m mono_mix 41 03 04

# comments are skipped
x unknown 10 00
w short 02
";

    #[test]
    fn parse_skips_short_and_unknown_records() {
        let list = DirectiveList::parse(SOURCE).unwrap();
        assert_eq!(list.len(), 4);
        let mono: Vec<_> = list.for_channel(Channel::Mono).collect();
        assert_eq!(mono.len(), 2);
        assert_eq!(mono[0].register, 0x01);
        assert_eq!(mono[0].values, [0x80]);
        assert_eq!(mono[1].label, "mono_mix");
        assert_eq!(mono[1].values, [0x03, 0x04]);
    }

    #[test]
    fn mode_letters_are_case_insensitive() {
        let list = DirectiveList::parse("L gain 40 1c\nW reset 01 80\n").unwrap();
        assert_eq!(list.for_channel(Channel::Left).count(), 2);
        assert_eq!(list.for_channel(Channel::Right).count(), 1);
    }

    #[test]
    fn bad_hex_reports_line() {
        let err = DirectiveList::parse("w ok 01 02\nw bad 0g 02\n").unwrap_err();
        assert!(matches!(err, Error::InvalidDirective { line: 2, .. }));
    }

    #[test]
    fn missing_file_is_config_missing() {
        let err = DirectiveList::load(Path::new("/nonexistent/speaker.i2c")).unwrap_err();
        assert!(matches!(err, Error::ConfigMissing { .. }));
    }

    #[test]
    fn route_from_amixer_output() {
        let output = "\
numid=3,iface=MIXER,name='PCM Playback Route'
  ; type=INTEGER,access=rw------,values=1,min=0,max=2,step=0
  : values=1
";
        assert_eq!(parse_route(output), Some(1));
        assert_eq!(parse_route("  : values=2"), Some(2));
        assert_eq!(parse_route("amixer: Control default open error"), None);
        assert_eq!(parse_route("  : values=on"), None);
    }
}
