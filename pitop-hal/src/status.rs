//! Hub status byte.
//!
//! The hub reports and accepts its state as a single byte:
//!
//! | bit  | read from the hub        | written to the hub                |
//! |------|--------------------------|-----------------------------------|
//! | 7    | brightness parity        | brightness parity                 |
//! | 3..7 | brightness               | brightness                        |
//! | 2    | lid open                 | parity of bits 0 and 1            |
//! | 1    | screen off               | screen off                        |
//! | 0    | power off                | power off                         |
//!
//! Bit 2 carries a different signal in each direction. This mirrors the hub
//! firmware and must not be unified.

use bit_field::BitField;

/// Mask covering the brightness field once shifted into place.
const BRIGHTNESS_MASK: u8 = 0x78;

/// XOR of every bit of `n`.
///
/// Even number of set bits gives `false`, odd gives `true`.
pub fn parity(n: u8) -> bool {
    n.count_ones() % 2 == 1
}

/// Decoded hub status.
///
/// Build one from a byte read from the hub with [`HubStatus::decode`] (or
/// `From<u8>`), change the fields you want, then [`HubStatus::encode`] it for
/// transmission. The parity fields are derived and ignored when encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HubStatus {
    /// The hub is (or should be) powering the system down.
    pub power_off: bool,
    /// The display backlight is off.
    pub screen_off: bool,
    /// The lid is open. Only meaningful on a status read from the hub.
    pub lid_open: bool,
    /// Backlight brightness, 0 to 15. The hub operates in 1 to 10.
    pub brightness: u8,
    /// Parity of the power and screen bits, as computed when decoding.
    pub state_parity: bool,
    /// Parity of the brightness field, as computed when decoding.
    pub brightness_parity: bool,
}

impl HubStatus {
    /// Decode a status byte received from the hub.
    pub fn decode(byte: u8) -> Self {
        let brightness = byte.get_bits(3..=6);
        Self {
            power_off: byte.get_bit(0),
            screen_off: byte.get_bit(1),
            lid_open: byte.get_bit(2),
            brightness,
            state_parity: parity(byte.get_bits(0..=1)),
            brightness_parity: parity(brightness),
        }
    }

    /// Encode the status for transmission to the hub.
    ///
    /// Both parity guards are recomputed from the other fields. `lid_open` is not
    /// transmitted; bit 2 carries the power/screen parity instead.
    pub fn encode(&self) -> u8 {
        let mut byte = (self.brightness & 0x0F) << 3;
        if parity(byte & BRIGHTNESS_MASK) {
            byte.set_bit(7, true);
        }
        byte.set_bit(0, self.power_off);
        byte.set_bit(1, self.screen_off);
        if parity(byte.get_bits(0..=1)) {
            byte.set_bit(2, true);
        }
        byte
    }
}

#[doc(hidden)]
impl From<u8> for HubStatus {
    fn from(value: u8) -> Self {
        Self::decode(value)
    }
}

#[doc(hidden)]
impl From<HubStatus> for u8 {
    fn from(value: HubStatus) -> Self {
        value.encode()
    }
}

impl std::fmt::Display for HubStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{ \"power off\": {}, \"screen_off\": {}, \"state_parity\": {}, \"lid_open\": {}, \"brightness\": {}, \"brightness_parity\": {} }}",
            u8::from(self.power_off),
            u8::from(self.screen_off),
            u8::from(self.state_parity),
            u8::from(self.lid_open),
            self.brightness,
            u8::from(self.brightness_parity),
        )
    }
}
