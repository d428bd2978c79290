//! Simulated gauge, hub and speaker targets.
//!
//! They implement the `embedded_hal` bus traits and answer according to a
//! script, so the protocols can be exercised without a pi-top attached.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{self, I2c};
use embedded_hal::spi::{self, SpiDevice};

use pitop_hal::{PollPolicy, Poller};

/// Records every millisecond delay instead of sleeping.
#[derive(Debug, Default)]
pub struct RecordingDelay {
    pub delays_ms: Vec<u32>,
}

impl DelayNs for RecordingDelay {
    fn delay_ns(&mut self, _ns: u32) {}

    fn delay_ms(&mut self, ms: u32) {
        self.delays_ms.push(ms);
    }
}

pub fn poller() -> Poller<RecordingDelay> {
    Poller::new(PollPolicy::default(), RecordingDelay::default())
}

/// Battery gauge answering word reads from per-register scripts.
///
/// `None` in a script is a NACK. The last scripted reply repeats forever.
#[derive(Debug, Default)]
pub struct SimGauge {
    scripts: HashMap<u8, VecDeque<Option<u16>>>,
    pub reads: Vec<u8>,
}

impl SimGauge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(mut self, register: u8, replies: &[Option<u16>]) -> Self {
        self.scripts.insert(register, replies.iter().copied().collect());
        self
    }

    pub fn words(self, register: u8, replies: &[u16]) -> Self {
        let replies: Vec<_> = replies.iter().copied().map(Some).collect();
        self.script(register, &replies)
    }

    pub fn reads_of(&self, register: u8) -> usize {
        self.reads.iter().filter(|r| **r == register).count()
    }

    fn next_reply(&mut self, register: u8) -> Option<u16> {
        let script = self
            .scripts
            .get_mut(&register)
            .unwrap_or_else(|| panic!("register {register:#04x} was not scripted"));
        if script.len() > 1 {
            script.pop_front().unwrap()
        } else {
            *script.front().expect("empty script")
        }
    }
}

impl i2c::ErrorType for SimGauge {
    type Error = i2c::ErrorKind;
}

impl I2c for SimGauge {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [i2c::Operation<'_>],
    ) -> Result<(), Self::Error> {
        assert_eq!(address, pitop_hal::battery::GAUGE_ADDRESS);
        let mut register = None;
        for operation in operations {
            match operation {
                i2c::Operation::Write(bytes) => register = Some(bytes[0]),
                i2c::Operation::Read(buf) => {
                    let register = register.expect("read without register write");
                    self.reads.push(register);
                    let word = self.next_reply(register).ok_or(i2c::ErrorKind::NoAcknowledge(
                        i2c::NoAcknowledgeSource::Data,
                    ))?;
                    let bytes = word.to_le_bytes();
                    for (dst, src) in buf.iter_mut().zip(bytes.iter().cycle()) {
                        *dst = *src;
                    }
                }
            }
        }
        Ok(())
    }
}

/// I2C target that records every write and can refuse one of them.
#[derive(Debug, Default)]
pub struct SimSpeaker {
    pub writes: Vec<(u8, Vec<u8>)>,
    pub nack_write: Option<usize>,
}

impl i2c::ErrorType for SimSpeaker {
    type Error = i2c::ErrorKind;
}

impl I2c for SimSpeaker {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [i2c::Operation<'_>],
    ) -> Result<(), Self::Error> {
        for operation in operations {
            match operation {
                i2c::Operation::Write(bytes) => {
                    if self.nack_write == Some(self.writes.len()) {
                        return Err(i2c::ErrorKind::NoAcknowledge(
                            i2c::NoAcknowledgeSource::Address,
                        ));
                    }
                    self.writes.push((address, bytes.to_vec()));
                }
                i2c::Operation::Read(_) => panic!("speaker is write-only"),
            }
        }
        Ok(())
    }
}

/// Status byte as the hub reports it, with the lid in bit 2.
pub fn report_byte(power_off: bool, screen_off: bool, lid_open: bool, brightness: u8) -> u8 {
    let mut byte = (brightness & 0x0F) << 3;
    if (brightness & 0x0F).count_ones() % 2 == 1 {
        byte |= 0x80;
    }
    byte | (u8::from(lid_open) << 2) | (u8::from(screen_off) << 1) | u8::from(power_off)
}

/// Hub microcontroller.
///
/// Answers the status request with its current status. Any other byte is taken
/// as a new status: power, screen and brightness are adopted, the lid is left
/// alone, and switching the screen off drops brightness to zero.
#[derive(Debug)]
pub struct SimHub {
    pub status: u8,
    pub sent: Vec<u8>,
    /// Number of upcoming transfers answered with zero.
    pub zero_replies: usize,
    /// Answer zero to every transfer after this many.
    pub silent_after: Option<usize>,
}

impl SimHub {
    pub fn new(status: u8) -> Self {
        Self {
            status,
            sent: Vec::new(),
            zero_replies: 0,
            silent_after: None,
        }
    }

    /// Bytes sent other than status requests.
    pub fn writes(&self) -> Vec<u8> {
        self.sent
            .iter()
            .copied()
            .filter(|b| *b != pitop_hal::hub::GET_STATUS)
            .collect()
    }

    fn exchange(&mut self, byte: u8) -> u8 {
        self.sent.push(byte);
        if self.silent_after.is_some_and(|n| self.sent.len() > n) {
            return 0;
        }
        if self.zero_replies > 0 {
            self.zero_replies -= 1;
            return 0;
        }
        let reply = self.status;
        if byte != pitop_hal::hub::GET_STATUS {
            let power_off = byte & 0x01 != 0;
            let screen_off = byte & 0x02 != 0;
            let lid_open = self.status & 0x04 != 0;
            let brightness = if screen_off { 0 } else { (byte >> 3) & 0x0F };
            self.status = report_byte(power_off, screen_off, lid_open, brightness);
        }
        reply
    }
}

impl spi::ErrorType for SimHub {
    type Error = spi::ErrorKind;
}

impl SpiDevice for SimHub {
    fn transaction(&mut self, operations: &mut [spi::Operation<'_, u8>]) -> Result<(), Self::Error> {
        for operation in operations {
            match operation {
                spi::Operation::TransferInPlace(buf) => {
                    for byte in buf.iter_mut() {
                        *byte = self.exchange(*byte);
                    }
                }
                _ => panic!("hub only supports in-place transfers"),
            }
        }
        Ok(())
    }
}
