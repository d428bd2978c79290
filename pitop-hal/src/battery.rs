//! Battery fuel gauge.
use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

use crate::bus::RegisterBus;
use crate::poll::{PollResult, Poller};

/// I2C address of the fuel gauge.
pub const GAUGE_ADDRESS: u8 = 0x0b;

/// Gauge registers, all read as SMBus words.
pub mod registers {
    /// Signed current, positive while charging.
    pub const STATE: u8 = 0x0a;
    /// Relative state of charge in percent.
    pub const CAPACITY: u8 = 0x0d;
    /// Minutes until empty.
    pub const DISCHARGE_TIME: u8 = 0x12;
    /// Minutes until full.
    pub const CHARGING_TIME: u8 = 0x13;
}

/// Largest magnitude the state register plausibly reports.
const STATE_BOUND: i32 = 4000;
/// Currents at or above this are reported as charging.
const CHARGING_THRESHOLD: i32 = -10;
const MAX_CAPACITY: u16 = 100;
const MAX_CHARGING_MINUTES: u16 = 2400;
const MAX_DISCHARGE_MINUTES: u16 = 1800;

/// Whether the battery is gaining or losing charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargeDirection {
    /// Current into the battery, or close enough to zero.
    Charging,
    /// Current out of the battery.
    Discharging,
}

impl ChargeDirection {
    /// Classify a normalised state register value.
    pub fn from_current(current: i32) -> Self {
        if current >= CHARGING_THRESHOLD {
            Self::Charging
        } else {
            Self::Discharging
        }
    }

    /// Upper bound for a plausible time-remaining reading in this direction.
    fn max_minutes(self) -> u16 {
        match self {
            Self::Charging => MAX_CHARGING_MINUTES,
            Self::Discharging => MAX_DISCHARGE_MINUTES,
        }
    }

    /// Register holding the time remaining in this direction.
    fn time_register(self) -> u8 {
        match self {
            Self::Charging => registers::CHARGING_TIME,
            Self::Discharging => registers::DISCHARGE_TIME,
        }
    }
}

impl std::fmt::Display for ChargeDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Charging => write!(f, "Charging"),
            Self::Discharging => write!(f, "Discharging"),
        }
    }
}

/// Capacity reading in percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capacity(pub u8);

impl std::fmt::Display for Capacity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// Estimated minutes until the battery is full or empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRemaining(pub u16);

impl std::fmt::Display for TimeRemaining {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} mins", self.0)
    }
}

/// Everything the gauge can tell us, read in one go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatteryReading {
    /// Charge direction.
    pub direction: ChargeDirection,
    /// State of charge, if the gauge gave a plausible answer.
    pub capacity_percent: Option<u8>,
    /// Time to full or empty, if the gauge gave a plausible answer.
    pub minutes_remaining: Option<u16>,
}

/// Convert the raw state register word into a signed current.
///
/// Bit 15 set means the value is negative, in two's complement.
pub fn normalise_state(raw: u16) -> i32 {
    use bit_field::BitField;

    if raw.get_bit(15) {
        -(i32::from(!raw) + 1)
    } else {
        i32::from(raw)
    }
}

/// Driver for the battery fuel gauge.
#[derive(Debug)]
pub struct Gauge<I, D> {
    bus: RegisterBus<I>,
    poller: Poller<D>,
}

impl<I: I2c, D: DelayNs> Gauge<I, D> {
    /// Create a gauge driver on the given register bus.
    pub fn new(bus: RegisterBus<I>, poller: Poller<D>) -> Self {
        Self { bus, poller }
    }

    /// Release the bus and poller.
    pub fn release(self) -> (RegisterBus<I>, Poller<D>) {
        (self.bus, self.poller)
    }

    /// Poll a gauge register until `is_plausible` accepts it.
    ///
    /// Zero reads and transport errors are treated as the bus not yet being
    /// driven, and retried like any other implausible reading.
    fn poll_register(
        &mut self,
        register: u8,
        is_plausible: impl Fn(&u16) -> bool,
    ) -> PollResult<u16> {
        let bus = &mut self.bus;
        self.poller.poll(
            || match bus.read_word(GAUGE_ADDRESS, register) {
                Ok(0) => None,
                Ok(raw) => Some(raw),
                Err(kind) => {
                    tracing::debug!(register, %kind, "gauge read failed");
                    None
                }
            },
            is_plausible,
        )
    }

    /// Read whether the battery is charging or discharging.
    ///
    /// # Errors
    ///
    /// [`BusFailure`](crate::BusFailure) if no plausible current was read.
    pub fn read_state(&mut self) -> PollResult<ChargeDirection> {
        let raw = self.poll_register(registers::STATE, |raw| {
            normalise_state(*raw).abs() <= STATE_BOUND
        })?;
        let current = normalise_state(raw);
        tracing::debug!(current, "battery state");
        Ok(ChargeDirection::from_current(current))
    }

    /// Read the state of charge.
    ///
    /// # Errors
    ///
    /// [`BusFailure`](crate::BusFailure) if no plausible capacity was read.
    pub fn read_capacity(&mut self) -> PollResult<Capacity> {
        let raw = self.poll_register(registers::CAPACITY, |raw| *raw <= MAX_CAPACITY)?;
        // Bounded by MAX_CAPACITY above.
        Ok(Capacity(raw as u8))
    }

    /// Read the time until full (charging) or empty (discharging).
    ///
    /// The direction is read first, and a failure there is returned as is.
    ///
    /// # Errors
    ///
    /// [`BusFailure`](crate::BusFailure) if either read was never plausible.
    pub fn read_time_remaining(&mut self) -> PollResult<TimeRemaining> {
        let direction = self.read_state()?;
        let max = direction.max_minutes();
        let minutes = self.poll_register(direction.time_register(), |raw| *raw <= max)?;
        Ok(TimeRemaining(minutes))
    }

    /// Read direction, capacity and time remaining.
    ///
    /// Only the direction is required; capacity or time that never reads
    /// plausibly is left out of the reading.
    ///
    /// # Errors
    ///
    /// [`BusFailure`](crate::BusFailure) if the direction could not be read.
    pub fn read_all(&mut self) -> PollResult<BatteryReading> {
        let direction = self.read_state()?;
        let capacity_percent = self.read_capacity().ok().map(|c| c.0);
        let max = direction.max_minutes();
        let minutes_remaining = self
            .poll_register(direction.time_register(), |raw| *raw <= max)
            .ok();
        Ok(BatteryReading {
            direction,
            capacity_percent,
            minutes_remaining,
        })
    }
}
