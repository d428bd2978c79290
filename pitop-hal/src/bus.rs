//! Register-bus and shift-register-bus transactions.
//!
//! Both transports are thin wrappers over the [`embedded_hal`] blocking traits, so
//! the protocol code runs unchanged against the Linux `i2c-dev` and `spidev`
//! drivers or against a simulated target in tests.
use embedded_hal::i2c::{self, I2c};
use embedded_hal::spi::{self, SpiDevice};

/// SMBus-style register access on an I2C bus.
///
/// Every transaction addresses a target and a register. Word reads are
/// little-endian, following the SMBus Read Word protocol used by the gauge.
#[derive(Debug)]
pub struct RegisterBus<I> {
    inner: I,
}

impl<I: I2c> RegisterBus<I> {
    /// Wrap an already-opened I2C bus.
    pub fn new(inner: I) -> Self {
        Self { inner }
    }

    /// Release the underlying bus.
    pub fn into_inner(self) -> I {
        self.inner
    }

    /// Read a single byte from `register`.
    pub fn read_byte(&mut self, address: u8, register: u8) -> Result<u8, i2c::ErrorKind> {
        let mut buf = [0u8; 1];
        self.inner
            .write_read(address, &[register], &mut buf)
            .map_err(|e| i2c::Error::kind(&e))?;
        Ok(buf[0])
    }

    /// Read a 16-bit little-endian word from `register`.
    pub fn read_word(&mut self, address: u8, register: u8) -> Result<u16, i2c::ErrorKind> {
        let mut buf = [0u8; 2];
        self.inner
            .write_read(address, &[register], &mut buf)
            .map_err(|e| i2c::Error::kind(&e))?;
        Ok(u16::from_le_bytes(buf))
    }

    /// Read `length` consecutive bytes starting at `register`.
    pub fn read_block(
        &mut self,
        address: u8,
        register: u8,
        length: usize,
    ) -> Result<Vec<u8>, i2c::ErrorKind> {
        let mut buf = vec![0u8; length];
        self.inner
            .write_read(address, &[register], &mut buf)
            .map_err(|e| i2c::Error::kind(&e))?;
        Ok(buf)
    }

    /// Write a single byte to `register`.
    pub fn write_byte(&mut self, address: u8, register: u8, value: u8) -> Result<(), i2c::ErrorKind> {
        self.write_block(address, register, &[value])
    }

    /// Write `values` to consecutive registers starting at `register`.
    ///
    /// No length byte is sent, matching the SMBus I2C-block write.
    pub fn write_block(
        &mut self,
        address: u8,
        register: u8,
        values: &[u8],
    ) -> Result<(), i2c::ErrorKind> {
        let mut buf = Vec::with_capacity(values.len() + 1);
        buf.push(register);
        buf.extend_from_slice(values);
        self.inner
            .write(address, &buf)
            .map_err(|e| i2c::Error::kind(&e))
    }
}

/// Full-duplex transfers on the SPI bus the hub sits on.
///
/// Chip select is driven by the [`SpiDevice`] implementation around each
/// transfer. The hub expects MSB-first bytes at 9600 Hz in mode 0, which is the
/// caller's responsibility to configure when opening the device.
#[derive(Debug)]
pub struct ShiftRegisterBus<S> {
    inner: S,
}

impl<S: SpiDevice> ShiftRegisterBus<S> {
    /// Wrap an already-configured SPI device.
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    /// Release the underlying device.
    pub fn into_inner(self) -> S {
        self.inner
    }

    /// Clock out `data` and return the bytes clocked in at the same time.
    pub fn transfer(&mut self, data: &[u8]) -> Result<Vec<u8>, spi::ErrorKind> {
        let mut buf = data.to_vec();
        self.inner
            .transfer_in_place(&mut buf)
            .map_err(|e| spi::Error::kind(&e))?;
        Ok(buf)
    }
}
