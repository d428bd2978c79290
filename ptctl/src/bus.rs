use std::path::Path;

use anyhow::Context;
use linux_embedded_hal::spidev::{SpiModeFlags, SpidevOptions};
use linux_embedded_hal::{I2cdev, SpidevDevice};
use pitop_hal::{RegisterBus, ShiftRegisterBus};

/// Hub shift-register clock.
const HUB_SPI_SPEED_HZ: u32 = 9600;

pub(crate) fn open_i2c(path: &Path) -> anyhow::Result<RegisterBus<I2cdev>> {
    let i2c = I2cdev::new(path)
        .with_context(|| format!("could not open I2C bus {}", path.display()))?;
    tracing::debug!(path = %path.display(), "opened I2C bus");
    Ok(RegisterBus::new(i2c))
}

/// Open the hub SPI device: mode 0, 8-bit words, MSB first, chip select active low.
pub(crate) fn open_spi(path: &Path) -> anyhow::Result<ShiftRegisterBus<SpidevDevice>> {
    let mut spi = SpidevDevice::open(path)
        .with_context(|| format!("could not open SPI device {}", path.display()))?;
    let options = SpidevOptions::new()
        .bits_per_word(8)
        .max_speed_hz(HUB_SPI_SPEED_HZ)
        .mode(SpiModeFlags::SPI_MODE_0)
        .lsb_first(false)
        .build();
    spi.configure(&options)
        .with_context(|| format!("could not configure SPI device {}", path.display()))?;
    tracing::debug!(path = %path.display(), speed_hz = HUB_SPI_SPEED_HZ, "opened SPI device");
    Ok(ShiftRegisterBus::new(spi))
}
