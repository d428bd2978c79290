use std::path::PathBuf;

/// A polled bus transaction never produced a plausible reading.
///
/// The hub and the battery gauge both occasionally answer with zero or garbage
/// values, so every read is retried. This is returned once the whole attempt
/// budget has been spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Bus read failed {attempts} times in a row.")]
pub struct BusFailure {
    /// Number of attempts made before giving up.
    pub attempts: u32,
}

/// Wrapper for problems when talking to the hub, the battery gauge or the speaker.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Polling exhausted its attempts without a plausible reading.
    #[error(transparent)]
    Bus(#[from] BusFailure),
    /// The speaker directive file does not exist.
    #[error("Required speaker directive file {} does not exist", .path.display())]
    ConfigMissing {
        /// Path that was looked up.
        path: PathBuf,
    },
    /// The speaker directive file exists but could not be read.
    #[error("Failed to read speaker directive file {}", .path.display())]
    Io {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// A record in the speaker directive source could not be parsed.
    #[error("Invalid speaker directive on line {line}: {reason}")]
    InvalidDirective {
        /// 1-based line number of the record.
        line: usize,
        /// What was wrong with it.
        reason: String,
    },
    /// The audio mixer query did not produce a route number.
    #[error("ALSA mixer call failed to produce expected output.")]
    MixerQueryFailed,
    /// The audio mixer utility could not be run at all.
    #[error("Failed to run the ALSA mixer utility")]
    Mixer(#[source] std::io::Error),
    /// An unpolled register write was not acknowledged or otherwise failed.
    #[error("I2C write to {address:#04x} failed: {kind}")]
    I2c {
        /// Target address of the write.
        address: u8,
        /// The `embedded_hal` classification of the failure.
        kind: embedded_hal::i2c::ErrorKind,
    },
    /// The requested device or command is not recognised.
    #[error("{0}")]
    InvalidArgument(String),
}
