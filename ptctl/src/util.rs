use std::path::PathBuf;

use anyhow::Context;

const SPEAKER_CONFIG_FILE: &str = "speaker.i2c";

/// `speaker.i2c` in the directory holding the running executable.
pub(crate) fn default_speaker_config() -> anyhow::Result<PathBuf> {
    let exe = std::env::current_exe().context("could not locate the ptctl executable")?;
    let dir = exe
        .parent()
        .context("ptctl executable has no parent directory")?;
    Ok(dir.join(SPEAKER_CONFIG_FILE))
}
