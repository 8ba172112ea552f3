use std::{fs::OpenOptions, path::Path};

use color_eyre::Result;
use env_logger::{Env, Target};

/// Initialize the global logger.
///
/// The filter comes from `RUST_LOG` and defaults to `info`. When `file` is given the log is
/// truncated and written there so it does not interleave with the terminal output.
pub fn init(file: Option<&Path>) -> Result<()> {
    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("info"));

    if let Some(path) = file {
        let log_file = OpenOptions::new()
            .truncate(true)
            .write(true)
            .create(true)
            .open(path)?;
        builder.target(Target::Pipe(Box::new(log_file)));
    }

    builder.try_init()?;
    Ok(())
}
