use std::os::unix::process::CommandExt;

use color_eyre::eyre::Result;

use crate::config;
use crate::logging;

pub fn run(lines: usize, follow: bool) -> Result<()> {
    let log_files = logging::log_files();

    let Some(path) = log_files.last() else {
        println!("No log files found in {:?}", config::runtime_dir());
        println!("Log files are written by `leaf run`.");
        return Ok(());
    };

    let mut tail = std::process::Command::new("tail");
    tail.args(["-n", &lines.to_string()]);

    if follow {
        let err = tail.arg("-f").arg(path).exec();
        return Err(err.into());
    }

    tail.arg(path).status()?;
    Ok(())
}
