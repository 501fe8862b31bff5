use directories::ProjectDirs;
use log::LevelFilter;
use std::fs;
use std::io::Write;

use crate::Result;

/// Initialize the logger with file and console output
///
/// # Arguments
///
/// * `verbose` - Enable debug level logging
/// * `quiet` - Suppress console output (logs still written to file)
///
/// Logs land in the platform data directory (e.g.
/// `~/.local/share/cost-optimizer/optimizer.log` on Linux), falling back to
/// the current directory when no platform directory can be resolved.
pub fn init_logger(verbose: bool, quiet: bool) -> Result<()> {
    let log_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let log_path = if let Some(proj_dirs) = ProjectDirs::from("io", "fleetops", "cost-optimizer") {
        let log_dir = proj_dirs.data_local_dir();
        fs::create_dir_all(log_dir).map_err(|e| {
            crate::ConfigError::InvalidValue(format!("Failed to create log directory: {}", e))
        })?;
        log_dir.join("optimizer.log")
    } else {
        std::env::current_dir()
            .map_err(|e| {
                crate::ConfigError::InvalidValue(format!("Failed to get current directory: {}", e))
            })?
            .join("optimizer.log")
    };

    let log_file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .map_err(|e| crate::ConfigError::InvalidValue(format!("Failed to open log file: {}", e)))?;

    let mut builder = env_logger::Builder::new();
    builder.filter_level(log_level).format_timestamp_secs();

    if quiet {
        // Only write to file when quiet
        builder.target(env_logger::Target::Pipe(Box::new(log_file)));
    } else {
        // Write to both stdout and file
        struct MultiWriter {
            stdout: std::io::Stdout,
            file: fs::File,
        }

        impl Write for MultiWriter {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                self.stdout.write_all(buf)?;
                self.file.write_all(buf)?;
                Ok(buf.len())
            }

            fn flush(&mut self) -> std::io::Result<()> {
                self.stdout.flush()?;
                self.file.flush()?;
                Ok(())
            }
        }

        let multi_writer = MultiWriter {
            stdout: std::io::stdout(),
            file: log_file,
        };
        builder.target(env_logger::Target::Pipe(Box::new(multi_writer)));
    }

    builder.init();

    if !quiet {
        log::info!("Logging to: {}", log_path.display());
    }

    Ok(())
}
