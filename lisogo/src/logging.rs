use std::fs::OpenOptions;
use std::sync::Mutex;

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Settings;

/// Installs the global subscriber.
///
/// In debug mode events go to stdout from the debug level. Otherwise they
/// are appended to the log file from the configured level, with the source
/// location of each event. `RUST_LOG` overrides the level in both cases.
pub fn init_logger(settings: &Settings) -> anyhow::Result<()> {
    if settings.debug {
        let filter = EnvFilter::builder()
            .with_default_directive(LevelFilter::DEBUG.into())
            .from_env_lossy();

        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(false).compact())
            .try_init()?;
        return Ok(());
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&settings.log_file)?;

    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(settings.log_level).into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(false)
                .with_file(true)
                .with_line_number(true),
        )
        .try_init()?;
    Ok(())
}
