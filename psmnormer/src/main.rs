use std::fs;
use std::io;
use std::path::Path;

use clap::Parser;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use tracing::error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use psmnormer::{PsmNormalizer, PsmNormalizerError};

#[cfg(feature = "mimalloc")]
use mimalloc::MiMalloc;

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn make_filter() -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(tracing::Level::INFO.into())
        .from_env_lossy()
}

fn configure_log(log_file: Option<&Path>) -> io::Result<Option<WorkerGuard>> {
    let (file_layer, guard) = match log_file {
        Some(path) => {
            let (writer, guard) = tracing_appender::non_blocking(fs::File::create(path)?);
            let layer = fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(make_filter());
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .compact()
                .with_timer(fmt::time::ChronoLocal::rfc_3339())
                .with_writer(io::stderr)
                .with_filter(make_filter()),
        )
        .with(file_layer)
        .init();
    Ok(guard)
}

fn main() -> Result<(), PsmNormalizerError> {
    let args = PsmNormalizer::parse();
    let config_file = args.config_file.clone();

    let mut config = Figment::from(Serialized::defaults(args)).merge(Toml::file("psmnormer.toml"));
    if let Some(path) = config_file {
        config = config.merge(Toml::file_exact(path));
    }
    config = config.merge(Env::prefixed("PSMNORMER_").split("__"));
    let driver: PsmNormalizer = config.extract()?;

    let _guard = configure_log(driver.log_file.as_deref())?;
    if let Err(e) = driver.main() {
        error!("{e}");
        return Err(e);
    }
    Ok(())
}
