use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Log filter from `GROWTH_LOG`, falling back to `growth_trajectory=info`.
pub fn init() {
    let filter = EnvFilter::try_from_env("GROWTH_LOG")
        .unwrap_or_else(|_| EnvFilter::new("growth_trajectory=info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();
}
