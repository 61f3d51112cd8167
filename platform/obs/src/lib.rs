use anyhow::{Result, anyhow};
use once_cell::sync::OnceCell;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: OnceCell<()> = OnceCell::new();

/// Configuration for tracing initialization.
#[derive(Clone, Debug)]
pub struct ObsConfig {
    pub service_name: &'static str,
    pub env_filter: Option<String>,
    pub ansi: bool,
}

impl Default for ObsConfig {
    fn default() -> Self {
        Self {
            service_name: "crm",
            env_filter: None,
            ansi: true,
        }
    }
}

/// Install the fmt subscriber once per process.
pub fn init_tracing(config: ObsConfig) -> Result<()> {
    if INIT.get().is_some() {
        return Ok(());
    }

    let filter = config
        .env_filter
        .or_else(|| std::env::var("RUST_LOG").ok())
        .unwrap_or_else(|| "info".to_string());

    let env_filter = EnvFilter::try_new(filter)?;
    // stdout is reserved for command output.
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_ansi(config.ansi)
        .with_writer(std::io::stderr);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    tracing::debug!(service = config.service_name, "tracing initialized");
    INIT.set(())
        .map_err(|_| anyhow!("tracing already initialized"))?;
    Ok(())
}
