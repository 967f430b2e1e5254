use std::io::IsTerminal;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is not set.
pub fn default_filter(debug: bool) -> &'static str {
    if debug {
        "vibe_sitegen=debug,warn"
    } else {
        "vibe_sitegen=warn"
    }
}

/// Install the global subscriber. Logs go to stderr so stdout stays free for
/// the interactive dialogue.
pub fn init_tracing(debug: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter(debug)))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(std::io::stderr().is_terminal())
                .with_target(debug)
                .compact(),
        )
        .try_init()?;
    Ok(())
}
