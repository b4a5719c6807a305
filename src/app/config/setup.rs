use anyhow::Result;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;

pub fn init(level: Level) -> Result<()> {
    // Enable logging
    tracing_subscriber::fmt()
        .with_span_events(FmtSpan::CLOSE)
        .with_max_level(level)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))?;

    tracing::debug!("logging initialised at {level}");
    Ok(())
}
