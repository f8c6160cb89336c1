//! CLI command implementations.

pub(crate) mod boards;
pub(crate) mod live;
pub(crate) mod replay;

use crate::EngineArgs;
use anyhow::{Context, Result, anyhow};
use std::path::Path;
use std::sync::Arc;
use tickbar_lib::prelude::*;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Window resolution against the embedded board sessions.
pub(crate) type SessionResolver = SessionBoundaries<&'static BoardRegistry>;

/// Builder used by every command, staging into a shared buffer.
pub(crate) type EngineBuilder = CandleBuilder<SessionResolver, Arc<UpdateBuffer>>;

/// Ingestor driving an [`EngineBuilder`].
pub(crate) type EngineIngestor = Ingestor<SessionResolver, Arc<UpdateBuffer>>;

/// Loads the configuration file (if any) and applies command-line overrides.
pub(crate) fn engine_config(path: Option<&Path>, args: &EngineArgs) -> Result<EngineConfig> {
    let mut config = match path {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => EngineConfig::default(),
    };

    if let Some(tf) = &args.timeframe {
        config.ingest.timeframe = tf.parse::<Timeframe>().map_err(|e| anyhow!("{e}"))?;
    }
    if args.price_step.is_some() {
        config.ingest.price_step = args.price_step;
    }
    if args.no_sides {
        config.ingest.track_sides = false;
    }
    if args.skip_invalid {
        config.ingest.invalid_tick_policy = InvalidTickPolicy::Skip;
    }
    if let Some(ms) = args.flush_ms {
        config.dispatch.flush_interval_ms = ms;
    }
    Ok(config)
}

/// Parses `CODE@BOARD` and checks the board is known.
pub(crate) fn parse_instrument(s: &str) -> Result<InstrumentRef> {
    let instrument: InstrumentRef = s
        .parse()
        .with_context(|| format!("Invalid instrument: {s}"))?;
    BoardRegistry::global().get(instrument.board()).with_context(|| {
        format!(
            "Unknown board {} (known: {})",
            instrument.board(),
            BoardRegistry::global().codes().join(", ")
        )
    })?;
    Ok(instrument)
}

/// Creates a builder for `instrument` staging into `buffer`.
pub(crate) fn new_builder(
    instrument: &InstrumentRef,
    config: &IngestConfig,
    buffer: &Arc<UpdateBuffer>,
) -> EngineBuilder {
    CandleBuilder::new(
        instrument.clone(),
        config.timeframe,
        SessionBoundaries::new(instrument.clone(), BoardRegistry::global()),
        Arc::clone(buffer),
    )
    .with_profile(config.profile())
}

/// Cancels `token` on Ctrl-C.
pub(crate) fn cancel_on_ctrl_c(token: &CancellationToken) {
    let token = token.clone();
    tokio::spawn(async move {
        tokio::select! {
            () = token.cancelled() => {}
            result = tokio::signal::ctrl_c() => {
                if result.is_ok() {
                    warn!("Interrupted, stopping");
                    token.cancel();
                }
            }
        }
    });
}
