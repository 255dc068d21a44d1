// Log output for the viewer binary.

/// Install a global fmt subscriber. `RUST_LOG` picks the level; defaults to `info`.
///
/// ```bash
/// RUST_LOG=debug hitbox-viewer --video clip.mp4   # seeks, loops, decoder restarts
/// RUST_LOG=warn hitbox-viewer --video clip.mp4    # fallbacks and read failures only
/// ```
pub fn init_logging() {
    use tracing_subscriber::{EnvFilter, fmt};

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // a second call (tests, embedding) keeps the first subscriber
    let _ = fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(false)
        .compact()
        .try_init();
}
