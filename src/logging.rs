use tracing_subscriber::{filter::EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence; otherwise a verbosity-dependent default is
/// used. Logs go to stderr so command output on stdout stays parseable.
/// Calling this twice is harmless; the second call is ignored.
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose || cfg!(debug_assertions) {
            "songswipe_lib=debug,songswipe=debug,warn".into()
        } else {
            "songswipe_lib=info,songswipe=info,warn".into()
        }
    });

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr),
        )
        .try_init();
}
