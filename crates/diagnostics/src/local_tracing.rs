use std::{
    str::FromStr,
    sync::atomic::{AtomicBool, Ordering},
};

use tracing::Level;
use tracing_subscriber::{filter::ParseError, fmt::format::FmtSpan, EnvFilter, Layer};

static IS_TRACING_ENABLED: AtomicBool = AtomicBool::new(false);

/// Crates whose events are shown when `TRACE` is set to a plain level such as `info`.
const TARGETS: [&str; 8] = [
    "pnbundle",
    "pnbundle_bundle",
    "pnbundle_cli",
    "pnbundle_fs",
    "pnbundle_lockfile",
    "pnbundle_npmrc",
    "pnbundle_package_manifest",
    "pnbundle_packlist",
];

/// Install a global subscriber when the `TRACE` environment variable is set.
///
/// * `TRACE=<level>` enables `<level>` for the crates of this workspace.
/// * Any other value is parsed as an [`EnvFilter`] directive.
///
/// Calling it more than once does nothing.
pub fn enable_tracing_by_env() {
    let Ok(trace_var) = std::env::var("TRACE") else {
        return;
    };

    if IS_TRACING_ENABLED.swap(true, Ordering::SeqCst) {
        return;
    }

    let layer = match common_layer(&trace_var) {
        Ok(layer) => layer,
        Err(error) => {
            eprintln!("Ignoring invalid TRACE directive {trace_var:?}: {error}");
            return;
        }
    };

    use tracing_subscriber::{fmt, prelude::*};
    tracing_subscriber::registry()
        .with(layer)
        .with(fmt::layer().pretty().with_file(true).with_span_events(FmtSpan::CLOSE))
        .init();
    tracing::trace!("enable_tracing_by_env");
}

fn common_layer(
    trace_var: &str,
) -> Result<Box<dyn Layer<tracing_subscriber::Registry> + Send + Sync>, ParseError> {
    if let Ok(default_level) = Level::from_str(trace_var) {
        let targets = TARGETS.map(|target| (target, default_level));
        return Ok(tracing_subscriber::filter::Targets::new().with_targets(targets).boxed());
    }
    EnvFilter::builder().with_regex(true).parse(trace_var).map(Layer::boxed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_is_accepted() {
        for level in ["trace", "debug", "info", "warn", "error", "INFO"] {
            eprintln!("CASE: {level:?}");
            assert!(common_layer(level).is_ok());
        }
    }

    #[test]
    fn directive_is_accepted() {
        assert!(common_layer("pnbundle_bundle=debug,pnbundle::archive=trace").is_ok());
    }
}
