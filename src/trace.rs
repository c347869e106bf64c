//! Logging facade.
//!
//! With the `tracing` feature the engine logs through `tracing`. Without it
//! `trace!` and `debug!` expand to nothing and the span macros to an inert
//! [`Span`], so call sites need no `cfg` of their own.
//!
//! ```rust,ignore
//! use crate::trace::{debug_span, trace};
//!
//! let _span = debug_span!("match_pass", ?pass).entered();
//! trace!(?node, "candidate_rejected");
//! ```

#[cfg(feature = "tracing")]
pub use tracing::{debug, debug_span, info_span, trace};

#[cfg(not(feature = "tracing"))]
mod quiet {
    /// Stand-in for `tracing::Span`.
    pub struct Span;

    impl Span {
        pub fn none() -> Self {
            Span
        }

        pub fn entered(self) -> Self {
            self
        }
    }

    #[macro_export]
    macro_rules! trace {
        ($($tt:tt)*) => {};
    }

    #[macro_export]
    macro_rules! debug {
        ($($tt:tt)*) => {};
    }

    #[macro_export]
    macro_rules! debug_span {
        ($($tt:tt)*) => {
            $crate::trace::Span::none()
        };
    }

    #[macro_export]
    macro_rules! info_span {
        ($($tt:tt)*) => {
            $crate::trace::Span::none()
        };
    }

    pub use crate::{debug, debug_span, info_span, trace};
}

#[cfg(not(feature = "tracing"))]
pub use quiet::*;

/// Environment variable read for filter directives.
pub const LOG_ENV: &str = "OCCMATCH_LOG";

/// Log to stderr, filtered by `OCCMATCH_LOG` or at `info` when unset.
/// A second call keeps the first subscriber.
#[cfg(feature = "tracing")]
pub fn init_subscriber() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    let layer = fmt::layer().with_writer(std::io::stderr).with_ansi(false);
    let _ = tracing_subscriber::registry().with(layer).with(filter).try_init();
}

#[cfg(not(feature = "tracing"))]
pub fn init_subscriber() {}

#[cfg(test)]
#[path = "tests/trace.rs"]
mod tests;
