//! Conditional tracing macros.
//!
//! With the `tracing` feature, `trace_span!` and `trace_event!` forward to
//! `tracing::info_span!` and `tracing::info!` (or `tracing::debug!` for
//! per-stage counts). Without it they compile away, so matching, capture and
//! buffer code can log unconditionally.

/// Info-level span around a search stage or capture.
#[cfg(feature = "tracing")]
macro_rules! trace_span {
    ($name:expr $(, $($field:tt)*)?) => {
        tracing::info_span!($name $(, $($field)*)?)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_span {
    ($name:expr $(, $($field:tt)*)?) => {
        $crate::trace::NoopSpan
    };
}

/// Event for lifecycle changes and candidate counts.
///
/// Plain events are info-level. Per-stage candidate counts are noisy on
/// multi-level searches, so they are emitted as `trace_event!(debug: ...)`.
/// Without the feature the field values are still evaluated and discarded.
#[cfg(feature = "tracing")]
macro_rules! trace_event {
    (debug: $name:expr, $($key:ident = $value:expr),+ $(,)?) => {
        tracing::debug!(name: $name, $($key = $value),+)
    };
    ($name:expr, $($key:ident = $value:expr),+ $(,)?) => {
        tracing::info!(name: $name, $($key = $value),+)
    };
    ($name:expr) => {
        tracing::info!(name: $name)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_event {
    (debug: $name:expr, $($key:ident = $value:expr),+ $(,)?) => {
        let _ = ($($value,)+);
    };
    ($name:expr, $($key:ident = $value:expr),+ $(,)?) => {
        let _ = ($($value,)+);
    };
    ($name:expr) => {};
}

pub(crate) use trace_event;
pub(crate) use trace_span;

/// Span stand-in when tracing is disabled; supports `.entered()`.
#[cfg(not(feature = "tracing"))]
pub struct NoopSpan;

#[cfg(not(feature = "tracing"))]
impl NoopSpan {
    #[inline]
    pub fn entered(self) -> Self {
        self
    }
}
