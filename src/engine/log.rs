//! Pluggable log sink.
//!
//! The engine emits plain descriptive strings to a single configurable
//! sink. With the sink off (the default) logging is a no-op and messages
//! are never formatted.

/// Destination for engine log lines.
pub struct Logger {
    sink: Sink,
}

enum Sink {
    Off,
    Func(Box<dyn Fn(&str) + Send + Sync>),
    Tracing,
}

impl Logger {
    /// No-op logger (default).
    pub fn off() -> Self {
        Self { sink: Sink::Off }
    }

    /// Send every line to an embedder-supplied function.
    pub fn sink<F>(f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        Self {
            sink: Sink::Func(Box::new(f)),
        }
    }

    /// Route lines through `tracing::debug!` under the
    /// `statree::engine` target.
    pub fn tracing() -> Self {
        Self { sink: Sink::Tracing }
    }

    pub(crate) fn log(&self, message: impl FnOnce() -> String) {
        match &self.sink {
            Sink::Off => {}
            Sink::Func(f) => f(&message()),
            Sink::Tracing => tracing::debug!(target: "statree::engine", "{}", message()),
        }
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::off()
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.sink {
            Sink::Off => f.write_str("Logger(off)"),
            Sink::Func(_) => f.write_str("Logger(sink)"),
            Sink::Tracing => f.write_str("Logger(tracing)"),
        }
    }
}
