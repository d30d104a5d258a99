use super::{SqlLogger, truncate_sql};
use std::fmt;
use std::sync::Arc;

/// A logger that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLogger;

impl SqlLogger for NoopLogger {
    fn log(&self, _sql: &str) {}
}

/// A logger backed by a closure.
#[derive(Clone)]
pub struct FnLogger<F> {
    f: F,
}

impl<F> fmt::Debug for FnLogger<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnLogger")
    }
}

impl<F> SqlLogger for FnLogger<F>
where
    F: Fn(&str) + Send + Sync,
{
    fn log(&self, sql: &str) {
        (self.f)(sql);
    }
}

/// Wrap a closure as a [`SqlLogger`].
pub fn from_fn<F>(f: F) -> FnLogger<F>
where
    F: Fn(&str) + Send + Sync,
{
    FnLogger { f }
}

/// A logger that prints statements to stderr.
#[derive(Debug, Clone)]
pub struct StderrLogger {
    /// Truncate long SQL strings (in bytes). `None` means no truncation.
    pub max_sql_length: Option<usize>,
    /// Prefix for log lines.
    pub prefix: String,
}

impl Default for StderrLogger {
    fn default() -> Self {
        Self {
            max_sql_length: Some(200),
            prefix: "[fluentdb]".to_string(),
        }
    }
}

impl StderrLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set maximum SQL length to display.
    pub fn max_sql_length(mut self, len: usize) -> Self {
        self.max_sql_length = Some(len);
        self
    }

    /// Disable SQL truncation.
    pub fn no_truncate(mut self) -> Self {
        self.max_sql_length = None;
        self
    }

    /// Set prefix for log lines.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub(crate) fn format_line(&self, sql: &str) -> String {
        format!("{} {}", self.prefix, truncate_sql(sql, self.max_sql_length))
    }
}

impl SqlLogger for StderrLogger {
    fn log(&self, sql: &str) {
        eprintln!("{}", self.format_line(sql));
    }
}

/// Fans each statement out to several loggers, in insertion order.
#[derive(Clone, Default)]
pub struct CompositeLogger {
    loggers: Vec<Arc<dyn SqlLogger>>,
}

impl CompositeLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a logger.
    #[allow(clippy::should_implement_trait)]
    pub fn add<L: SqlLogger + 'static>(mut self, logger: L) -> Self {
        self.loggers.push(Arc::new(logger));
        self
    }

    /// Add an Arc-wrapped logger.
    pub fn add_arc(mut self, logger: Arc<dyn SqlLogger>) -> Self {
        self.loggers.push(logger);
        self
    }

    pub fn len(&self) -> usize {
        self.loggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loggers.is_empty()
    }
}

impl fmt::Debug for CompositeLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeLogger")
            .field("loggers", &self.loggers.len())
            .finish()
    }
}

impl SqlLogger for CompositeLogger {
    fn log(&self, sql: &str) {
        for logger in &self.loggers {
            logger.log(sql);
        }
    }
}
