//! Interpreter configuration.

use std::fmt;
use std::io::{self, Write};

/// Default instruction budget for one top-level call.
pub const DEFAULT_FUEL: u64 = 10_000_000;

/// Default limit on nested calls and structured constructs. Fits a 2 MiB
/// thread stack in unoptimized builds.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 256;

/// Settings and output sinks for an [`Interpreter`](super::Interpreter).
///
/// ```
/// use wati::runtime::Config;
///
/// let config = Config::new().with_fuel(Some(1_000)).with_trace(true);
/// assert_eq!(config.fuel, Some(1_000));
/// ```
pub struct Config {
    /// Instructions a top-level call may execute. `None` is unbounded.
    pub fuel: Option<u64>,
    /// Limit on active calls, counting each enclosing `block`, `loop`, `if`
    /// and `br_if` condition as one more level.
    pub max_call_depth: usize,
    /// Write one line per executed instruction to `trace_sink`.
    pub trace: bool,
    /// Receives the output of the built-in `$log` call.
    pub log: Box<dyn Write>,
    pub trace_sink: Box<dyn Write>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fuel(mut self, fuel: Option<u64>) -> Self {
        self.fuel = fuel;
        self
    }

    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    pub fn with_log(mut self, log: impl Write + 'static) -> Self {
        self.log = Box::new(log);
        self
    }

    pub fn with_trace_sink(mut self, sink: impl Write + 'static) -> Self {
        self.trace_sink = Box::new(sink);
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fuel: Some(DEFAULT_FUEL),
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            trace: false,
            log: Box::new(io::stdout()),
            trace_sink: Box::new(io::stderr()),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("fuel", &self.fuel)
            .field("max_call_depth", &self.max_call_depth)
            .field("trace", &self.trace)
            .finish_non_exhaustive()
    }
}
