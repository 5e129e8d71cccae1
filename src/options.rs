//! Evaluation limits and the cooperative cancellation token checked while
//! walking the AST. JSONata evaluation is single-threaded and synchronous;
//! a cancellation token is still useful for a caller who wants to abort a
//! long-running evaluation from, say, a request-timeout handler running on
//! another thread, so the flag is atomic even though nothing here spawns
//! threads of its own.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Clone, Debug)]
pub struct Options {
    /// Wall-clock budget for a single `evaluate` call. Checked between AST
    /// node visits, not pre-emptively, so a single very expensive builtin
    /// call can still overrun it slightly.
    pub time_limit_ms: Option<u64>,
    /// Maximum path/function-call recursion depth.
    pub max_depth: Option<usize>,
    /// When set, a syntax error during parsing returns the partial AST
    /// alongside the collected errors instead of failing outright.
    pub recover: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            time_limit_ms: None,
            max_depth: None,
            recover: false,
        }
    }
}

#[derive(Clone, Debug)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) struct Budget {
    pub started_at: Instant,
    pub time_limit_ms: Option<u64>,
    pub max_depth: Option<usize>,
    pub cancellation: CancellationToken,
}

impl Budget {
    pub fn new(options: &Options, cancellation: CancellationToken) -> Self {
        Self {
            started_at: Instant::now(),
            time_limit_ms: options.time_limit_ms,
            max_depth: options.max_depth,
            cancellation,
        }
    }

    pub fn check(&self, position: crate::position::Position) -> crate::error::Result<()> {
        if self.cancellation.is_cancelled() {
            return Err(Box::new(crate::error::Error::U1003Cancelled));
        }
        if let Some(limit) = self.time_limit_ms {
            if self.started_at.elapsed().as_millis() as u64 > limit {
                return Err(Box::new(crate::error::Error::U1001TimeLimitExceeded(
                    position,
                )));
            }
        }
        Ok(())
    }

    pub fn check_depth(&self, depth: usize, position: crate::position::Position) -> crate::error::Result<()> {
        if let Some(max) = self.max_depth {
            if depth > max {
                return Err(Box::new(crate::error::Error::U1002MaxDepthExceeded(
                    position,
                )));
            }
        }
        Ok(())
    }
}
