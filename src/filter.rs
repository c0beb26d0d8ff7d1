//! Pipeline stages and business-rule validation
//!
//! ## Table of Contents
//! - **Filter**: Trait for one pipeline stage
//! - **Control**: Continue-or-skip outcome a stage hands the engine
//! - **Specification**: Boolean business rule over a pipe's contents
//! - **Validator**: Filter raising validation events and gating the chain
//!
//! A filter reads inputs from the pipe (written by earlier stages or seeded
//! by the engine), computes, and writes its result back. Stages compose
//! without direct coupling: the chain is sequential and each call blocks
//! until the stage's pipe writes complete.

use crate::cache::{Cache, ScenarioKey};
use crate::error::Result;
use crate::event::{BoxedListener, EventKind, EventSource};
use crate::loss::ScenarioLoss;
use crate::pipe::Pipe;

/// Cache shared across sites for the expensive deterministic-scenario stage
pub type ScenarioCache = Cache<ScenarioKey, ScenarioLoss>;

/// What the engine should do after a stage completes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    /// Run the next stage in the chain
    Continue,
    /// Skip the remaining stages for this site, without error
    Skip,
}

/// Trait for one pipeline stage
///
/// Implementations are invoked once per site and must be shareable across
/// worker threads when the host parallelizes the region scan.
pub trait Filter: Send + Sync {
    /// Stage name for logging
    fn name(&self) -> &str;

    /// Run the stage against the shared pipe
    fn apply(&self, cache: &ScenarioCache, pipe: &mut Pipe) -> Result<Control>;

    /// Event source for stages that raise events; `None` for plain stages
    fn events_mut(&mut self) -> Option<&mut EventSource> {
        None
    }
}

/// A boolean business rule evaluated over a pipe's contents
pub trait Specification: Send + Sync {
    /// Whether the pipe satisfies the rule
    fn is_satisfied_by(&self, pipe: &Pipe) -> bool;

    /// Rule name for logging
    fn name(&self) -> &str {
        "specification"
    }
}

impl<F> Specification for F
where
    F: Fn(&Pipe) -> bool + Send + Sync,
{
    fn is_satisfied_by(&self, pipe: &Pipe) -> bool {
        self(pipe)
    }
}

/// A filter that gates the chain on a specification
///
/// Raises exactly one of `ValidationSucceeded` / `ValidationFailed` per site,
/// carrying the pipe to listeners, then tells the engine to continue or skip.
/// Failure is a business outcome, never an error.
pub struct Validator {
    specification: Box<dyn Specification>,
    events: EventSource,
}

impl Validator {
    /// Create a validator over the given specification
    pub fn new(specification: impl Specification + 'static) -> Self {
        Self {
            specification: Box::new(specification),
            events: EventSource::with_vocabulary([
                EventKind::ValidationSucceeded,
                EventKind::ValidationFailed,
            ]),
        }
    }

    /// Register a listener for successful validation
    pub fn on_success(&mut self, listener: BoxedListener) -> Result<()> {
        self.events.on(EventKind::ValidationSucceeded, listener)
    }

    /// Register a listener for failed validation
    pub fn on_failure(&mut self, listener: BoxedListener) -> Result<()> {
        self.events.on(EventKind::ValidationFailed, listener)
    }
}

impl Filter for Validator {
    fn name(&self) -> &str {
        self.specification.name()
    }

    fn apply(&self, _cache: &ScenarioCache, pipe: &mut Pipe) -> Result<Control> {
        if self.specification.is_satisfied_by(pipe) {
            self.events.raise(EventKind::ValidationSucceeded, pipe)?;
            Ok(Control::Continue)
        } else {
            self.events.raise(EventKind::ValidationFailed, pipe)?;
            Ok(Control::Skip)
        }
    }

    fn events_mut(&mut self) -> Option<&mut EventSource> {
        Some(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::{Region, Site};
    use crate::readers::Asset;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn pipe() -> Pipe {
        let site = Site::new(1.0, 1.0).unwrap();
        Pipe::new(site, Region::single_cell_region(site))
    }

    fn has_asset(pipe: &Pipe) -> bool {
        pipe.asset().is_ok()
    }

    #[test]
    fn test_validator_continue_on_satisfied_rule() {
        let mut validator = Validator::new(has_asset);
        let succeeded = Arc::new(AtomicUsize::new(0));
        {
            let succeeded = succeeded.clone();
            validator
                .on_success(Arc::new(move |_: EventKind, _: &Pipe| {
                    succeeded.fetch_add(1, Ordering::SeqCst);
                }))
                .unwrap();
        }

        let cache = ScenarioCache::new();
        let mut p = pipe();
        p.set_asset(Asset::new(100.0, p.site()));

        let control = validator.apply(&cache, &mut p).unwrap();
        assert_eq!(control, Control::Continue);
        assert_eq!(succeeded.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_validator_skip_on_failed_rule() {
        let mut validator = Validator::new(has_asset);
        let failed = Arc::new(AtomicUsize::new(0));
        {
            let failed = failed.clone();
            validator
                .on_failure(Arc::new(move |_: EventKind, _: &Pipe| {
                    failed.fetch_add(1, Ordering::SeqCst);
                }))
                .unwrap();
        }

        let cache = ScenarioCache::new();
        let mut p = pipe();

        let control = validator.apply(&cache, &mut p).unwrap();
        assert_eq!(control, Control::Skip);
        assert_eq!(failed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_validation_failure_is_not_an_error() {
        let validator = Validator::new(|_: &Pipe| false);
        let cache = ScenarioCache::new();
        let mut p = pipe();
        assert!(validator.apply(&cache, &mut p).is_ok());
    }
}
