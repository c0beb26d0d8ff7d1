//! Orchestration loop driving the filter chain over a region
//!
//! ## Table of Contents
//! - **RiskEngine**: Region scan, per-site chain execution, fault isolation
//! - **SiteOutcome / SiteResult**: Per-site results, completed or not
//! - **RunReport**: Everything a scan produced
//!
//! The core loop is sequential and synchronous. Sites are independent, so
//! `run_parallel` fans the same per-site computation out over rayon; the
//! cache is the only shared-mutable structure crossing site boundaries and
//! already carries its own concurrency control.

use crate::error::{Result, RiskError};
use crate::event::{BoxedListener, EventKind, EventSource};
use crate::filter::{Control, Filter, ScenarioCache};
use crate::geo::{Region, Site};
use crate::pipe::Pipe;
use rayon::prelude::*;
use tracing::{info, warn};

/// How one site's computation ended
#[derive(Debug)]
pub enum SiteResult {
    /// The whole chain ran; results are in the pipe
    Completed(Pipe),
    /// A validator skipped the remaining stages; partial pipe retained
    Skipped(Pipe),
    /// A stage faulted; the scan continued with the next site
    Failed(RiskError),
}

/// One site's outcome within a run
#[derive(Debug)]
pub struct SiteOutcome {
    /// The site computed
    pub site: Site,
    /// How the computation ended
    pub result: SiteResult,
}

/// Everything a region scan produced
#[derive(Debug, Default)]
pub struct RunReport {
    outcomes: Vec<SiteOutcome>,
}

impl RunReport {
    /// All outcomes in region iteration order
    pub fn outcomes(&self) -> &[SiteOutcome] {
        &self.outcomes
    }

    /// Pipes of sites whose chain ran to completion
    pub fn completed(&self) -> impl Iterator<Item = (&Site, &Pipe)> {
        self.outcomes.iter().filter_map(|o| match &o.result {
            SiteResult::Completed(pipe) => Some((&o.site, pipe)),
            _ => None,
        })
    }

    /// Sites a validator skipped
    pub fn skipped(&self) -> impl Iterator<Item = &Site> {
        self.outcomes.iter().filter_map(|o| match &o.result {
            SiteResult::Skipped(_) => Some(&o.site),
            _ => None,
        })
    }

    /// Sites whose chain faulted, with the fault
    pub fn failed(&self) -> impl Iterator<Item = (&Site, &RiskError)> {
        self.outcomes.iter().filter_map(|o| match &o.result {
            SiteResult::Failed(e) => Some((&o.site, e)),
            _ => None,
        })
    }

    /// Number of sites scanned
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    /// Whether the scan covered no sites
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

/// The risk computation engine
///
/// Iterates a region and, for each cell-center site, runs the configured
/// filter chain against a fresh pipe and the shared cache. A per-site fault
/// never silently aborts the scan: it is recorded against the site and the
/// engine moves on (unless configured to abort).
pub struct RiskEngine {
    pub(crate) region: Region,
    pub(crate) chain: Vec<Box<dyn Filter>>,
    pub(crate) cache: ScenarioCache,
    pub(crate) events: EventSource,
    pub(crate) run_name: String,
    pub(crate) abort_on_site_error: bool,
}

impl RiskEngine {
    /// The region this engine scans
    pub fn region(&self) -> &Region {
        &self.region
    }

    /// The shared scenario cache
    pub fn cache(&self) -> &ScenarioCache {
        &self.cache
    }

    /// Register a listener for the run-level `Start`/`Stop` events
    pub fn on(&mut self, kind: EventKind, listener: BoxedListener) -> Result<()> {
        self.events.on(kind, listener)
    }

    /// Run the scan sequentially, one site at a time
    pub fn run(&self) -> Result<RunReport> {
        info!(
            run = %self.run_name,
            cells = self.region.number_of_cells(),
            "starting region scan"
        );
        self.events.raise(EventKind::Start, &self.run_pipe())?;

        let mut report = RunReport::default();
        for site in self.region.sites() {
            let result = self.compute_site(site);
            if let SiteResult::Failed(e) = &result {
                warn!(site = %site, error = %e, "site computation failed");
                if self.abort_on_site_error {
                    self.events.raise(EventKind::Stop, &self.run_pipe())?;
                    return Err(RiskError::internal(format!(
                        "run aborted at {}: {}",
                        site, e
                    )));
                }
            }
            report.outcomes.push(SiteOutcome { site, result });
        }

        self.events.raise(EventKind::Stop, &self.run_pipe())?;
        info!(run = %self.run_name, sites = report.len(), "region scan finished");
        Ok(report)
    }

    /// Run the scan across rayon workers, preserving iteration order
    ///
    /// Per-site computation is a pure function of the site, the read-only
    /// readers, and the shared cache, so fanning out is safe; each worker
    /// gets its own pipe.
    pub fn run_parallel(&self) -> Result<RunReport> {
        info!(
            run = %self.run_name,
            cells = self.region.number_of_cells(),
            "starting parallel region scan"
        );
        self.events.raise(EventKind::Start, &self.run_pipe())?;

        let outcomes: Vec<SiteOutcome> = (0..self.region.number_of_cells())
            .into_par_iter()
            .map(|index| {
                let site = self.region.center_at_index(index);
                let result = self.compute_site(site);
                if let SiteResult::Failed(e) = &result {
                    warn!(site = %site, error = %e, "site computation failed");
                }
                SiteOutcome { site, result }
            })
            .collect();

        if self.abort_on_site_error {
            if let Some(failed) = outcomes.iter().find_map(|o| match &o.result {
                SiteResult::Failed(e) => Some(format!("run aborted at {}: {}", o.site, e)),
                _ => None,
            }) {
                self.events.raise(EventKind::Stop, &self.run_pipe())?;
                return Err(RiskError::internal(failed));
            }
        }

        self.events.raise(EventKind::Stop, &self.run_pipe())?;
        info!(run = %self.run_name, sites = outcomes.len(), "parallel region scan finished");
        Ok(RunReport { outcomes })
    }

    /// Run the chain for one site against a fresh pipe
    pub fn compute_site(&self, site: Site) -> SiteResult {
        let mut pipe = Pipe::new(site, self.region);
        for filter in &self.chain {
            match filter.apply(&self.cache, &mut pipe) {
                Ok(Control::Continue) => {}
                Ok(Control::Skip) => return SiteResult::Skipped(pipe),
                Err(e) => return SiteResult::Failed(e),
            }
        }
        SiteResult::Completed(pipe)
    }

    // Run-level events carry a pipe seeded with the region's first site
    fn run_pipe(&self) -> Pipe {
        Pipe::new(self.region.from(), self.region)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::EngineBuilder;
    use crate::geo::Site;
    use crate::pipe::Pipe;
    use crate::readers::{Asset, AssetReader};
    use crate::stages::LoadAsset;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn region() -> Region {
        Region::new(
            Site::new(1.0, 2.0).unwrap(),
            Site::new(2.0, 1.0).unwrap(),
            0.5,
        )
        .unwrap()
    }

    /// Asset reader failing on one specific site
    struct FlakyAssets {
        bad: Site,
    }

    impl AssetReader for FlakyAssets {
        fn read_at(&self, site: Site) -> crate::error::Result<Asset> {
            if site == self.bad {
                Err(RiskError::reader("corrupt cell"))
            } else {
                Ok(Asset::new(100.0, site))
            }
        }
    }

    #[test]
    fn test_run_covers_every_cell() {
        let engine = EngineBuilder::new().with_region(region()).build().unwrap();
        let report = engine.run().unwrap();
        assert_eq!(report.len(), 9);
        assert_eq!(report.completed().count(), 9);
    }

    #[test]
    fn test_run_continues_past_a_faulting_site() {
        let bad = Site::new(1.5, 1.5).unwrap();
        let engine = EngineBuilder::new()
            .with_region(region())
            .with_filter(LoadAsset::new(Arc::new(FlakyAssets { bad })))
            .build()
            .unwrap();

        let report = engine.run().unwrap();
        assert_eq!(report.len(), 9);
        assert_eq!(report.completed().count(), 8);

        let failures: Vec<_> = report.failed().collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(*failures[0].0, bad);
    }

    #[test]
    fn test_abort_on_site_error_policy() {
        let bad = Site::new(1.0, 2.0).unwrap();
        let engine = EngineBuilder::new()
            .with_region(region())
            .with_filter(LoadAsset::new(Arc::new(FlakyAssets { bad })))
            .abort_on_site_error(true)
            .build()
            .unwrap();

        assert!(engine.run().is_err());
    }

    #[test]
    fn test_start_and_stop_events_fire_once_per_run() {
        let starts = Arc::new(AtomicUsize::new(0));
        let stops = Arc::new(AtomicUsize::new(0));

        let mut engine = EngineBuilder::new().with_region(region()).build().unwrap();
        {
            let starts = starts.clone();
            engine
                .on(
                    EventKind::Start,
                    Arc::new(move |_: EventKind, _: &Pipe| {
                        starts.fetch_add(1, Ordering::SeqCst);
                    }),
                )
                .unwrap();
        }
        {
            let stops = stops.clone();
            engine
                .on(
                    EventKind::Stop,
                    Arc::new(move |_: EventKind, _: &Pipe| {
                        stops.fetch_add(1, Ordering::SeqCst);
                    }),
                )
                .unwrap();
        }

        engine.run().unwrap();
        assert_eq!(starts.load(Ordering::SeqCst), 1);
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_engine_rejects_per_site_event_registration() {
        let mut engine = EngineBuilder::new().with_region(region()).build().unwrap();
        let listener: BoxedListener = Arc::new(|_: EventKind, _: &Pipe| {});
        assert!(engine.on(EventKind::ValidationFailed, listener).is_err());
    }

    #[test]
    fn test_parallel_run_matches_sequential_run() {
        let build = || {
            EngineBuilder::new()
                .with_region(region())
                .with_filter(LoadAsset::new(Arc::new(FlakyAssets {
                    bad: Site::new(1.5, 1.5).unwrap(),
                })))
                .build()
                .unwrap()
        };

        let sequential = build().run().unwrap();
        let parallel = build().run_parallel().unwrap();

        assert_eq!(sequential.len(), parallel.len());
        for (a, b) in sequential.outcomes().iter().zip(parallel.outcomes()) {
            assert_eq!(a.site, b.site);
            assert_eq!(
                matches!(a.result, SiteResult::Completed(_)),
                matches!(b.result, SiteResult::Completed(_))
            );
        }
    }
}
