//! Pipeline orchestration.
//!
//! Each entity moves `Pending → Extracting → Cleaning → Loading → Loaded`,
//! or to `Failed` from any of those. Stages run in the waves of the
//! [`StageGraph`]: independent dimension extracts may run on the rayon pool,
//! loads always go one table at a time through the single destination, and
//! a stage whose dependency did not succeed fails without running. Tables
//! already loaded stay in place when a later stage fails.

use crate::destination::{Destination, LoadError};
use crate::graph::{Stage, StageGraph};
use crate::loader::SchemaLoader;
use crate::report::{ConstraintOutcome, EntityReport, RunReport};
use chrono::Utc;
use rayon::prelude::*;
use retailhub_core::clean::{clean_entity, CleanError, CleanedTable};
use retailhub_core::sources::{SourceAdapter, SourceError};
use retailhub_core::{EntityKind, RecordSet};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityState {
    Pending,
    Extracting,
    Cleaning,
    Loading,
    Loaded,
    Failed,
}

impl EntityState {
    pub fn is_terminal(self) -> bool {
        matches!(self, EntityState::Loaded | EntityState::Failed)
    }

    pub fn can_transition_to(self, next: EntityState) -> bool {
        use EntityState::*;
        match (self, next) {
            (Pending, Extracting)
            | (Extracting, Cleaning)
            | (Cleaning, Loading)
            | (Loading, Loaded) => true,
            (from, Failed) => !from.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for EntityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EntityState::Pending => "pending",
            EntityState::Extracting => "extracting",
            EntityState::Cleaning => "cleaning",
            EntityState::Loading => "loading",
            EntityState::Loaded => "loaded",
            EntityState::Failed => "failed",
        })
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Clean(#[from] CleanError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("{stage} not run: dependency {dependency} did not succeed")]
    DependencyFailed { stage: Stage, dependency: Stage },

    #[error("no source configured for {0}")]
    MissingSource(EntityKind),

    #[error("{0}")]
    Cycle(String),
}

impl PipelineError {
    /// The entity state in which this error occurs.
    pub fn stage(&self) -> EntityState {
        match self {
            PipelineError::Source(_) | PipelineError::MissingSource(_) => EntityState::Extracting,
            PipelineError::Clean(_) => EntityState::Cleaning,
            PipelineError::Load(_) => EntityState::Loading,
            PipelineError::DependencyFailed { .. } | PipelineError::Cycle(_) => EntityState::Pending,
        }
    }
}

/// One adapter per entity.
#[derive(Default)]
pub struct SourceSet {
    adapters: BTreeMap<EntityKind, Box<dyn SourceAdapter>>,
}

impl SourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, kind: EntityKind, adapter: Box<dyn SourceAdapter>) {
        self.adapters.insert(kind, adapter);
    }

    pub fn with(mut self, kind: EntityKind, adapter: Box<dyn SourceAdapter>) -> Self {
        self.insert(kind, adapter);
        self
    }

    pub fn get(&self, kind: EntityKind) -> Option<&dyn SourceAdapter> {
        self.adapters.get(&kind).map(|a| a.as_ref())
    }

    /// Report entry for `kind` before it runs.
    fn pending_report(&self, kind: EntityKind) -> EntityReport {
        match self.get(kind) {
            Some(adapter) => EntityReport::pending(kind, Some(adapter.kind()), adapter.describe()),
            None => EntityReport::pending(kind, None, String::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

/// Extract one entity's snapshot and clean it.
pub fn extract_and_clean(sources: &SourceSet, kind: EntityKind) -> Result<CleanedTable, PipelineError> {
    let raw = extract(sources, kind)?;
    clean(kind, &raw)
}

/// Pull one entity's raw snapshot from its configured source.
pub fn extract(sources: &SourceSet, kind: EntityKind) -> Result<RecordSet, PipelineError> {
    let adapter = sources.get(kind).ok_or(PipelineError::MissingSource(kind))?;
    info!(entity = %kind, source = %adapter.describe(), "extracting");
    Ok(adapter.extract()?)
}

fn clean(kind: EntityKind, raw: &RecordSet) -> Result<CleanedTable, PipelineError> {
    info!(entity = %kind, rows = raw.len(), "cleaning");
    Ok(clean_entity(kind, raw)?)
}

/// Apply `f` to every item, on the rayon pool when `parallel` and there is
/// more than one item. Output order follows input order.
fn fan_out<I, T, F>(parallel: bool, items: Vec<I>, f: F) -> Vec<T>
where
    I: Send,
    T: Send,
    F: Fn(I) -> T + Send + Sync,
{
    if parallel && items.len() > 1 {
        items.into_par_iter().map(f).collect()
    } else {
        items.into_iter().map(f).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Extract and clean the dimensions concurrently.
    pub parallel_dimensions: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            parallel_dimensions: true,
        }
    }
}

pub struct Orchestrator<D: Destination> {
    sources: SourceSet,
    loader: SchemaLoader<D>,
    graph: StageGraph,
    options: RunOptions,
    states: BTreeMap<EntityKind, EntityState>,
    history: BTreeMap<EntityKind, Vec<EntityState>>,
}

impl<D: Destination> Orchestrator<D> {
    pub fn new(sources: SourceSet, destination: D, options: RunOptions) -> Self {
        Self {
            sources,
            loader: SchemaLoader::new(destination),
            graph: StageGraph::retail(),
            options,
            states: EntityKind::ALL.into_iter().map(|k| (k, EntityState::Pending)).collect(),
            history: BTreeMap::new(),
        }
    }

    pub fn state(&self, kind: EntityKind) -> EntityState {
        self.states.get(&kind).copied().unwrap_or(EntityState::Pending)
    }

    /// States `kind` passed through during the last run, starting at `Pending`.
    pub fn history(&self, kind: EntityKind) -> &[EntityState] {
        self.history.get(&kind).map_or(&[], Vec::as_slice)
    }

    pub fn destination(&self) -> &D {
        self.loader.destination()
    }

    pub fn into_destination(self) -> D {
        self.loader.into_inner()
    }

    fn advance(&mut self, kind: EntityKind, next: EntityState) {
        let from = self.state(kind);
        if !from.can_transition_to(next) {
            warn!(entity = %kind, %from, to = %next, "unexpected state transition");
        }
        info!(entity = %kind, %from, to = %next, "state");
        self.states.insert(kind, next);
        self.history.entry(kind).or_default().push(next);
    }

    fn fail(&mut self, report: &mut EntityReport, error: &PipelineError) {
        let stage = error.stage();
        warn!(entity = %report.entity, %stage, %error, "entity failed");
        self.advance(report.entity, EntityState::Failed);
        report.state = EntityState::Failed;
        report.failed_stage = Some(stage);
        report.error = Some(error.to_string());
    }

    /// Run every stage once. Only a malformed stage graph is an `Err`; entity
    /// and constraint failures are recorded in the report.
    pub fn run(&mut self) -> Result<RunReport, PipelineError> {
        let waves = self.graph.waves().map_err(PipelineError::Cycle)?;
        let started_at = Utc::now();
        let run_id = Uuid::new_v4();
        info!(%run_id, destination = self.loader.destination().name(), "run started");

        for (kind, state) in self.states.iter_mut() {
            *state = EntityState::Pending;
            self.history.insert(*kind, vec![EntityState::Pending]);
        }
        let mut reports: BTreeMap<EntityKind, EntityReport> = EntityKind::ALL
            .into_iter()
            .map(|k| (k, self.sources.pending_report(k)))
            .collect();
        let mut succeeded: BTreeSet<Stage> = BTreeSet::new();
        let mut constraints = ConstraintOutcome::Skipped {
            reason: "not reached".into(),
        };

        for wave in waves {
            let mut runnable = Vec::new();
            for stage in wave {
                let blocked = self.graph.dependencies(stage).find(|d| !succeeded.contains(d));
                if let Some(dependency) = blocked {
                    let error = PipelineError::DependencyFailed { stage, dependency };
                    match stage {
                        Stage::Entity(kind) => {
                            if let Some(report) = reports.get_mut(&kind) {
                                self.fail(report, &error);
                            }
                        }
                        Stage::Constraints => {
                            warn!(%error, "constraint stage skipped");
                            constraints = ConstraintOutcome::Skipped {
                                reason: error.to_string(),
                            };
                        }
                    }
                    continue;
                }
                runnable.push(stage);
            }

            let kinds: Vec<EntityKind> = runnable
                .iter()
                .filter_map(|s| match s {
                    Stage::Entity(kind) => Some(*kind),
                    Stage::Constraints => None,
                })
                .collect();
            let parallel = self.options.parallel_dimensions;
            for kind in &kinds {
                self.advance(*kind, EntityState::Extracting);
            }
            let sources = &self.sources;
            let extracted = fan_out(parallel, kinds, |kind| (kind, extract(sources, kind)));

            let mut raw_sets = Vec::new();
            for (kind, result) in extracted {
                match result {
                    Ok(raw) => {
                        self.advance(kind, EntityState::Cleaning);
                        raw_sets.push((kind, raw));
                    }
                    Err(error) => {
                        if let Some(report) = reports.get_mut(&kind) {
                            self.fail(report, &error);
                        }
                    }
                }
            }
            let cleaned = fan_out(parallel, raw_sets, |(kind, raw)| (kind, clean(kind, &raw)));

            for (kind, result) in cleaned {
                let Some(mut report) = reports.remove(&kind) else {
                    continue;
                };
                match result.and_then(|table| self.load_entity(&mut report, &table)) {
                    Ok(()) => {
                        succeeded.insert(Stage::Entity(kind));
                    }
                    Err(error) => self.fail(&mut report, &error),
                }
                reports.insert(kind, report);
            }

            if runnable.contains(&Stage::Constraints) {
                info!("applying constraints");
                constraints = match self.loader.apply_constraints() {
                    Ok(statements) => {
                        succeeded.insert(Stage::Constraints);
                        ConstraintOutcome::Applied { statements }
                    }
                    Err(error) => {
                        warn!(%error, "constraint stage failed");
                        ConstraintOutcome::Failed {
                            error: error.to_string(),
                        }
                    }
                };
            }
        }

        let report = RunReport {
            run_id,
            destination: self.loader.destination().name().to_string(),
            started_at,
            finished_at: Utc::now(),
            entities: reports.into_values().collect(),
            constraints,
        };
        info!(%run_id, succeeded = report.succeeded(), "run finished");
        Ok(report)
    }

    fn load_entity(&mut self, report: &mut EntityReport, cleaned: &CleanedTable) -> Result<(), PipelineError> {
        let kind = report.entity;
        report.input_rows = cleaned.input_rows;
        report.discarded = cleaned.discarded();
        report.rejections = cleaned
            .rejection_counts()
            .into_iter()
            .map(|(reason, n)| (reason.to_string(), n))
            .collect();

        self.advance(kind, EntityState::Loading);
        let summary = self.loader.load(cleaned)?;
        self.advance(kind, EntityState::Loaded);
        report.state = EntityState::Loaded;
        report.loaded_rows = summary.rows;
        report.fingerprint = Some(summary.fingerprint);
        Ok(())
    }
}
