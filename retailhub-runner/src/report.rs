//! Run report: per-entity outcome, rejection counts and constraint result.

use crate::orchestrator::EntityState;
use chrono::{DateTime, Utc};
use retailhub_core::sources::SourceKind;
use retailhub_core::EntityKind;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityReport {
    pub entity: EntityKind,
    pub table: &'static str,
    pub source_kind: Option<SourceKind>,
    /// Source locator, or empty when no source was configured.
    pub source: String,
    pub state: EntityState,
    /// Stage the entity was in when it failed.
    pub failed_stage: Option<EntityState>,
    pub input_rows: usize,
    pub loaded_rows: usize,
    pub discarded: usize,
    pub rejections: BTreeMap<String, usize>,
    pub fingerprint: Option<String>,
    pub error: Option<String>,
}

impl EntityReport {
    pub fn pending(entity: EntityKind, source_kind: Option<SourceKind>, source: String) -> Self {
        Self {
            entity,
            table: entity.table_name(),
            source_kind,
            source,
            state: EntityState::Pending,
            failed_stage: None,
            input_rows: 0,
            loaded_rows: 0,
            discarded: 0,
            rejections: BTreeMap::new(),
            fingerprint: None,
            error: None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.state == EntityState::Loaded
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ConstraintOutcome {
    Applied { statements: Vec<String> },
    Skipped { reason: String },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub destination: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub entities: Vec<EntityReport>,
    pub constraints: ConstraintOutcome,
}

impl RunReport {
    /// Every entity loaded and the constraint plan applied.
    pub fn succeeded(&self) -> bool {
        self.entities.iter().all(EntityReport::is_loaded)
            && matches!(self.constraints, ConstraintOutcome::Applied { .. })
    }

    pub fn entity(&self, kind: EntityKind) -> Option<&EntityReport> {
        self.entities.iter().find(|e| e.entity == kind)
    }

    pub fn failed(&self) -> impl Iterator<Item = &EntityReport> {
        self.entities.iter().filter(|e| e.state == EntityState::Failed)
    }

    /// Statements executed by the constraint stage; empty unless applied.
    pub fn statements(&self) -> &[String] {
        match &self.constraints {
            ConstraintOutcome::Applied { statements } => statements,
            _ => &[],
        }
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn write_json(&self, path: &Path) -> std::io::Result<()> {
        let json = self.to_json_pretty().map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Plain-text summary for the terminal.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let elapsed = self.finished_at - self.started_at;
        let _ = writeln!(
            out,
            "run {} on {} ({} ms)",
            self.run_id,
            self.destination,
            elapsed.num_milliseconds()
        );
        let _ = writeln!(
            out,
            "{:<12} {:<18} {:<12} {:>8} {:>8} {:>9}  detail",
            "entity", "table", "source", "input", "loaded", "discarded"
        );
        for e in &self.entities {
            let detail = match (&e.error, e.failed_stage) {
                (Some(err), Some(stage)) => format!("FAILED while {stage}: {err}"),
                (Some(err), None) => format!("FAILED: {err}"),
                _ => e
                    .rejections
                    .iter()
                    .map(|(reason, n)| format!("{reason}={n}"))
                    .collect::<Vec<_>>()
                    .join(" "),
            };
            let source = e.source_kind.map_or_else(|| "-".to_string(), |k| k.to_string());
            let _ = writeln!(
                out,
                "{:<12} {:<18} {:<12} {:>8} {:>8} {:>9}  {}",
                e.entity.as_str(),
                e.table,
                source,
                e.input_rows,
                e.loaded_rows,
                e.discarded,
                detail
            );
        }
        let _ = match &self.constraints {
            ConstraintOutcome::Applied { statements } => {
                writeln!(out, "constraints: applied {} statements", statements.len())
            }
            ConstraintOutcome::Skipped { reason } => writeln!(out, "constraints: skipped ({reason})"),
            ConstraintOutcome::Failed { error } => writeln!(out, "constraints: FAILED: {error}"),
        };
        out
    }
}
