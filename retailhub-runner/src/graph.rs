//! Stage dependency graph.
//!
//! Stages run in waves: a wave is every stage whose dependencies are all in
//! earlier waves. The retail graph puts the five dimensions in the first
//! wave, the orders table in the second and constraint application last.

use retailhub_core::EntityKind;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Entity(EntityKind),
    Constraints,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Entity(kind) => write!(f, "{kind}"),
            Stage::Constraints => f.write_str("constraints"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StageGraph {
    edges: BTreeMap<Stage, BTreeSet<Stage>>,
}

impl StageGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_stage(&mut self, stage: Stage) {
        self.edges.entry(stage).or_default();
    }

    /// `stage` may only start once `dependency` has succeeded.
    pub fn add_dependency(&mut self, stage: Stage, dependency: Stage) {
        self.add_stage(dependency);
        self.edges.entry(stage).or_default().insert(dependency);
    }

    /// Dimensions → orders → constraints.
    pub fn retail() -> Self {
        let mut graph = Self::new();
        let orders = Stage::Entity(EntityKind::Orders);
        for dim in EntityKind::DIMENSIONS {
            graph.add_dependency(orders, Stage::Entity(dim));
            graph.add_dependency(Stage::Constraints, Stage::Entity(dim));
        }
        graph.add_dependency(Stage::Constraints, orders);
        graph
    }

    pub fn dependencies(&self, stage: Stage) -> impl Iterator<Item = Stage> + '_ {
        self.edges.get(&stage).into_iter().flatten().copied()
    }

    /// Kahn layering. Errors with the unresolved stages if the graph has a cycle.
    pub fn waves(&self) -> Result<Vec<Vec<Stage>>, String> {
        let mut done: BTreeSet<Stage> = BTreeSet::new();
        let mut waves = Vec::new();
        while done.len() < self.edges.len() {
            let wave: Vec<Stage> = self
                .edges
                .iter()
                .filter(|(stage, deps)| !done.contains(*stage) && deps.is_subset(&done))
                .map(|(stage, _)| *stage)
                .collect();
            if wave.is_empty() {
                let stuck: Vec<String> = self
                    .edges
                    .keys()
                    .filter(|s| !done.contains(*s))
                    .map(|s| s.to_string())
                    .collect();
                return Err(format!("dependency cycle among: {}", stuck.join(", ")));
            }
            done.extend(wave.iter().copied());
            waves.push(wave);
        }
        Ok(waves)
    }
}
