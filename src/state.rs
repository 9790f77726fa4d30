//! Persistent state: brain memory and budget tracker.
//!
//! Two JSON documents live under the configured memory directory:
//! `brain_memory.json` (identity, interests, research history, reflections)
//! and `budget_tracker.json` (rolling monthly spend). [`StateStore`] is the
//! only component that touches the files; everything else mutates in-memory
//! copies and routes them back through a save call.
//!
//! Persistence is non-transactional by design: there is exactly one writer
//! (the loop), writes are infrequent, and external readers must tolerate a
//! torn read.

use crate::error::{BrainError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Current schema version for `brain_memory.json`.
const MEMORY_VERSION: u8 = 1;

fn default_memory_version() -> u8 {
    MEMORY_VERSION
}

/// Long-lived brain memory, persisted across restarts.
///
/// `research_history` and `self_reflections` are append-only; they never
/// shrink across the process lifetime. `total_thoughts` counts every decision
/// cycle, researched or not, so it is always >= `research_history.len()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrainMemory {
    /// Schema version, default-filled when loading older documents.
    #[serde(default = "default_memory_version")]
    pub version: u8,
    /// Set once at first initialisation, never changed.
    pub birth_time: DateTime<Utc>,
    /// Total decision cycles, incremented once per cycle regardless of outcome.
    pub total_thoughts: u64,
    /// When the most recent decision cycle ran.
    pub last_thought: Option<DateTime<Utc>>,
    /// Completed research cycles, append-only.
    pub research_history: Vec<ResearchLogEntry>,
    /// Seed interest list. The loop reads it but never rewrites it.
    pub interests: Vec<String>,
    /// Periodic self-reflections, append-only.
    pub self_reflections: Vec<SelfReflection>,
}

impl Default for BrainMemory {
    fn default() -> Self {
        Self {
            version: MEMORY_VERSION,
            birth_time: Utc::now(),
            total_thoughts: 0,
            last_thought: None,
            research_history: Vec::new(),
            interests: Vec::new(),
            self_reflections: Vec::new(),
        }
    }
}

/// One completed (researched, analyzed, found interesting) cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchLogEntry {
    /// When the cycle completed.
    pub timestamp: DateTime<Utc>,
    /// The topic the decision named.
    pub topic: String,
    /// The query actually sent to the search providers.
    pub search_query: String,
    /// Count of merged results fed to the analyzer.
    pub num_results: usize,
    /// The analyzer's summary.
    pub summary: String,
    /// Whether the cycle reached the notified terminal state.
    pub notified: bool,
}

/// One periodic self-reflection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelfReflection {
    /// When the reflection ran.
    pub timestamp: DateTime<Utc>,
    /// The reflection text.
    pub reflection: String,
}

/// Rolling monthly budget tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetTracker {
    /// Month key in `YYYY-MM` form. Spend and call count reset when this
    /// differs from the wall-clock month at the next budget check.
    pub month: String,
    /// Cumulative spend this month. Non-negative, monotonically
    /// non-decreasing until the monthly reset.
    pub total_spent: f64,
    /// Paid reasoning calls this month.
    pub calls_this_month: u32,
    /// Configured monthly ceiling.
    pub limit: f64,
}

impl Default for BudgetTracker {
    fn default() -> Self {
        Self {
            month: crate::budget::month_key(Utc::now()),
            total_spent: 0.0,
            calls_this_month: 0,
            limit: 0.0,
        }
    }
}

/// Loads and persists the two state documents.
///
/// There is no separate create operation: [`StateStore::load`] returns fresh
/// state when the files do not exist yet.
#[derive(Debug, Clone)]
pub struct StateStore {
    memory_path: PathBuf,
    budget_path: PathBuf,
}

impl StateStore {
    /// Create a store rooted at `dir`. No I/O happens until load/save.
    pub fn new(dir: &Path) -> Self {
        Self {
            memory_path: dir.join("brain_memory.json"),
            budget_path: dir.join("budget_tracker.json"),
        }
    }

    /// Load the persisted pair, initialising fresh state where a file is
    /// absent. Fresh memory gets `birth_time = now` and the seed interests.
    /// The tracker's `limit` always comes from the configured value; the
    /// file only carries spend state, so a config change takes effect on
    /// the next startup.
    pub fn load(&self, seed_interests: &[String], monthly_limit: f64) -> Result<(BrainMemory, BudgetTracker)> {
        let memory = match read_json::<BrainMemory>(&self.memory_path)? {
            Some(memory) => memory,
            None => {
                debug!(path = %self.memory_path.display(), "initialising fresh brain memory");
                BrainMemory {
                    interests: seed_interests.to_vec(),
                    ..Default::default()
                }
            }
        };

        let budget = match read_json::<BudgetTracker>(&self.budget_path)? {
            Some(mut budget) => {
                budget.limit = monthly_limit;
                budget
            }
            None => {
                debug!(path = %self.budget_path.display(), "initialising fresh budget tracker");
                BudgetTracker {
                    limit: monthly_limit,
                    ..Default::default()
                }
            }
        };

        Ok((memory, budget))
    }

    /// Overwrite `brain_memory.json` with the full document.
    pub fn save_memory(&self, memory: &BrainMemory) -> Result<()> {
        write_json(&self.memory_path, memory)
    }

    /// Overwrite `budget_tracker.json` with the full document.
    pub fn save_budget(&self, budget: &BudgetTracker) -> Result<()> {
        write_json(&self.budget_path, budget)
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let bytes = match std::fs::read(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(BrainError::State(format!(
                "cannot read {}: {e}",
                path.display()
            )));
        }
    };

    let value = serde_json::from_slice(&bytes).map_err(|e| {
        BrainError::State(format!("cannot parse {}: {e}", path.display()))
    })?;

    Ok(Some(value))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            BrainError::State(format!("cannot create state dir: {e}"))
        })?;
    }

    let json = serde_json::to_string_pretty(value)
        .map_err(|e| BrainError::State(format!("cannot serialize state: {e}")))?;

    std::fs::write(path, json)
        .map_err(|e| BrainError::State(format!("cannot write {}: {e}", path.display())))
}
