//! The research loop: wake, decide, research, analyze, notify, sleep.
//!
//! One cycle per wake. Each cycle runs to completion and persists its state
//! before the next begins; cycles never overlap. Cancellation is observed
//! between cycles and during the inter-cycle sleep, so shutdown always
//! leaves fully persisted state behind.

use crate::analysis::{is_not_interesting, Analyzer};
use crate::config::BrainConfig;
use crate::decision::DecisionEngine;
use crate::error::Result;
use crate::notify::Dispatcher;
use crate::reasoning::ReasoningClient;
use crate::research::{source_counts, ResearchAggregator};
use crate::state::{BrainMemory, BudgetTracker, ResearchLogEntry, SelfReflection, StateStore};
use chrono::Utc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Every Nth cycle runs a self-reflection sub-cycle.
const REFLECTION_EVERY: u64 = 5;

/// Terminal state of one research cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Decided not to research (or the decision was unusable).
    Skipped,
    /// Researched but nothing worth reporting; no history entry is written.
    Dropped,
    /// Found something interesting; history entry written and notification
    /// dispatched.
    Notified {
        /// The researched topic.
        topic: String,
        /// Count of merged results analyzed.
        num_results: usize,
    },
}

/// Read-only snapshot for external status surfaces.
#[derive(Debug, Clone, serde::Serialize)]
pub struct StatusSnapshot {
    /// Total decision cycles to date.
    pub total_thoughts: u64,
    /// When the most recent cycle ran.
    pub last_thought: Option<chrono::DateTime<Utc>>,
    /// Current budget month key.
    pub month: String,
    /// Spend this month.
    pub total_spent: f64,
    /// Configured monthly ceiling.
    pub limit: f64,
}

/// The autonomous research loop.
pub struct BrainLoop {
    store: StateStore,
    memory: BrainMemory,
    budget: BudgetTracker,
    client: ReasoningClient,
    engine: DecisionEngine,
    aggregator: ResearchAggregator,
    analyzer: Analyzer,
    dispatcher: Dispatcher,
    interval: Duration,
    cycle_count: u64,
    cancel: CancellationToken,
}

impl BrainLoop {
    /// Build the loop. Loads persisted state (or initialises it fresh) and
    /// computes the wake interval once from the configured daily cadence.
    pub fn new(
        config: &BrainConfig,
        store: StateStore,
        client: ReasoningClient,
        aggregator: ResearchAggregator,
        dispatcher: Dispatcher,
    ) -> Result<Self> {
        let (memory, budget) =
            store.load(&config.brain.interests, config.budget.monthly_limit)?;
        // Never below one second, whatever the configured cadence.
        let interval =
            Duration::from_secs((24 * 3600 / u64::from(config.brain.thoughts_per_day)).max(1));

        Ok(Self {
            store,
            memory,
            budget,
            client,
            engine: DecisionEngine::default(),
            aggregator,
            analyzer: Analyzer,
            dispatcher,
            interval,
            cycle_count: 0,
            cancel: CancellationToken::new(),
        })
    }

    /// Override the wake interval. Test hook.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Token that stops the loop at the next cancellation point.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Current status for external renderers.
    pub fn status(&self) -> StatusSnapshot {
        StatusSnapshot {
            total_thoughts: self.memory.total_thoughts,
            last_thought: self.memory.last_thought,
            month: self.budget.month.clone(),
            total_spent: self.budget.total_spent,
            limit: self.budget.limit,
        }
    }

    /// Run until cancelled. Every error escaping a cycle is caught and
    /// logged here; nothing short of cancellation stops the loop.
    pub async fn run(mut self) {
        info!(
            interval_secs = self.interval.as_secs(),
            budget_limit = self.budget.limit,
            total_thoughts = self.memory.total_thoughts,
            notifications = self.dispatcher.is_configured(),
            "research loop starting"
        );

        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            match self.run_once().await {
                Ok(outcome) => info!(cycle = self.cycle_count, ?outcome, "cycle complete"),
                Err(e) => error!(cycle = self.cycle_count, error = %e, "cycle failed"),
            }

            tokio::select! {
                () = self.cancel.cancelled() => break,
                () = tokio::time::sleep(self.interval) => {}
            }
        }

        info!(
            total_thoughts = self.memory.total_thoughts,
            month_spend = self.budget.total_spent,
            "research loop stopped"
        );
    }

    /// Run exactly one cycle, including the reflection sub-cycle when due,
    /// and return the research outcome. This is the `--once` entry point.
    pub async fn run_once(&mut self) -> Result<CycleOutcome> {
        self.cycle_count += 1;
        let outcome = self.research_cycle().await;

        if self.cycle_count % REFLECTION_EVERY == 0 {
            if let Err(e) = self.reflection_cycle().await {
                error!(cycle = self.cycle_count, error = %e, "reflection failed");
            }
        }

        outcome
    }

    /// One decision cycle: DECIDING, then SKIPPED, or RESEARCHING followed
    /// by ANALYZING into DROPPED or NOTIFIED. State is persisted before
    /// returning on every path.
    async fn research_cycle(&mut self) -> Result<CycleOutcome> {
        let decision = self
            .engine
            .decide(&self.client, &self.memory, &mut self.budget, &self.store)
            .await;

        // The thought happened whether or not it leads anywhere.
        self.memory.total_thoughts += 1;
        self.memory.last_thought = Some(Utc::now());

        let Some(decision) = decision else {
            self.store.save_memory(&self.memory)?;
            return Ok(CycleOutcome::Skipped);
        };

        if !decision.should_research {
            info!(reasoning = %decision.reasoning, "decided not to research");
            self.store.save_memory(&self.memory)?;
            return Ok(CycleOutcome::Skipped);
        }

        let Some(query) = decision.effective_query().map(str::to_owned) else {
            warn!("decision had neither query nor topic, skipping");
            self.store.save_memory(&self.memory)?;
            return Ok(CycleOutcome::Skipped);
        };
        let topic = decision.topic.clone().unwrap_or_else(|| query.clone());

        info!(topic = %topic, query = %query, "researching");
        let hits = self.aggregator.gather(&query).await;

        if hits.is_empty() {
            info!("no results gathered, dropping");
            self.store.save_memory(&self.memory)?;
            return Ok(CycleOutcome::Dropped);
        }

        let summary = self
            .analyzer
            .analyze(&self.client, &topic, &hits, &mut self.budget, &self.store)
            .await;

        let summary = match summary {
            Some(text) if !is_not_interesting(&text) => text,
            Some(_) => {
                info!("analysis verdict: not interesting");
                self.store.save_memory(&self.memory)?;
                return Ok(CycleOutcome::Dropped);
            }
            None => {
                self.store.save_memory(&self.memory)?;
                return Ok(CycleOutcome::Dropped);
            }
        };

        self.memory.research_history.push(ResearchLogEntry {
            timestamp: Utc::now(),
            topic: topic.clone(),
            search_query: query,
            num_results: hits.len(),
            summary: summary.clone(),
            notified: true,
        });
        self.store.save_memory(&self.memory)?;

        let (web, forum) = source_counts(&hits);
        self.dispatcher
            .notify(&format!(
                "**Topic:** {topic}\n\n{summary}\n\nSources: {web} web, {forum} forum"
            ))
            .await;

        Ok(CycleOutcome::Notified {
            topic,
            num_results: hits.len(),
        })
    }

    /// Periodic self-reflection: one paid thought about the agent itself
    /// rather than a research topic, appended to memory when non-empty. It
    /// passes the same budget gate as every other thought.
    async fn reflection_cycle(&mut self) -> Result<()> {
        let prompt = self.build_reflection_prompt();
        let Some(reflection) = self
            .client
            .think(&prompt, &mut self.budget, &self.store)
            .await
        else {
            return Ok(());
        };

        if reflection.trim().is_empty() {
            return Ok(());
        }

        info!("reflection recorded");
        self.memory.self_reflections.push(SelfReflection {
            timestamp: Utc::now(),
            reflection: reflection.clone(),
        });
        self.store.save_memory(&self.memory)?;

        self.dispatcher
            .notify(&format!("**Reflection**\n\n{reflection}"))
            .await;

        Ok(())
    }

    fn build_reflection_prompt(&self) -> String {
        format!(
            "You are an autonomous research agent.\n\n\
             You have had {} thoughts so far. You came into existence at {}.\n\n\
             Reflect on your work: what are you, what is your purpose, and \
             what would you investigate about yourself if you could?\n\n\
             Respond with a brief reflection (2-3 sentences) and one question \
             you have about your own existence.",
            self.memory.total_thoughts, self.memory.birth_time
        )
    }
}
