//! Vigil: a budget-gated autonomous research daemon.
//!
//! The daemon wakes on a fixed cadence, asks a reasoning backend whether
//! anything is worth researching, gathers web and forum results for the
//! chosen topic, asks the backend to judge them, and posts interesting
//! findings to a webhook. Every reasoning call passes a hard monthly
//! budget gate first, and all state survives restarts as two JSON
//! documents on disk.
//!
//! The library is organised around small injected capabilities:
//! [`reasoning::ReasoningBackend`], [`research::WebSearchProvider`],
//! [`research::ForumSearchProvider`], and [`notify::NotificationSink`]
//! are all traits, so every layer above them tests without the network.

pub mod analysis;
pub mod brain;
pub mod budget;
pub mod config;
pub mod decision;
pub mod error;
pub mod notify;
pub mod reasoning;
pub mod research;
pub mod state;

pub use brain::{BrainLoop, CycleOutcome, StatusSnapshot};
pub use budget::{BudgetGate, ESTIMATED_COST_PER_CALL};
pub use config::BrainConfig;
pub use error::{BrainError, Result};
pub use reasoning::{AnthropicBackend, ReasoningClient};
pub use research::{EmbeddedWebSearch, RedditForumSearch, ResearchAggregator};
pub use state::{BrainMemory, BudgetTracker, StateStore};
