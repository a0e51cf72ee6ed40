//! Request routing: ordered caching rules and first-match-wins selection.

mod router;
mod rules;

pub use router::{RouteDecision, Router};
pub use rules::{CacheRule, RuleConfig, RuleSet, StrategyKind};
