//! Route selection.
//!
//! # Responsibilities
//! - Scan the rule set in order for the first pattern matching the URL
//! - Return the matched rule's strategy and partition
//! - Return an explicit pass-through decision when nothing matches
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Pure selection: no side effects, same input always same decision
//! - The request mode never affects which rule matches; it only changes
//!   behavior inside the network-first strategy

use crate::request::Request;

use super::rules::{CacheRule, RuleSet, StrategyKind};

/// Outcome of routing one request.
#[derive(Debug, Clone, Copy)]
pub struct RouteDecision<'a> {
  pub strategy: StrategyKind,
  /// The matched rule, carrying the partition name and entry cap.
  /// None for the default pass-through decision.
  pub rule: Option<&'a CacheRule>,
}

impl RouteDecision<'_> {
  pub fn cache_name(&self) -> Option<&str> {
    self.rule.map(|r| r.cache_name.as_str())
  }
}

/// Matches requests against an ordered rule set, first match wins.
#[derive(Debug, Clone)]
pub struct Router {
  rules: RuleSet,
}

impl Router {
  pub fn new(rules: RuleSet) -> Self {
    Self { rules }
  }

  /// Select the strategy and partition for a request.
  pub fn route(&self, request: &Request) -> RouteDecision<'_> {
    for rule in self.rules.rules() {
      if rule.matches(&request.url) {
        return RouteDecision {
          strategy: rule.strategy,
          rule: Some(rule),
        };
      }
    }

    RouteDecision {
      strategy: StrategyKind::PassThrough,
      rule: None,
    }
  }
}
