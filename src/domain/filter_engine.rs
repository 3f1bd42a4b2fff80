//! Filter chain evaluation.
//!
//! A chain is folded strictly left to right: the first filter's set seeds
//! the result and every later filter is intersected (AND) or unioned (OR)
//! into it. There is no precedence, so `A OR B AND C` means
//! `(A OR B) AND C` and reordering a mixed chain changes the answer.

use crate::domain::predicate::{self, EvalContext, FilterKind, Thresholds, TickerSet};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Logic {
    #[default]
    And,
    Or,
}

impl fmt::Display for Logic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Logic::And => write!(f, "AND"),
            Logic::Or => write!(f, "OR"),
        }
    }
}

impl FromStr for Logic {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "AND" => Ok(Logic::And),
            "OR" => Ok(Logic::Or),
            other => Err(format!("unknown connective '{other}'")),
        }
    }
}

/// One step of a filter chain.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterSpec {
    pub kind: FilterKind,
    pub label: String,
    pub logic: Logic,
}

impl FilterSpec {
    pub fn new(kind: FilterKind, logic: Logic, thresholds: &Thresholds) -> Self {
        Self {
            kind,
            label: kind.label(thresholds),
            logic,
        }
    }

    pub fn name(&self) -> String {
        self.kind.to_string()
    }
}

/// Per-filter result size, in chain order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConditionCount {
    pub name: String,
    pub label: String,
    pub count: usize,
}

/// Outcome of running a chain once.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainResult {
    pub counts: Vec<ConditionCount>,
    pub recommended: TickerSet,
}

/// Left fold of `(set, connective)` pairs. `None` for an empty sequence.
/// The first connective is ignored.
pub fn fold<I>(steps: I) -> Option<TickerSet>
where
    I: IntoIterator<Item = (TickerSet, Logic)>,
{
    steps.into_iter().fold(None, |acc, (set, logic)| match acc {
        None => Some(set),
        Some(acc) => Some(match logic {
            Logic::And => acc.intersection(&set).cloned().collect(),
            Logic::Or => acc.union(&set).cloned().collect(),
        }),
    })
}

/// Every ticker on day slice 0.
pub fn universe(ctx: &EvalContext<'_, '_>) -> TickerSet {
    ctx.slices
        .latest()
        .map(|slice| slice.tickers().map(str::to_string).collect())
        .unwrap_or_default()
}

pub fn recommend(filters: &[FilterSpec], ctx: &EvalContext<'_, '_>) -> TickerSet {
    run_chain(filters, ctx).recommended
}

/// Evaluate each filter once, collecting its count and folding its set.
pub fn run_chain(filters: &[FilterSpec], ctx: &EvalContext<'_, '_>) -> ChainResult {
    let mut counts = Vec::with_capacity(filters.len());
    let mut steps = Vec::with_capacity(filters.len());
    for spec in filters {
        let set = predicate::evaluate(spec.kind, ctx);
        tracing::debug!(filter = %spec.kind, count = set.len(), "evaluated filter");
        counts.push(ConditionCount {
            name: spec.name(),
            label: spec.label.clone(),
            count: set.len(),
        });
        steps.push((set, spec.logic));
    }
    let recommended = fold(steps).unwrap_or_else(|| universe(ctx));
    ChainResult {
        counts,
        recommended,
    }
}

/// `[label]LOGIC` per filter in declared order, space separated.
pub fn summary(filters: &[FilterSpec]) -> String {
    filters
        .iter()
        .map(|f| format!("[{}]{}", f.label, f.logic))
        .collect::<Vec<_>>()
        .join(" ")
}
