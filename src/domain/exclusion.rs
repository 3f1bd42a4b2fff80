//! Bundled quality filter: liquidity, bounded run-up and the
//! shell/preferred/min-price exclusion, intersected.

use crate::domain::predicate::{self, EvalContext, FilterKind, TickerSet};

/// The sub-predicates making up [`FilterKind::Quality`].
pub const QUALITY_COMPONENTS: [FilterKind; 3] = [
    FilterKind::Liquidity,
    FilterKind::RunupBounded,
    FilterKind::QualityExclude,
];

/// Intersection of the three quality components, each evaluated on its
/// own against the window and day slice 0.
pub fn quality(ctx: &EvalContext<'_, '_>) -> TickerSet {
    let mut parts = QUALITY_COMPONENTS
        .iter()
        .map(|kind| predicate::evaluate(*kind, ctx));
    let Some(first) = parts.next() else {
        return TickerSet::new();
    };
    parts.fold(first, |acc, s| acc.intersection(&s).cloned().collect())
}
