use serde::{Deserialize, Serialize};

/// Healthy and sick totals of a population at one point in time.
///
/// Derived on demand from the population, never stored alongside it.
/// `healthy + sick` always equals the population size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AggregateCounts {
    pub healthy: usize,
    pub sick: usize,
}

impl AggregateCounts {
    pub fn total(&self) -> usize {
        self.healthy + self.sick
    }

    /// True once no healthy cell remains.
    pub fn is_saturated(&self) -> bool {
        self.healthy == 0
    }
}

/// One state delta as delivered to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellsChanged {
    /// Indices whose health changed, in the order they were applied. May be empty.
    pub changed: Vec<usize>,
    pub counts: AggregateCounts,
}
