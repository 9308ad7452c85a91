use infection_common::AggregateCounts;

/// Health of a single cell. Infection is irreversible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Health {
    Healthy,
    Sick,
}

/// Health of every cell, indexed by position on the grid.
///
/// The length is fixed at construction; cells are never added or removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Population {
    cells: Vec<Health>,
}

impl Population {
    /// Creates a population of `size` healthy cells.
    pub fn new(size: usize) -> Self {
        Self {
            cells: vec![Health::Healthy; size],
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Health> {
        self.cells.get(index).copied()
    }

    pub fn is_healthy(&self, index: usize) -> bool {
        self.get(index) == Some(Health::Healthy)
    }

    /// Marks a healthy cell sick. Returns whether the cell changed; sick or
    /// out-of-range cells are left alone.
    pub fn infect(&mut self, index: usize) -> bool {
        match self.cells.get_mut(index) {
            Some(health) if *health == Health::Healthy => {
                *health = Health::Sick;
                true
            }
            _ => false,
        }
    }

    /// Indices of every sick cell, ascending.
    pub fn sick_indices(&self) -> Vec<usize> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, health)| **health == Health::Sick)
            .map(|(index, _)| index)
            .collect()
    }

    pub fn has_healthy(&self) -> bool {
        self.cells.contains(&Health::Healthy)
    }

    /// Counts both states with a full pass over the cells.
    pub fn counts(&self) -> AggregateCounts {
        let sick = self
            .cells
            .iter()
            .filter(|health| **health == Health::Sick)
            .count();
        AggregateCounts {
            healthy: self.cells.len() - sick,
            sick,
        }
    }
}
