use thiserror::Error;

/// Errors reported by the infection engine and its worker threads.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A toggle named a cell the population does not have. The engine state is untouched.
    #[error("cell index {index} is outside a population of {population_size}")]
    InvalidIndex { index: usize, population_size: usize },
    #[error("failed to spawn {name} thread: {source}")]
    Spawn {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },
}
