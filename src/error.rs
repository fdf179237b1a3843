use thiserror::Error;

/// Errors raised while building a simulator or registering organisms.
/// Stepping never fails.
#[derive(Debug, Error)]
pub enum SimulationError {
    /// Parameters the simulator cannot run with (non-positive chunk size, negative radii, ...).
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Registering more organisms than the population cap allows.
    #[error("population cap exceeded: requested {requested} organisms, cap is {cap}")]
    PopulationCapExceeded { requested: usize, cap: usize },

    /// An organism built for a different number of types per organism.
    #[error("organism has {found} types, simulator expects {expected}")]
    TypeCountMismatch { expected: usize, found: usize },

    /// An organism whose particles or matrices are inconsistent.
    #[error("invalid organism: {0}")]
    InvalidOrganism(String),

    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("invalid sampling range: {0}")]
    Sampling(#[from] rand::distr::uniform::Error),
}
