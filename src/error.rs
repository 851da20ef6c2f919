use thiserror::Error;

/// Every failure the planner can report, from malformed input up to the
/// solver giving up.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("The LP solver did not reach an optimal solution: {0}")]
    SolveFailure(String),

    #[error("The LP solver reported the problem as infeasible")]
    Infeasible,

    #[error(
        "No convergence after {iterations} iterations (objective {objective}, OAR violation {oar_violation}, PTV violation {ptv_violation})"
    )]
    MaxIterationsExceeded {
        iterations: usize,
        objective: f64,
        oar_violation: f64,
        ptv_violation: f64,
        /// Weights of the last solved relaxation
        weights: Vec<f64>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Error while parsing JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Error while handling CSV: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
