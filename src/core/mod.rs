mod engine;
mod error;
mod tax;
mod types;

pub use engine::{project, run_yearly_trace};
pub use error::ModelError;
pub use tax::{BracketTable, compute_tax};
pub use types::{Bracket, MAX_YEARS, ProjectionInputs, ProjectionResult, YearResult};
