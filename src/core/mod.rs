mod engine;
mod types;

pub use engine::{MILESTONE_BALANCE, first_milestone_crossing, simulate};
pub use types::{Cadence, PeriodRecord, SimulationConfig};
