mod report;
mod simulation;

pub use report::*;
pub use simulation::*;
