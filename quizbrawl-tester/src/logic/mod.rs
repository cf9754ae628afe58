pub mod reports;
pub mod sim;
pub mod tester;

pub use sim::{PlayStyle, SimulatedPlayer, check_vitals};
pub use tester::*;
