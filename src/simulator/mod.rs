pub mod simulator;
pub use simulator::*;

pub mod trace;
pub use trace::Trace;


pub use test::{bench, BenchResult};
