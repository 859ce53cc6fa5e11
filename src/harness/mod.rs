pub mod testbench;
pub use testbench::*;

pub mod scenarios;
pub use scenarios::*;
