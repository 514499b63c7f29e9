// Job execution and dispatch

pub mod executor;
pub mod scheduler;

pub use executor::*;
pub use scheduler::*;
