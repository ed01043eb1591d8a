pub mod attempt;
pub mod executor;
pub mod retry;
