pub mod ai;
pub mod calendar;
pub mod market;
pub mod settings;
pub mod signal;
