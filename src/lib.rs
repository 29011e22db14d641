pub mod app;
pub mod core;
pub mod queue;
pub mod system;
pub mod worker;
