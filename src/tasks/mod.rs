pub mod detect;
pub mod event_bus;
pub mod gated;
pub mod state;
pub mod summarize;
pub mod translate;
