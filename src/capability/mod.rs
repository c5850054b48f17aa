pub mod mock;
pub mod monitor;
pub mod provider;
pub mod providers;
pub mod registry;
pub mod session;
pub mod sse_parser;
pub mod types;
