//! Provider implementations.

pub mod agent;

pub use agent::AgentClient;
