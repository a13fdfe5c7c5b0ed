use serde::{Deserialize, Serialize};

/// Configuration for one extraction endpoint.
///
/// Specifies which endpoint implementation the runner wires up. Real
/// deployments implement the engine's endpoint trait over their own RPC
/// layer and use the library directly; the built-in variant exists for
/// development and smoke testing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EndpointConfig {
    /// In-memory endpoint serving seeded tables.
    Memory,
}
