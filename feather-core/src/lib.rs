pub mod clock;
pub mod id;
pub mod vector;

// Re-export key types for convenience
pub use clock::FrameClock;
pub use id::AgentId;
pub use vector::{Vector2, Vector2Ext};
