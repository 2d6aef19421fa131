//! Error types for the collision world

use crate::object::ObjectId;
use thiserror::Error;

/// Collision world errors
#[derive(Debug, Error)]
pub enum PhysicsError {
    /// Object not found
    #[error("Object not found: {0:?}")]
    ObjectNotFound(ObjectId),

    /// Invalid configuration
    #[error("Invalid physics configuration: {0}")]
    InvalidConfig(String),

    /// Shape creation failed
    #[error("Failed to create collision shape: {0}")]
    ShapeCreationFailed(String),
}

/// Result type for physics operations
pub type Result<T> = std::result::Result<T, PhysicsError>;
