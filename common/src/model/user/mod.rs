//! User model

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(feature = "utoipa")]
use crate::utoipa::ToSchema;

/// User model
///
/// Registration and authentication live outside this core; users are only
/// resolved by id for display purposes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
pub struct User {
    /// Unique user ID
    pub id: Uuid,
    /// Login name
    pub username: String,
    /// Name shown on order views
    pub display_name: String,
}
