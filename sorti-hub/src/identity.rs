//! Identity snapshot consumed by the session controller
//!
//! Credential management is external; the hub only consumes a stable user id
//! and a role flag. The snapshot is taken once at session start and threaded
//! through the flow, so a transition never queries identity state mid-flight.

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::error::{Error, Result};

/// Capability flag attached to a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
    Guest,
}

impl Role {
    /// Parse the stored role string; anything unrecognized degrades to the
    /// ordinary user capability set.
    pub fn parse(value: &str) -> Role {
        match value {
            "admin" => Role::Admin,
            "guest" => Role::Guest,
            _ => Role::User,
        }
    }
}

/// Identity facts for one request
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: String,
    pub role: Role,
}

impl Identity {
    /// Load an identity snapshot for a user id.
    pub async fn load(db: &SqlitePool, user_id: &str) -> Result<Identity> {
        let role: Option<String> = sqlx::query_scalar("SELECT role FROM users WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(db)
            .await?;

        match role {
            Some(role) => Ok(Identity {
                user_id: user_id.to_string(),
                role: Role::parse(&role),
            }),
            None => Err(Error::NotFound(format!("user {}", user_id))),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
