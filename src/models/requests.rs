//! Request DTOs for the record API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;

use crate::store::User;

/// Maximum accepted length of a user id
pub const MAX_ID_LENGTH: usize = 64;

/// Request body for POST /users
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserRequest {
    pub id: String,
    pub name: String,
    pub email: String,
}

impl CreateUserRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.id.trim().is_empty() {
            return Some("User id cannot be empty".to_string());
        }
        if self.id.len() > MAX_ID_LENGTH {
            return Some(format!(
                "User id exceeds maximum length of {} characters",
                MAX_ID_LENGTH
            ));
        }
        if self.id.contains('/') {
            return Some("User id cannot contain '/'".to_string());
        }
        if self.name.trim().is_empty() {
            return Some("Name cannot be empty".to_string());
        }
        if !self.email.contains('@') {
            return Some("Email must contain '@'".to_string());
        }
        None
    }

    pub fn into_user(self) -> User {
        User::new(self.id, self.name, self.email)
    }
}
