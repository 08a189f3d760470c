//! Session-resident types.

use serde::{Deserialize, Serialize};

use loomkart_core::{Email, Role, UserId};

/// Keys used for session storage.
pub mod session_keys {
    /// The authenticated user, set at login.
    pub const CURRENT_USER: &str = "current_user";
}

/// The authenticated caller, as stored in the session cookie's server-side
/// record at login and read back by the auth extractors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User ID.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: Email,
    /// Account role.
    pub role: Role,
}

impl CurrentUser {
    /// Whether this user may access the admin surface.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
