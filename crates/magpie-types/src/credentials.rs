//! Worker account credentials.

use serde::{Deserialize, Serialize};

/// Login credentials for one harvesting account.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Account username.
    pub username: String,
    /// Account email, used as the secondary login factor.
    pub email: String,
    /// Account password.
    pub password: String,
}

impl Credentials {
    /// Creates a new set of credentials.
    #[must_use]
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password: password.into(),
        }
    }
}

// Manual impl so the password never reaches logs.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}
