//! The identity under test: the account whose authentication is probed.
//!
//! The password is intentionally redacted in Debug output to prevent
//! accidental logging of the credential.

use std::fmt;

/// Account identity supplied by the operator.
#[derive(Clone)]
pub struct Identity {
    /// Account email address.
    pub email: String,
    /// Account username.
    pub username: String,
    /// Optional display nickname shown by some sites after login.
    pub nickname: Option<String>,
    /// Account password (sensitive — never log). Absent in manual mode.
    password: Option<String>,
}

impl Identity {
    /// Creates a new identity.
    #[must_use]
    pub fn new(
        email: impl Into<String>,
        username: impl Into<String>,
        nickname: Option<String>,
        password: Option<String>,
    ) -> Self {
        Self {
            email: email.into(),
            username: username.into(),
            nickname,
            password,
        }
    }

    /// Returns the password, if one was supplied.
    ///
    /// Passwords are sensitive — avoid logging the return value.
    #[must_use]
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// Returns the textual markers whose presence on a page indicates an
    /// authenticated session for this identity.
    ///
    /// Markers are the email, its local part, the username, and the nickname
    /// when present. Duplicates (e.g. username equal to the email local part)
    /// are removed so they are not double-counted by the scoring heuristic.
    #[must_use]
    pub fn markers(&self) -> Vec<String> {
        let mut markers = vec![self.email.clone()];

        if let Some((local, _)) = self.email.split_once('@') {
            if !local.is_empty() {
                markers.push(local.to_string());
            }
        }

        markers.push(self.username.clone());

        if let Some(nickname) = &self.nickname {
            markers.push(nickname.clone());
        }

        let mut seen = std::collections::HashSet::new();
        markers.retain(|marker| seen.insert(marker.to_lowercase()));
        markers
    }
}

// Custom Debug impl that redacts the password.
impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("email", &self.email)
            .field("username", &self.username)
            .field("nickname", &self.nickname)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}
