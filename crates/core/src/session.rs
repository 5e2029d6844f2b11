use serde::{Deserialize, Serialize};

/// Coarse account roles attached to an authenticated session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionRole {
    /// Plain end-user account.
    User,
    /// Administrator allowed to manage roles.
    Admin,
    /// Read-only auditor account.
    Auditor,
}

impl SessionRole {
    /// Parses a transport value, ignoring case.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "user" => Some(Self::User),
            "admin" => Some(Self::Admin),
            "auditor" => Some(Self::Auditor),
            _ => None,
        }
    }
}

/// Identity of the session issuing a role store request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSession {
    login_id: Option<String>,
    roles: Vec<SessionRole>,
}

impl UserSession {
    /// Creates a session from a login identity and its account roles.
    #[must_use]
    pub fn new(login_id: Option<String>, roles: Vec<SessionRole>) -> Self {
        Self { login_id, roles }
    }

    /// Creates an administrative session.
    #[must_use]
    pub fn admin(login_id: impl Into<String>) -> Self {
        Self::new(Some(login_id.into()), vec![SessionRole::Admin])
    }

    /// Creates a plain end-user session.
    #[must_use]
    pub fn user(login_id: impl Into<String>) -> Self {
        Self::new(Some(login_id.into()), vec![SessionRole::User])
    }

    /// Returns the login identity, if the session resolved one.
    #[must_use]
    pub fn login_id(&self) -> Option<&str> {
        self.login_id.as_deref()
    }

    /// Returns the account roles attached to the session.
    #[must_use]
    pub fn roles(&self) -> &[SessionRole] {
        self.roles.as_slice()
    }

    /// Returns whether the session holds the administrator role.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.roles.contains(&SessionRole::Admin)
    }

    /// Returns whether the session may list every role.
    #[must_use]
    pub fn can_read_all_roles(&self) -> bool {
        self.roles
            .iter()
            .any(|role| matches!(role, SessionRole::Admin | SessionRole::Auditor))
    }

    /// Returns the name recorded in audit and ownership fields.
    #[must_use]
    pub fn actor_name(&self) -> &str {
        self.login_id().unwrap_or("system")
    }
}
