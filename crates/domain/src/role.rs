//! Role domain types and validation rules.
//!
//! A role is a named collection of user, group and role members. Members are a
//! tagged variant so each kind carries its own payload instead of sharing a
//! loosely typed record.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use warden_core::{AppError, AppResult, NonEmptyString};

/// Identifier of a persisted role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleId(i64);

impl RoleId {
    /// Creates a role identifier from a stored value.
    #[must_use]
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the underlying numeric value.
    #[must_use]
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl Display for RoleId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Kind of principal a role member refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrincipalKind {
    /// A directory user.
    User,
    /// A directory group.
    Group,
    /// Another role.
    Role,
}

impl PrincipalKind {
    /// Returns a stable storage value for the principal kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Group => "group",
            Self::Role => "role",
        }
    }

    /// Returns all principal kinds in reverse-index maintenance order.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[PrincipalKind] = &[
            PrincipalKind::User,
            PrincipalKind::Group,
            PrincipalKind::Role,
        ];

        ALL
    }
}

impl FromStr for PrincipalKind {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "user" => Ok(Self::User),
            "group" => Ok(Self::Group),
            "role" => Ok(Self::Role),
            _ => Err(AppError::Validation(format!(
                "unknown principal kind '{value}'"
            ))),
        }
    }
}

/// Payload shared by every member kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemberGrant {
    /// Principal name.
    pub name: String,
    /// Whether the member may administer the role.
    #[serde(default)]
    pub is_admin: bool,
}

/// One member of a role.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RoleMember {
    /// A directory user.
    User(MemberGrant),
    /// A directory group.
    Group(MemberGrant),
    /// A nested role.
    Role(MemberGrant),
}

impl RoleMember {
    /// Creates a user member.
    #[must_use]
    pub fn user(name: impl Into<String>, is_admin: bool) -> Self {
        Self::User(MemberGrant {
            name: name.into(),
            is_admin,
        })
    }

    /// Creates a group member.
    #[must_use]
    pub fn group(name: impl Into<String>, is_admin: bool) -> Self {
        Self::Group(MemberGrant {
            name: name.into(),
            is_admin,
        })
    }

    /// Creates a nested role member.
    #[must_use]
    pub fn role(name: impl Into<String>, is_admin: bool) -> Self {
        Self::Role(MemberGrant {
            name: name.into(),
            is_admin,
        })
    }

    /// Returns the principal kind of this member.
    #[must_use]
    pub fn kind(&self) -> PrincipalKind {
        match self {
            Self::User(_) => PrincipalKind::User,
            Self::Group(_) => PrincipalKind::Group,
            Self::Role(_) => PrincipalKind::Role,
        }
    }

    /// Returns the member payload.
    #[must_use]
    pub fn grant(&self) -> &MemberGrant {
        match self {
            Self::User(grant) | Self::Group(grant) | Self::Role(grant) => grant,
        }
    }

    /// Returns the principal name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.grant().name.as_str()
    }

    /// Returns the delegated-admin flag.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.grant().is_admin
    }

    fn trim_name(&mut self) {
        let grant = match self {
            Self::User(grant) | Self::Group(grant) | Self::Role(grant) => grant,
        };
        grant.name = grant.name.trim().to_owned();
    }
}

/// Free-form role options.
pub type RoleOptions = BTreeMap<String, Value>;

/// Caller-supplied role content for create and update.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RoleInput {
    /// Unique role name.
    pub name: String,
    /// Optional description.
    #[serde(default)]
    pub description: String,
    /// Role members.
    #[serde(default)]
    pub members: Vec<RoleMember>,
    /// Free-form options.
    #[serde(default)]
    pub options: RoleOptions,
}

impl RoleInput {
    /// Creates an input with a name and no members.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Appends a member and returns the updated input.
    #[must_use]
    pub fn with_member(mut self, member: RoleMember) -> Self {
        self.members.push(member);
        self
    }

    /// Validates the input and returns it with trimmed role and member names.
    pub fn validated(mut self) -> AppResult<Self> {
        let name = NonEmptyString::new(self.name.trim())
            .map_err(|_| AppError::Validation("role name must not be empty".to_owned()))?;
        self.name = name.into();
        self.members.iter_mut().for_each(RoleMember::trim_name);

        let mut seen = BTreeSet::new();
        for member in &self.members {
            if member.name().is_empty() {
                return Err(AppError::Validation(format!(
                    "role '{}' has a {} member with an empty name",
                    self.name,
                    member.kind().as_str()
                )));
            }

            if member.kind() == PrincipalKind::Role && member.name() == self.name {
                return Err(AppError::Validation(format!(
                    "role '{}' cannot be a member of itself",
                    self.name
                )));
            }

            if !seen.insert((member.kind(), member.name())) {
                return Err(AppError::Validation(format!(
                    "role '{}' lists {} '{}' more than once",
                    self.name,
                    member.kind().as_str(),
                    member.name()
                )));
            }
        }

        Ok(self)
    }
}

/// Persisted role with audit metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Generated identifier.
    pub id: RoleId,
    /// Unique role name.
    pub name: String,
    /// Role description.
    pub description: String,
    /// Role members.
    pub members: Vec<RoleMember>,
    /// Free-form options.
    pub options: RoleOptions,
    /// Login that created the role.
    pub created_by: String,
    /// Login that last updated the role.
    pub updated_by: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
    /// Bumped whenever policies depending on the role must be refreshed.
    pub policy_version: i64,
    /// Bumped on update when roles are versioned per service.
    pub role_version: i64,
}

impl Role {
    /// Returns the distinct member names of one kind.
    #[must_use]
    pub fn member_names(&self, kind: PrincipalKind) -> BTreeSet<&str> {
        self.members
            .iter()
            .filter(|member| member.kind() == kind)
            .map(RoleMember::name)
            .collect()
    }

    /// Returns whether the role lists the principal as a member.
    #[must_use]
    pub fn has_member(&self, kind: PrincipalKind, name: &str) -> bool {
        self.members
            .iter()
            .any(|member| member.kind() == kind && member.name() == name)
    }
}
