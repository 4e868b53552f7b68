//! Trust records: administrator-curated authorization of a peer key.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::crypto::{Ed25519PublicKey, X25519PublicKey};
use crate::error::CoreError;
use crate::types::now_millis;

/// A single permission a trusted peer may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Read,
    Write,
    /// Full control. Implies read and write.
    Admin,
}

impl Permission {
    pub fn as_str(self) -> &'static str {
        match self {
            Permission::Read => "read",
            Permission::Write => "write",
            Permission::Admin => "admin",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "read" => Ok(Permission::Read),
            "write" => Ok(Permission::Write),
            "admin" => Ok(Permission::Admin),
            other => Err(CoreError::InvalidPermission(other.to_string())),
        }
    }
}

/// A set of permissions, serialized as a JSON array of names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet(BTreeSet<Permission>);

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The default grant: read only.
    pub fn read_only() -> Self {
        [Permission::Read].into_iter().collect()
    }

    pub fn admin() -> Self {
        [Permission::Admin].into_iter().collect()
    }

    pub fn insert(&mut self, permission: Permission) -> bool {
        self.0.insert(permission)
    }

    pub fn contains(&self, permission: Permission) -> bool {
        self.0.contains(&permission)
    }

    pub fn can_read(&self) -> bool {
        self.contains(Permission::Read) || self.is_admin()
    }

    pub fn can_write(&self) -> bool {
        self.contains(Permission::Write) || self.is_admin()
    }

    pub fn is_admin(&self) -> bool {
        self.contains(Permission::Admin)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Permission> + '_ {
        self.0.iter().copied()
    }

    /// Comma-separated form used by storage backends.
    pub fn to_csv(&self) -> String {
        self.iter().map(Permission::as_str).collect::<Vec<_>>().join(",")
    }

    pub fn from_csv(s: &str) -> Result<Self, CoreError> {
        s.split(',')
            .filter(|part| !part.trim().is_empty())
            .map(Permission::from_str)
            .collect()
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Authorization of one peer signing key.
///
/// The encryption key is bound when the record is created and is not
/// re-verified afterwards. Re-trusting the same signing key overwrites it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustRecord {
    pub sign_public_key: Ed25519PublicKey,
    pub enc_public_key: X25519PublicKey,
    pub display_name: String,
    pub permissions: PermissionSet,
    /// When the record was written (Unix milliseconds).
    pub trusted_at: i64,
}

impl TrustRecord {
    /// Create a record stamped with the current time.
    ///
    /// An empty permission set is replaced by [`PermissionSet::read_only`].
    pub fn new(
        sign_public_key: Ed25519PublicKey,
        enc_public_key: X25519PublicKey,
        display_name: impl Into<String>,
        permissions: PermissionSet,
    ) -> Self {
        let permissions = if permissions.is_empty() {
            PermissionSet::read_only()
        } else {
            permissions
        };

        Self {
            sign_public_key,
            enc_public_key,
            display_name: display_name.into(),
            permissions,
            trusted_at: now_millis(),
        }
    }

    /// The publishable part of this record.
    pub fn roster_entry(&self) -> RosterEntry {
        RosterEntry {
            display_name: self.display_name.clone(),
            sign_public_key: self.sign_public_key,
            permissions: self.permissions.clone(),
        }
    }
}

/// Public view of a trust record: no encryption key, no timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    pub display_name: String,
    pub sign_public_key: Ed25519PublicKey,
    pub permissions: PermissionSet,
}
