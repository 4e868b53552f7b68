//! Diary configuration.

use trustdiary_core::{NewEntry, DEFAULT_ROOM_SALT};
use trustdiary_sync::SyncConfig;

/// Configuration for a [`Diary`](crate::Diary).
#[derive(Debug, Clone)]
pub struct DiaryConfig {
    /// Salt mixed into the service rendezvous id. Readers must use the same.
    pub room_salt: String,
    /// `author` written on every entry this diary appends.
    pub author_name: String,
    /// Sign entries with the diary's identity.
    pub sign_entries: bool,
    /// Appended once when the diary is opened with an empty log.
    pub initial_entry: Option<NewEntry>,
    /// Sync engine configuration.
    pub sync: SyncConfig,
}

impl Default for DiaryConfig {
    fn default() -> Self {
        Self {
            room_salt: DEFAULT_ROOM_SALT.to_string(),
            author_name: "Service".to_string(),
            sign_entries: true,
            initial_entry: None,
            sync: SyncConfig::default(),
        }
    }
}

impl DiaryConfig {
    pub fn with_room_salt(mut self, salt: impl Into<String>) -> Self {
        self.room_salt = salt.into();
        self
    }

    pub fn with_author_name(mut self, name: impl Into<String>) -> Self {
        self.author_name = name.into();
        self
    }

    pub fn with_sign_entries(mut self, sign: bool) -> Self {
        self.sign_entries = sign;
        self
    }

    pub fn with_initial_entry(mut self, entry: NewEntry) -> Self {
        self.initial_entry = Some(entry);
        self
    }

    pub fn with_sync(mut self, sync: SyncConfig) -> Self {
        self.sync = sync;
        self
    }
}
