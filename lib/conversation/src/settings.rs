//! Sheet layout and access rules.

use serde::Deserialize;

/// Status value that grants access.
pub const DEFAULT_ALLOWED_STATUS: &str = "مسموح";

/// Where the verification columns live and which status grants access.
///
/// Columns are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VerificationSettings {
    #[serde(default = "default_id_column")]
    pub id_column: u32,
    #[serde(default = "default_phone_column")]
    pub phone_column: u32,
    #[serde(default = "default_status_column")]
    pub status_column: u32,
    /// Compared after trimming and lowercasing both sides.
    #[serde(default = "default_allowed_status")]
    pub allowed_status: String,
}

fn default_id_column() -> u32 {
    1
}

fn default_phone_column() -> u32 {
    2
}

fn default_status_column() -> u32 {
    3
}

fn default_allowed_status() -> String {
    DEFAULT_ALLOWED_STATUS.to_string()
}

impl Default for VerificationSettings {
    fn default() -> Self {
        Self {
            id_column: default_id_column(),
            phone_column: default_phone_column(),
            status_column: default_status_column(),
            allowed_status: default_allowed_status(),
        }
    }
}

impl VerificationSettings {
    /// Checks a stored status against the allowed value.
    #[must_use]
    pub fn is_allowed(&self, status: &str) -> bool {
        status.trim().to_lowercase() == self.allowed_status.trim().to_lowercase()
    }
}
