// ABOUTME: Identity-set matching shared by every approver-matching site
// ABOUTME: A match on any of internal id, email, or external object id suffices

use serde::{Deserialize, Serialize};

/// One identity as the system knows it: internal user id, email address,
/// and external directory object id. Callers must never require all three
/// channels; any single agreeing channel is a match.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
    pub email: Option<String>,
    #[serde(rename = "objectId")]
    pub object_id: Option<String>,
}

impl Identity {
    pub fn from_email(email: impl Into<String>) -> Self {
        Identity {
            user_id: None,
            email: Some(email.into()),
            object_id: None,
        }
    }

    pub fn from_user_id(user_id: impl Into<String>) -> Self {
        Identity {
            user_id: Some(user_id.into()),
            email: None,
            object_id: None,
        }
    }

    /// True when no channel is populated.
    pub fn is_empty(&self) -> bool {
        non_blank(&self.user_id).is_none()
            && non_blank(&self.email).is_none()
            && non_blank(&self.object_id).is_none()
    }

    /// True when `self` and `other` agree on any populated channel.
    /// Email comparison is case-insensitive; blank values never match.
    pub fn matches(&self, other: &Identity) -> bool {
        if let (Some(a), Some(b)) = (non_blank(&self.user_id), non_blank(&other.user_id)) {
            if a == b {
                return true;
            }
        }
        if let (Some(a), Some(b)) = (non_blank(&self.email), non_blank(&other.email)) {
            if a.eq_ignore_ascii_case(b) {
                return true;
            }
        }
        if let (Some(a), Some(b)) = (non_blank(&self.object_id), non_blank(&other.object_id)) {
            if a == b {
                return true;
            }
        }
        false
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

/// The acting user behind a call: the identity triple plus a display name
/// used for audit entries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Principal {
    #[serde(flatten)]
    pub identity: Identity,
    pub name: Option<String>,
}

impl Principal {
    pub fn display_label(&self) -> String {
        self.name
            .clone()
            .or_else(|| self.identity.email.clone())
            .or_else(|| self.identity.user_id.clone())
            .unwrap_or_else(|| "unknown".to_string())
    }
}
