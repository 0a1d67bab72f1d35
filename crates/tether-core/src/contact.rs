//! Contact — the sole persisted entity.
//!
//! A contact is one submission of an email and/or phone number. Contacts
//! that transitively share an identifier form a cluster, collapsed to a
//! single primary with the rest linked to it as secondaries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Store-assigned row id. Assignment is monotonic, so ids also encode
/// creation order.
pub type ContactId = i64;

/// Whether a contact is the canonical record for its cluster or has
/// been folded into one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkPrecedence {
  Primary,
  Secondary,
}

/// A stored contact row.
///
/// Invariants, maintained jointly by the resolver and the store:
/// - at least one of `email` / `phone_number` is set;
/// - `Primary` ⇒ `linked_id` is `None`;
/// - `Secondary` ⇒ `linked_id` references a `Primary` (never another
///   secondary);
/// - within a connected cluster, exactly one contact is `Primary` once
///   a resolution completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
  pub id:              ContactId,
  pub email:           Option<String>,
  pub phone_number:    Option<String>,
  pub linked_id:       Option<ContactId>,
  pub link_precedence: LinkPrecedence,
  pub created_at:      DateTime<Utc>,
  pub updated_at:      DateTime<Utc>,
  /// Soft-delete marker. Set rows are invisible to every store query;
  /// nothing in this crate ever sets it.
  pub deleted_at:      Option<DateTime<Utc>>,
}

impl Contact {
  /// Total ordering key for "oldest wins". Two rows can share a
  /// timestamp at limited clock resolution; the id breaks the tie.
  pub fn age_key(&self) -> (DateTime<Utc>, ContactId) {
    (self.created_at, self.id)
  }

  pub fn is_primary(&self) -> bool {
    self.link_precedence == LinkPrecedence::Primary
  }
}
