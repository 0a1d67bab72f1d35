//! The externally visible identity view — a projection over a primary
//! contact and its secondaries.

use std::collections::HashSet;

use serde::Serialize;

use crate::contact::{Contact, ContactId};

/// Wire envelope: `{ "contact": { ... } }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentityView {
  pub contact: ContactSummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactSummary {
  pub primary_contact_id:    ContactId,
  pub emails:                Vec<String>,
  pub phone_numbers:         Vec<String>,
  pub secondary_contact_ids: Vec<ContactId>,
}

impl IdentityView {
  /// Project a primary and its secondaries into the response shape.
  ///
  /// `secondaries` must already be in (`created_at`, `id`) order. The
  /// primary's email and phone lead their lists, absent values are
  /// skipped, and duplicates are dropped keeping the first occurrence.
  pub fn assemble(primary: &Contact, secondaries: &[Contact]) -> Self {
    let emails = dedup_first(
      std::iter::once(primary.email.as_deref())
        .chain(secondaries.iter().map(|c| c.email.as_deref())),
    );
    let phone_numbers = dedup_first(
      std::iter::once(primary.phone_number.as_deref())
        .chain(secondaries.iter().map(|c| c.phone_number.as_deref())),
    );
    let secondary_contact_ids = secondaries.iter().map(|c| c.id).collect();

    Self {
      contact: ContactSummary {
        primary_contact_id: primary.id,
        emails,
        phone_numbers,
        secondary_contact_ids,
      },
    }
  }
}

/// Collect present values in order, keeping only the first occurrence
/// of each duplicate.
fn dedup_first<'a>(values: impl Iterator<Item = Option<&'a str>>) -> Vec<String> {
  let mut seen = HashSet::new();
  let mut out = Vec::new();
  for value in values.flatten() {
    if seen.insert(value) {
      out.push(value.to_owned());
    }
  }
  out
}
