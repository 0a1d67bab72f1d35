//! The `ContactStore` trait — the storage capabilities the resolver
//! depends on.
//!
//! The trait is implemented by storage backends (e.g.
//! `tether-store-sqlite`). The resolver and the HTTP layer depend on
//! this abstraction, not on any concrete backend.

use std::future::Future;

use crate::contact::{Contact, ContactId};

/// Abstraction over a contact storage backend.
///
/// Both query methods order their results by (`created_at`, `id`)
/// ascending and never return soft-deleted rows.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait ContactStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// Return every non-deleted contact transitively reachable from the
  /// contacts matching `email` or `phone`, where two contacts are
  /// connected when they share a non-null email or a non-null phone
  /// number (undirected, fixed-point closure).
  ///
  /// Both arguments absent yields an empty result.
  fn find_cluster<'a>(
    &'a self,
    email: Option<&'a str>,
    phone: Option<&'a str>,
  ) -> impl Future<Output = Result<Vec<Contact>, Self::Error>> + Send + 'a;

  /// Return every non-deleted contact whose `linked_id` is exactly
  /// `primary_id`. One level only; a deeper chain is an invariant
  /// breach the resolver detects and flattens.
  fn find_descendants(
    &self,
    primary_id: ContactId,
  ) -> impl Future<Output = Result<Vec<Contact>, Self::Error>> + Send + '_;

  // ── Writes ────────────────────────────────────────────────────────────

  /// Create a new primary contact (`linked_id = NULL`). The store
  /// assigns the id and both timestamps.
  fn insert_primary<'a>(
    &'a self,
    email: Option<&'a str>,
    phone: Option<&'a str>,
  ) -> impl Future<Output = Result<Contact, Self::Error>> + Send + 'a;

  /// Create a new secondary contact linked to `primary_id`, holding
  /// exactly the submitted values.
  fn insert_secondary<'a>(
    &'a self,
    primary_id: ContactId,
    email: Option<&'a str>,
    phone: Option<&'a str>,
  ) -> impl Future<Output = Result<Contact, Self::Error>> + Send + 'a;

  /// Set every contact in `ids` to secondary precedence, linked to
  /// `new_primary_id`, as a single all-or-nothing write.
  ///
  /// Implementations must skip `new_primary_id` itself if it appears
  /// in `ids` (a primary never links to itself).
  fn demote_to_secondary<'a>(
    &'a self,
    ids: &'a [ContactId],
    new_primary_id: ContactId,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}
