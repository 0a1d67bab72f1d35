//! Identity resolution: cluster lookup → canonical selection → merge →
//! novelty check → view assembly.

use std::collections::HashSet;

use tracing::warn;

use crate::{
  contact::{Contact, ContactId, LinkPrecedence},
  error::ResolveError,
  store::ContactStore,
  view::IdentityView,
};

/// Resolve a submission to its canonical identity, creating or merging
/// contacts as required.
///
/// Empty-string identifiers count as absent: they are never stored,
/// matched, or accepted as the sole identifier.
///
/// The caller is responsible for serialising conflicting submissions
/// (see [`crate::lock::IdentityLock`]); this function assumes it is the
/// only resolution touching the cluster between its first read and its
/// final re-read.
pub async fn identify<S: ContactStore>(
  store: &S,
  email: Option<&str>,
  phone: Option<&str>,
) -> Result<IdentityView, ResolveError<S::Error>> {
  // An empty string must never become a clustering key.
  let email = email.filter(|e| !e.is_empty());
  let phone = phone.filter(|p| !p.is_empty());

  if email.is_none() && phone.is_none() {
    return Err(ResolveError::MissingIdentifiers);
  }

  let cluster = store
    .find_cluster(email, phone)
    .await
    .map_err(ResolveError::Store)?;

  // No existing identity: the submission becomes a fresh primary.
  if cluster.is_empty() {
    let primary = store
      .insert_primary(email, phone)
      .await
      .map_err(ResolveError::Store)?;
    return Ok(IdentityView::assemble(&primary, &[]));
  }

  let canonical = pick_canonical(&cluster).clone();
  merge_into(store, &canonical, &cluster).await?;

  let mut members = vec![canonical.clone()];
  members.extend(
    store
      .find_descendants(canonical.id)
      .await
      .map_err(ResolveError::Store)?,
  );

  if needs_new_contact(&members, email, phone) {
    store
      .insert_secondary(canonical.id, email, phone)
      .await
      .map_err(ResolveError::Store)?;
  }

  // Re-read so the view reflects this resolution's own writes.
  let secondaries = store
    .find_descendants(canonical.id)
    .await
    .map_err(ResolveError::Store)?;
  Ok(IdentityView::assemble(&canonical, &secondaries))
}

// ─── Cluster resolver ────────────────────────────────────────────────────────

/// Choose the canonical primary: the primary member with the smallest
/// (`created_at`, `id`).
///
/// A cluster with no primary member at all breaches the one-primary
/// invariant; rather than fail, fall back to the oldest member and let
/// the anomaly surface in the logs.
///
/// # Panics
///
/// Panics if `cluster` is empty. The orchestration returns before this
/// point when the cluster lookup came back empty.
pub fn pick_canonical(cluster: &[Contact]) -> &Contact {
  cluster
    .iter()
    .filter(|c| c.is_primary())
    .min_by_key(|c| c.age_key())
    .unwrap_or_else(|| {
      warn!("cluster has no primary member; treating oldest as canonical");
      cluster
        .iter()
        .min_by_key(|c| c.age_key())
        .expect("cluster is non-empty")
    })
}

// ─── Merge engine ────────────────────────────────────────────────────────────

/// Collapse every non-canonical primary in the cluster into the
/// canonical one, relinking stray secondaries along the way.
///
/// This is a flattening merge, not a chained relink: a demoted primary
/// may carry direct secondaries that share no identifier with the
/// cluster seed, so the descendant tree of every demoted contact is
/// walked and relinked to the canonical root as well. The whole set is
/// rewritten in one all-or-nothing store write.
///
/// Idempotent: on an already-consistent cluster the demote set is empty
/// and no write is issued.
async fn merge_into<S: ContactStore>(
  store: &S,
  canonical: &Contact,
  cluster: &[Contact],
) -> Result<(), ResolveError<S::Error>> {
  let mut demote = demote_set(canonical.id, cluster);
  if demote.is_empty() {
    return Ok(());
  }

  let mut seen: HashSet<ContactId> = demote.iter().copied().collect();
  seen.insert(canonical.id);

  let mut frontier = demote.clone();
  while let Some(id) = frontier.pop() {
    let children = store
      .find_descendants(id)
      .await
      .map_err(ResolveError::Store)?;
    for child in children {
      if seen.insert(child.id) {
        demote.push(child.id);
        frontier.push(child.id);
      }
    }
  }

  store
    .demote_to_secondary(&demote, canonical.id)
    .await
    .map_err(ResolveError::Store)
}

/// Ids that must be rewritten to `secondary` linked at `canonical_id`:
/// every other primary in the cluster, plus any secondary not already
/// linked directly to the canonical contact. The latter is a
/// secondary-chain breach; it is flattened here instead of leaving a
/// grandchild pointing at a demoted parent.
pub fn demote_set(canonical_id: ContactId, cluster: &[Contact]) -> Vec<ContactId> {
  let mut ids = Vec::new();
  for contact in cluster {
    if contact.id == canonical_id {
      continue;
    }
    match contact.link_precedence {
      LinkPrecedence::Primary => ids.push(contact.id),
      LinkPrecedence::Secondary => {
        if contact.linked_id != Some(canonical_id) {
          warn!(
            contact = contact.id,
            linked = ?contact.linked_id,
            "secondary not linked to canonical primary; relinking"
          );
          ids.push(contact.id);
        }
      }
    }
  }
  ids
}

// ─── Novelty detector ────────────────────────────────────────────────────────

/// A submission is novel when it carries an email the cluster has never
/// seen, or a phone number it has never seen. Only then does a new
/// secondary row get created.
pub fn needs_new_contact(
  members: &[Contact],
  email: Option<&str>,
  phone: Option<&str>,
) -> bool {
  let unseen_email = email
    .is_some_and(|e| !members.iter().any(|c| c.email.as_deref() == Some(e)));
  let unseen_phone = phone
    .is_some_and(|p| !members.iter().any(|c| c.phone_number.as_deref() == Some(p)));
  unseen_email || unseen_phone
}
