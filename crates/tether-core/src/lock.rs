//! Per-identity serialisation of resolutions.
//!
//! Two concurrent submissions touching the same cluster must not
//! interleave between the cluster read and the final re-read. If they
//! do, both can decide the same email is novel (duplicate secondaries)
//! or both can demote the same primary. The resolver therefore holds a
//! mutex per submitted identifier for the whole
//! read-merge-write-read sequence.

use std::{
  collections::HashMap,
  sync::{Arc, Mutex as StdMutex, PoisonError},
};

use tokio::sync::{Mutex, OwnedMutexGuard};

/// A set of named async mutexes, created on first use.
///
/// Keys are the submitted identifiers, namespaced so an email can never
/// collide with a phone number. Guards are acquired in sorted key order
/// so two submissions carrying the same pair of identifiers cannot
/// deadlock against each other.
///
/// Entries are never reclaimed; the map grows with the set of distinct
/// identifiers seen by the process.
#[derive(Debug, Default)]
pub struct IdentityLock {
  slots: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl IdentityLock {
  pub fn new() -> Self {
    Self::default()
  }

  /// Acquire the locks guarding `email` and `phone` for the duration
  /// of one resolution. Dropping the returned guards releases them.
  pub async fn acquire(
    &self,
    email: Option<&str>,
    phone: Option<&str>,
  ) -> Vec<OwnedMutexGuard<()>> {
    let mut keys: Vec<String> = Vec::with_capacity(2);
    if let Some(email) = email {
      keys.push(format!("email:{email}"));
    }
    if let Some(phone) = phone {
      keys.push(format!("phone:{phone}"));
    }
    keys.sort();

    let mut guards = Vec::with_capacity(keys.len());
    for key in keys {
      let slot = {
        let mut slots = self
          .slots
          .lock()
          .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(key).or_default())
      };
      guards.push(slot.lock_owned().await);
    }
    guards
  }
}
