//! [`SqliteStore`] — the SQLite implementation of [`ContactStore`].

use std::{collections::HashSet, path::Path};

use chrono::Utc;
use rusqlite::OptionalExtension as _;

use tether_core::{
  contact::{Contact, ContactId},
  store::ContactStore,
};

use crate::{
  encode::{RawContact, encode_dt},
  schema::SCHEMA,
  Error, Result,
};

/// Column list every contact query selects, in [`RawContact::from_row`]
/// order.
pub(crate) const CONTACT_COLUMNS: &str =
  "id, email, phone_number, linked_id, link_precedence, created_at, updated_at, deleted_at";

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Tether contact store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted. All
/// calls are serialised onto one connection thread, so an individual
/// store operation is never interleaved with another.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Fetch a single contact by id, soft-deleted rows included. Used to
  /// read back freshly inserted rows.
  async fn get_contact(&self, id: ContactId) -> Result<Contact> {
    let raw: Option<RawContact> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {CONTACT_COLUMNS} FROM contacts WHERE id = ?1"),
              rusqlite::params![id],
              RawContact::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.ok_or(Error::ContactNotFound(id))?.decode()
  }

  /// Insert one contact row and read it back with its assigned id.
  async fn insert_contact(
    &self,
    email: Option<String>,
    phone: Option<String>,
    linked_id: Option<ContactId>,
    precedence: &'static str,
  ) -> Result<Contact> {
    let now = encode_dt(Utc::now());

    let id: i64 = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO contacts
             (email, phone_number, linked_id, link_precedence, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
          rusqlite::params![email, phone, linked_id, precedence, now],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    self.get_contact(id).await
  }

  /// Decode raw rows and sort by the age key.
  fn decode_ordered(raws: Vec<RawContact>) -> Result<Vec<Contact>> {
    let mut contacts = raws
      .into_iter()
      .map(RawContact::decode)
      .collect::<Result<Vec<_>>>()?;
    contacts.sort_by_key(|c| c.age_key());
    Ok(contacts)
  }
}

// ─── Trait implementation ────────────────────────────────────────────────────

impl ContactStore for SqliteStore {
  type Error = Error;

  async fn find_cluster(
    &self,
    email: Option<&str>,
    phone: Option<&str>,
  ) -> Result<Vec<Contact>> {
    if email.is_none() && phone.is_none() {
      return Ok(Vec::new());
    }

    let email = email.map(str::to_owned);
    let phone = phone.map(str::to_owned);

    // SQLite would support a recursive CTE here, but an explicit
    // breadth-first expansion keeps the reachability rule in one place
    // and runs inside a single connection call either way.
    let raws = self
      .conn
      .call(move |conn| {
        let mut seen_ids: HashSet<i64> = HashSet::new();
        let mut rows: Vec<RawContact> = Vec::new();

        let mut pending_emails: Vec<String> = email.into_iter().collect();
        let mut pending_phones: Vec<String> = phone.into_iter().collect();
        let mut seen_emails: HashSet<String> =
          pending_emails.iter().cloned().collect();
        let mut seen_phones: HashSet<String> =
          pending_phones.iter().cloned().collect();

        // Fixed point: chase identifiers until none are left. Each
        // round fetches every row matching any not-yet-expanded email
        // or phone; rows contribute their own identifiers to the next
        // round.
        while !pending_emails.is_empty() || !pending_phones.is_empty() {
          let batch_emails = std::mem::take(&mut pending_emails);
          let batch_phones = std::mem::take(&mut pending_phones);

          for raw in fetch_matching(conn, &batch_emails, &batch_phones)? {
            if !seen_ids.insert(raw.id) {
              continue;
            }
            if let Some(e) = raw.email.clone()
              && seen_emails.insert(e.clone())
            {
              pending_emails.push(e);
            }
            if let Some(p) = raw.phone_number.clone()
              && seen_phones.insert(p.clone())
            {
              pending_phones.push(p);
            }
            rows.push(raw);
          }
        }

        Ok(rows)
      })
      .await?;

    Self::decode_ordered(raws)
  }

  async fn find_descendants(&self, primary_id: ContactId) -> Result<Vec<Contact>> {
    let raws = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {CONTACT_COLUMNS} FROM contacts
           WHERE linked_id = ?1 AND deleted_at IS NULL
           ORDER BY created_at ASC, id ASC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![primary_id], RawContact::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Self::decode_ordered(raws)
  }

  async fn insert_primary(
    &self,
    email: Option<&str>,
    phone: Option<&str>,
  ) -> Result<Contact> {
    self
      .insert_contact(
        email.map(str::to_owned),
        phone.map(str::to_owned),
        None,
        "primary",
      )
      .await
  }

  async fn insert_secondary(
    &self,
    primary_id: ContactId,
    email: Option<&str>,
    phone: Option<&str>,
  ) -> Result<Contact> {
    self
      .insert_contact(
        email.map(str::to_owned),
        phone.map(str::to_owned),
        Some(primary_id),
        "secondary",
      )
      .await
  }

  async fn demote_to_secondary(
    &self,
    ids: &[ContactId],
    new_primary_id: ContactId,
  ) -> Result<()> {
    let ids: Vec<ContactId> = ids
      .iter()
      .copied()
      .filter(|&id| id != new_primary_id)
      .collect();
    if ids.is_empty() {
      return Ok(());
    }

    self
      .conn
      .call(move |conn| {
        // One transaction: either every demotion lands or none do.
        let tx = conn.transaction()?;
        {
          let marks = placeholders(2, ids.len());
          let sql = format!(
            "UPDATE contacts
             SET link_precedence = 'secondary', linked_id = ?1
             WHERE id IN ({marks}) AND deleted_at IS NULL"
          );
          let mut params: Vec<&dyn rusqlite::ToSql> = vec![&new_primary_id];
          params.extend(ids.iter().map(|id| id as &dyn rusqlite::ToSql));
          tx.execute(&sql, params.as_slice())?;
        }
        tx.commit()?;
        Ok(())
      })
      .await?;

    Ok(())
  }
}

// ─── Query helpers ───────────────────────────────────────────────────────────

/// One expansion round of the cluster search: every non-deleted row
/// whose email or phone is in the given batches.
fn fetch_matching(
  conn: &rusqlite::Connection,
  emails: &[String],
  phones: &[String],
) -> rusqlite::Result<Vec<RawContact>> {
  if emails.is_empty() && phones.is_empty() {
    return Ok(Vec::new());
  }

  let mut conditions: Vec<String> = Vec::with_capacity(2);
  let mut params: Vec<&dyn rusqlite::ToSql> = Vec::new();

  if !emails.is_empty() {
    let marks = placeholders(params.len() + 1, emails.len());
    conditions.push(format!("email IN ({marks})"));
    params.extend(emails.iter().map(|e| e as &dyn rusqlite::ToSql));
  }
  if !phones.is_empty() {
    let marks = placeholders(params.len() + 1, phones.len());
    conditions.push(format!("phone_number IN ({marks})"));
    params.extend(phones.iter().map(|p| p as &dyn rusqlite::ToSql));
  }

  let sql = format!(
    "SELECT {CONTACT_COLUMNS} FROM contacts
     WHERE deleted_at IS NULL AND ({})",
    conditions.join(" OR ")
  );

  let mut stmt = conn.prepare(&sql)?;
  let rows = stmt.query_map(params.as_slice(), RawContact::from_row)?;
  rows.collect()
}

/// `?start, ?start+1, …` — numbered placeholders for a dynamic IN list.
fn placeholders(start: usize, count: usize) -> String {
  (start..start + count)
    .map(|i| format!("?{i}"))
    .collect::<Vec<_>>()
    .join(", ")
}
