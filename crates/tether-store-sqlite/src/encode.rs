//! Row-level encoding between SQLite and `tether-core` types.

use chrono::{DateTime, SecondsFormat, Utc};
use tether_core::contact::{Contact, LinkPrecedence};

use crate::{Error, Result};

/// Timestamps are stored as fixed-width RFC 3339 UTC text (microsecond
/// precision, `+00:00` offset) so SQL `ORDER BY` on the text column is
/// chronological.
pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, false)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

/// Column-for-column image of a `contacts` row, before decoding.
#[derive(Debug)]
pub struct RawContact {
  pub id:              i64,
  pub email:           Option<String>,
  pub phone_number:    Option<String>,
  pub linked_id:       Option<i64>,
  pub link_precedence: String,
  pub created_at:      String,
  pub updated_at:      String,
  pub deleted_at:      Option<String>,
}

impl RawContact {
  /// Read from a row selected with the `CONTACT_COLUMNS` column list.
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:              row.get(0)?,
      email:           row.get(1)?,
      phone_number:    row.get(2)?,
      linked_id:       row.get(3)?,
      link_precedence: row.get(4)?,
      created_at:      row.get(5)?,
      updated_at:      row.get(6)?,
      deleted_at:      row.get(7)?,
    })
  }

  pub fn decode(self) -> Result<Contact> {
    let link_precedence = match self.link_precedence.as_str() {
      "primary" => LinkPrecedence::Primary,
      "secondary" => LinkPrecedence::Secondary,
      other => return Err(Error::UnknownPrecedence(other.to_owned())),
    };

    Ok(Contact {
      id: self.id,
      email: self.email,
      phone_number: self.phone_number,
      linked_id: self.linked_id,
      link_precedence,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
      deleted_at: self.deleted_at.as_deref().map(decode_dt).transpose()?,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn dt_round_trips() {
    let now = Utc::now();
    let decoded = decode_dt(&encode_dt(now)).unwrap();
    // Storage truncates to microseconds.
    assert_eq!(decoded.timestamp_micros(), now.timestamp_micros());
  }

  #[test]
  fn encoded_dts_are_fixed_width() {
    let a = encode_dt(decode_dt("2024-01-01T00:00:00+00:00").unwrap());
    let b = encode_dt(decode_dt("2024-01-01T00:00:00.5+00:00").unwrap());
    assert_eq!(a.len(), b.len());
    assert!(a < b);
  }

  #[test]
  fn trigger_written_timestamps_match_the_encoder_shape() {
    // Shape produced by strftime('%Y-%m-%dT%H:%M:%f000+00:00', 'now').
    let trigger_shape = "2024-06-01T12:30:45.123000+00:00";
    let decoded = decode_dt(trigger_shape).unwrap();
    assert_eq!(encode_dt(decoded), trigger_shape);
  }
}
