//! SQL schema for the Tether SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE ... IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS contacts (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    email           TEXT,
    phone_number    TEXT,
    linked_id       INTEGER REFERENCES contacts(id),
    link_precedence TEXT NOT NULL CHECK (link_precedence IN ('primary', 'secondary')),
    created_at      TEXT NOT NULL,   -- RFC 3339 UTC, fixed-width; lexicographic order is chronological
    updated_at      TEXT NOT NULL,
    deleted_at      TEXT,            -- soft delete; set rows are invisible to all queries
    CHECK (email IS NOT NULL OR phone_number IS NOT NULL)
);

CREATE INDEX IF NOT EXISTS contacts_email_idx      ON contacts(email)        WHERE email IS NOT NULL;
CREATE INDEX IF NOT EXISTS contacts_phone_idx      ON contacts(phone_number) WHERE phone_number IS NOT NULL;
CREATE INDEX IF NOT EXISTS contacts_linked_idx     ON contacts(linked_id);
CREATE INDEX IF NOT EXISTS contacts_precedence_idx ON contacts(link_precedence);

-- Refresh updated_at on every mutation. Observability only; the
-- resolver never orders by it. strftime's %f carries milliseconds, so
-- the literal 000 pads to the same microsecond width the Rust encoder
-- writes, keeping every timestamp column fixed-width.
CREATE TRIGGER IF NOT EXISTS contacts_touch_updated_at
AFTER UPDATE ON contacts
FOR EACH ROW
WHEN NEW.updated_at = OLD.updated_at
BEGIN
  UPDATE contacts
  SET updated_at = strftime('%Y-%m-%dT%H:%M:%f000+00:00', 'now')
  WHERE id = NEW.id;
END;

PRAGMA user_version = 1;
";
