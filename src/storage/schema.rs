//! DDL and lookup-table seeding. Both are idempotent and run on every open.

use rusqlite::{params, Connection};

use crate::model::{AccountType, Role};

const DDL: &str = r#"
CREATE TABLE IF NOT EXISTS roles (
    id   INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS account_types (
    id   INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS users (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    email         TEXT    NOT NULL UNIQUE,
    password_hash TEXT    NOT NULL,
    first_name    TEXT    NOT NULL,
    last_name     TEXT    NOT NULL,
    username      TEXT    NOT NULL UNIQUE,
    phone_number  TEXT    NOT NULL,
    referrer_id   INTEGER REFERENCES users(id),
    created_at    INTEGER NOT NULL,
    last_login    INTEGER,
    role          INTEGER NOT NULL REFERENCES roles(id),
    is_active     INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS accounts (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id        INTEGER NOT NULL REFERENCES users(id),
    account_number INTEGER NOT NULL UNIQUE,
    balance        INTEGER NOT NULL CHECK (balance >= 0),
    created_at     INTEGER NOT NULL,
    account_type   INTEGER NOT NULL REFERENCES account_types(id),
    is_active      INTEGER NOT NULL DEFAULT 1
);

CREATE INDEX IF NOT EXISTS idx_accounts_user ON accounts(user_id);
"#;

/// Create tables and seed the closed enumerations.
pub fn apply(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(DDL)?;
    seed_lookups(conn)
}

fn seed_lookups(conn: &Connection) -> rusqlite::Result<()> {
    let mut roles = conn.prepare("INSERT OR IGNORE INTO roles (id, name) VALUES (?1, ?2)")?;
    for r in Role::ALL {
        roles.execute(params![r.id(), r.name()])?;
    }
    let mut kinds = conn.prepare("INSERT OR IGNORE INTO account_types (id, name) VALUES (?1, ?2)")?;
    for t in AccountType::ALL {
        kinds.execute(params![t.id(), t.name()])?;
    }
    Ok(())
}
