//! `SqliteStore`: the pooled SQLite implementation of `StorageGateway`.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row, TransactionBehavior};

use super::{schema, StorageGateway, StoreError, StoreResult, UniqueField, UserUpdate};
use crate::model::{Account, AccountType, NewAccount, NewUser, Role, User};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const USER_COLUMNS: &str = "id, email, password_hash, first_name, last_name, username, phone_number, \
     referrer_id, created_at, last_login, role, is_active";
const ACCOUNT_COLUMNS: &str = "id, user_id, account_number, balance, created_at, account_type, is_active";

/// SQLite-backed `StorageGateway` over an r2d2 connection pool.
#[derive(Clone)]
pub struct SqliteStore {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteStore {
    /// Open (or create) the database at `path`, apply the schema and seed lookup tables.
    pub fn open(path: &Path, pool_size: u32) -> StoreResult<Self> {
        let manager = SqliteConnectionManager::file(path).with_init(|c| {
            c.busy_timeout(BUSY_TIMEOUT)?;
            c.query_row("PRAGMA journal_mode = WAL", [], |row| row.get::<_, String>(0))?;
            c.execute_batch("PRAGMA synchronous = NORMAL; PRAGMA foreign_keys = ON;")
        });
        let pool = Pool::builder().max_size(pool_size).build(manager)?;
        let store = Self { pool };
        schema::apply(&*store.conn()?)?;
        tracing::info!(target: "teller::storage", "opened {} (pool size {})", path.display(), pool_size);
        Ok(store)
    }

    pub(crate) fn conn(&self) -> StoreResult<PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }
}

fn millis(ts: DateTime<Utc>) -> i64 { ts.timestamp_millis() }

fn timestamp(col: usize, ms: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms).ok_or(rusqlite::Error::IntegralValueOutOfRange(col, ms))
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    let role_id: i64 = row.get(10)?;
    let role = Role::from_id(role_id).ok_or(rusqlite::Error::IntegralValueOutOfRange(10, role_id))?;
    let last_login = match row.get::<_, Option<i64>>(9)? {
        Some(ms) => Some(timestamp(9, ms)?),
        None => None,
    };
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        password_hash: row.get(2)?,
        first_name: row.get(3)?,
        last_name: row.get(4)?,
        username: row.get(5)?,
        phone_number: row.get(6)?,
        referrer_id: row.get(7)?,
        created_at: timestamp(8, row.get(8)?)?,
        last_login,
        role,
        is_active: row.get(11)?,
    })
}

fn account_from_row(row: &Row<'_>) -> rusqlite::Result<Account> {
    let type_id: i64 = row.get(5)?;
    let account_type = AccountType::from_id(type_id).ok_or(rusqlite::Error::IntegralValueOutOfRange(5, type_id))?;
    Ok(Account {
        id: row.get(0)?,
        user_id: row.get(1)?,
        account_number: row.get(2)?,
        balance: row.get(3)?,
        created_at: timestamp(4, row.get(4)?)?,
        account_type,
        is_active: row.get(6)?,
    })
}

/// Name the constraint a failed write ran into, if any.
fn constraint_violation(err: &rusqlite::Error) -> Option<StoreError> {
    let rusqlite::Error::SqliteFailure(e, msg) = err else { return None };
    if e.code != ErrorCode::ConstraintViolation {
        return None;
    }
    if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY {
        return Some(StoreError::UnknownReferrer);
    }
    let msg = msg.as_deref().unwrap_or("");
    if msg.contains("users.email") {
        Some(StoreError::Conflict(UniqueField::Email))
    } else if msg.contains("users.username") {
        Some(StoreError::Conflict(UniqueField::Username))
    } else if msg.contains("accounts.account_number") {
        Some(StoreError::Conflict(UniqueField::AccountNumber))
    } else {
        None
    }
}

fn classify(err: rusqlite::Error) -> StoreError {
    if let Some(mapped) = constraint_violation(&err) {
        return mapped;
    }
    match err {
        rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
        rusqlite::Error::IntegralValueOutOfRange(col, v) => StoreError::Corrupt(format!("column {col} holds {v}")),
        other => StoreError::Sqlite(other),
    }
}

fn fetch_user(conn: &Connection, filter: &str, key: &dyn rusqlite::ToSql) -> StoreResult<User> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {filter}");
    conn.query_row(&sql, [key], user_from_row).map_err(classify)
}

fn fetch_account(conn: &Connection, filter: &str, key: i64) -> StoreResult<Account> {
    let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE {filter}");
    conn.query_row(&sql, [key], account_from_row).map_err(classify)
}

impl StorageGateway for SqliteStore {
    fn create_user_and_account(&self, user: &NewUser, account: Option<&NewAccount>) -> StoreResult<(User, Option<Account>)> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO users (email, password_hash, first_name, last_name, username, phone_number,
                                referrer_id, created_at, last_login, role, is_active)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, NULL, ?9, ?10)",
            params![
                user.email,
                user.password_hash,
                user.first_name,
                user.last_name,
                user.username,
                user.phone_number,
                user.referrer_id,
                millis(user.created_at),
                user.role.id(),
                user.is_active,
            ],
        )
        .map_err(classify)?;
        let user_id = tx.last_insert_rowid();

        let account_id = match account {
            Some(a) => {
                tx.execute(
                    "INSERT INTO accounts (user_id, account_number, balance, created_at, account_type, is_active)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![user_id, a.account_number, a.balance, millis(a.created_at), a.account_type.id(), a.is_active],
                )
                .map_err(classify)?;
                Some(tx.last_insert_rowid())
            }
            None => None,
        };

        let created = fetch_user(&tx, "id = ?1", &user_id)?;
        let created_account = match account_id {
            Some(id) => Some(fetch_account(&tx, "id = ?1", id)?),
            None => None,
        };
        tx.commit()?;
        tracing::debug!(target: "teller::storage", "inserted user {} (account: {:?})", user_id, account_id);
        Ok((created, created_account))
    }

    fn get_by_id(&self, id: i64) -> StoreResult<User> {
        fetch_user(&*self.conn()?, "id = ?1 AND is_active = 1", &id)
    }

    fn get_by_email(&self, email: &str) -> StoreResult<User> {
        fetch_user(&*self.conn()?, "email = ?1 AND is_active = 1", &email)
    }

    fn get_by_username(&self, username: &str) -> StoreResult<User> {
        fetch_user(&*self.conn()?, "username = ?1 AND is_active = 1", &username)
    }

    fn update_user(&self, id: i64, update: &UserUpdate) -> StoreResult<User> {
        if update.is_empty() {
            return Err(StoreError::EmptyUpdate);
        }
        let (sql, mut values) = update.to_sql();
        values.push(rusqlite::types::Value::Integer(id));
        let conn = self.conn()?;
        let changed = conn.execute(&sql, rusqlite::params_from_iter(values)).map_err(classify)?;
        if changed == 0 {
            return Err(StoreError::NotFound);
        }
        fetch_user(&conn, "id = ?1", &id)
    }

    fn deactivate(&self, user_id: i64) -> StoreResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let changed = tx.execute("UPDATE users SET is_active = 0 WHERE id = ?1 AND is_active = 1", [user_id])?;
        if changed == 0 {
            return Err(StoreError::NotFound);
        }
        let accounts = tx.execute("UPDATE accounts SET is_active = 0 WHERE user_id = ?1", [user_id])?;
        tx.commit()?;
        tracing::info!(target: "teller::storage", "deactivated user {} and {} account(s)", user_id, accounts);
        Ok(())
    }

    fn record_login(&self, user_id: i64, at: DateTime<Utc>) -> StoreResult<()> {
        let changed = self
            .conn()?
            .execute("UPDATE users SET last_login = ?1 WHERE id = ?2 AND is_active = 1", params![millis(at), user_id])?;
        if changed == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    fn audit_user(&self, id: i64) -> StoreResult<User> {
        fetch_user(&*self.conn()?, "id = ?1", &id)
    }

    fn list_accounts(&self) -> StoreResult<Vec<Account>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE is_active = 1 ORDER BY id"))?;
        let rows = stmt.query_map([], account_from_row)?;
        rows.map(|r| r.map_err(classify)).collect()
    }

    fn get_account_by_id(&self, id: i64) -> StoreResult<Account> {
        fetch_account(&*self.conn()?, "id = ?1 AND is_active = 1", id)
    }

    fn get_account_for_user(&self, user_id: i64) -> StoreResult<Account> {
        let conn = self.conn()?;
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE user_id = ?1 AND is_active = 1 ORDER BY id LIMIT 1");
        conn.query_row(&sql, [user_id], account_from_row)
            .optional()
            .map_err(classify)?
            .ok_or(StoreError::NotFound)
    }
}
