use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ValueRef};
use rusqlite::{ffi, Connection, Params, Transaction, TransactionBehavior};
use tokio::sync::Mutex;

use crate::time_utils::TIME_FORMAT;
use crate::{models, Result};

const SCHEMA : &str = include_str!("schema.sql");

/// How long a connection waits on another writer before giving up.
const BUSY_TIMEOUT : Duration = Duration::from_secs(5);

const SQLITE_CONSTRAINT_FOREIGNKEY : i64 = 787;
const SQLITE_CONSTRAINT_UNIQUE : i64 = 2067;

fn error_code_match(
    err : &rusqlite::Error,
    code : ffi::ErrorCode,
    ext : i64,
) -> bool {
    matches!(
            err,
            rusqlite::Error::SqliteFailure(e, _)
                if e.code == code
                && i64::from(e.extended_code) == ext)
}

pub(crate) fn is_unique_violation(err : &rusqlite::Error) -> bool {
    error_code_match(
        err,
        ffi::ErrorCode::ConstraintViolation,
        SQLITE_CONSTRAINT_UNIQUE,
    )
}

pub(crate) fn is_foreign_key_violation(err : &rusqlite::Error) -> bool {
    error_code_match(
        err,
        ffi::ErrorCode::ConstraintViolation,
        SQLITE_CONSTRAINT_FOREIGNKEY,
    )
}

/// Async wrapper around a blocking body that runs against the handle's
/// connection. Needs the multi-threaded runtime.
macro_rules! db_method {
        ($(#[$meta:meta])* $name:ident (
            &$self:ident,
            $conn:ident
            $(, $pname:ident : $ptype:ty)*
        ) -> $ret:ty $body:block ) => {
            $(#[$meta])*
            pub async fn $name (&$self, $( $pname : $ptype, )* ) -> $ret {
                let $conn = $self.conn.lock().await;
                tokio::task::block_in_place(|| $body)
            }
        }
    }

pub(crate) use db_method;

/// The store on disk. Cheap to clone; every request asks it for its own
/// [`Handle`].
#[derive(Debug, Clone)]
pub struct Db {
    path : PathBuf,
}

impl Db {
    /// Opens the database at `p`, creating the schema if it is missing.
    pub fn open<P : AsRef<Path>>(p : P) -> Result<Self> {
        let db = Self {
            path : p.as_ref().to_owned(),
        };

        let conn = db.connect()?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
        conn.execute_batch(SCHEMA)?;

        tracing::debug!(path = %db.path.display(), "database ready");

        Ok(db)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Opens a fresh connection scoped to one unit of work.
    pub fn handle(&self) -> Result<Handle> {
        Ok(Handle {
            conn : Mutex::new(self.connect()?),
        })
    }

    fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&self.path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        Ok(conn)
    }
}

/// A single connection. The operations of the credential store, token
/// manager, link registry and user-link association are all methods on it.
pub struct Handle {
    pub(crate) conn : Mutex<Connection>,
}

/// Starts a write transaction that takes the database lock up front, so a
/// read inside it can't go stale before the write lands.
pub(crate) fn immediate(conn : &Connection) -> rusqlite::Result<Transaction<'_>> {
    Transaction::new_unchecked(conn, TransactionBehavior::Immediate)
}

pub(crate) fn query_one<T : FromRow, P : Params>(
    conn : &Connection,
    sql : &str,
    params : P,
) -> Result<Option<T>> {
    let mut stmt = conn.prepare_cached(sql)?;
    let mut rows = stmt.query(params)?;

    let found = match rows.next()? {
        Some(row) => Some(row_parse(row)?),
        None => None,
    };

    Ok(found)
}

pub(crate) fn query_all<T : FromRow, P : Params>(
    conn : &Connection,
    sql : &str,
    params : P,
) -> Result<Vec<T>> {
    let mut stmt = conn.prepare_cached(sql)?;
    let mut rows = stmt.query(params)?;

    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        out.push(row_parse(row)?);
    }

    Ok(out)
}

pub(crate) struct Row<'a> {
    off :   usize,
    inner : &'a rusqlite::Row<'a>,
    cols :  Vec<&'a str>,
}

impl<'a> From<&'a rusqlite::Row<'a>> for Row<'a> {
    fn from(r : &'a rusqlite::Row<'a>) -> Row<'a> {
        Row {
            off :   0,
            cols :  r.as_ref().column_names(),
            inner : r,
        }
    }
}

pub(crate) fn row_parse<'a, T : FromRow>(row : &'a rusqlite::Row<'a>) -> Result<T> {
    T::from_row(&mut row.into())
}

impl<'a> Row<'a> {
    /// Reads the first column called `name` at or after the current offset.
    fn get<T : FromSql>(&self, name : &str) -> rusqlite::Result<T> {
        let idx = self
            .cols
            .get(self.off..)
            .and_then(|cols| cols.iter().position(|col| *col == name))
            .ok_or_else(|| rusqlite::Error::InvalidColumnName(name.to_string()))?;

        self.inner.get(idx + self.off)
    }

    fn advance(&mut self, n : usize) {
        self.off += n;
    }
}

pub(crate) trait FromRow: Sized {
    fn column_count() -> usize;
    fn from_row(row : &mut Row) -> Result<Self>;
}

impl<T, U> FromRow for (T, U)
where
    T : FromRow,
    U : FromRow,
{
    fn column_count() -> usize {
        T::column_count() + U::column_count()
    }

    fn from_row(row : &mut Row) -> Result<Self> {
        let t = T::from_row(row)?;
        row.advance(T::column_count());
        let u = U::from_row(row)?;

        Ok((t, u))
    }
}

macro_rules! impl_from_row {
        ($ty:ty { $($field:ident),* }) => {

            impl FromRow for $ty {
                fn column_count() -> usize {
                    const N : usize = [
                        $(
                            stringify!($field),
                        )*
                    ].len();

                    N
                }

                fn from_row(row : &mut Row) -> Result<$ty> {
                    Ok(Self{
                    $(
                        $field : row.get(stringify!($field))?,
                    )*
                    })
                }
            }
        }
    }

impl_from_row! {models::User {
    id, email, password_hash, created_at
}}

impl_from_row! {models::Login {
    token, user_id, created_at, active_at
}}

impl_from_row! {models::Link {
    id, url, created_at
}}

impl_from_row! {models::SavedLink {
    id, url, saved_at
}}

impl FromSql for models::Time {
    fn column_result(value : ValueRef) -> FromSqlResult<models::Time> {
        let s : String = String::column_result(value)?;

        let dt = time::PrimitiveDateTime::parse(&s, TIME_FORMAT)
            .map_err(|err| FromSqlError::Other(Box::new(err)))?;

        Ok(dt.assume_offset(time::UtcOffset::UTC).into())
    }
}
