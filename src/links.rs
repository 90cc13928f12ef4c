//! Link registry.
//!
//! There is one `links` row per normalized url, shared by everyone who
//! saved it.

use rusqlite::{params, Connection};
use url::Url;

use crate::database::{self, db_method, query_one, Handle};
use crate::models::{Link, LinkId};
use crate::{Error, Result};

/// Canonical form of a user supplied url.
///
/// Anything not starting with an `http:` or `https:` scheme is taken to be
/// scheme relative and gets `http`. The result must have a host.
pub fn normalize(raw : &str) -> Result<String> {
    let invalid = || Error::InvalidUrl(raw.to_string());

    let lower = raw.get(..6).unwrap_or(raw).to_ascii_lowercase();
    let parsed = if lower.starts_with("http:") || lower.starts_with("https:") {
        Url::parse(raw)
    } else if raw.starts_with('/') {
        // "//host" would double up into "http:////host"
        return Err(invalid());
    } else {
        Url::parse(&format!("http://{}", raw))
    };

    let url = parsed.map_err(|_| invalid())?;

    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url.into()),
        _ => Err(invalid()),
    }
}

/// Appends query parameters that arrived separately from `raw`, form
/// encoded.
pub fn append_query(raw : &str, query : &[(String, String)]) -> Result<String> {
    if query.is_empty() {
        return Ok(raw.to_string());
    }

    Ok(format!("{}?{}", raw, serde_urlencoded::to_string(query)?))
}

/// Find-or-insert for an already normalized url. Callers run it inside a
/// transaction.
pub(crate) fn find_or_insert(conn : &Connection, url : &str) -> Result<LinkId> {
    conn.prepare_cached(
        "INSERT INTO links (url) VALUES (?) ON CONFLICT (url) DO NOTHING",
    )?
    .execute(params![url])?;

    let link_id = conn
        .prepare_cached("SELECT id FROM links WHERE url = ?")?
        .query_row(params![url], |row| row.get(0))?;

    Ok(link_id)
}

pub(crate) fn exists(conn : &Connection, link_id : LinkId) -> Result<bool> {
    let found = conn
        .prepare_cached("SELECT 1 FROM links WHERE id = ?")?
        .exists(params![link_id])?;

    Ok(found)
}

impl Handle {
    db_method! {
        /// Id of the link row for `raw`, creating it if nobody saved that
        /// url yet. Invalid urls touch nothing.
        find_or_create_link(&self, conn, raw : &str) -> Result<LinkId> {
            let url = normalize(raw)?;

            let tx = database::immediate(&conn)?;
            let link_id = find_or_insert(&tx, &url)?;
            tx.commit()?;

            tracing::debug!(link_id, %url, "resolved link");

            Ok(link_id)
        }
    }

    db_method! {get_link(&self, conn, link_id : LinkId) -> Result<Link> {
        query_one(
            &conn,
            "SELECT id, url, created_at FROM links WHERE id = ?",
            params![link_id],
        )?
        .ok_or(Error::LinkIdNotFound(link_id))
    }}

    db_method! {get_link_by_url(&self, conn, url : &str) -> Result<Option<Link>> {
        query_one(
            &conn,
            "SELECT id, url, created_at FROM links WHERE url = ?",
            params![url],
        )
    }}
}
