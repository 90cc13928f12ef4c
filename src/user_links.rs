//! Which user saved which link.
//!
//! Links are reference counted by their associations. Removing the last
//! association deletes the link in the same transaction, with a
//! conditional delete that re-checks for associations at delete time.

use rusqlite::{params, Connection};

use crate::database::{self, db_method, query_all, Handle};
use crate::models::{LinkId, SavedLink, Time, UserId};
use crate::{links, Error, Result};

/// Outcome of removing several links at once. Each id is removed on its
/// own; one failing does not stop the rest.
#[derive(Debug, Default)]
pub struct BatchRemoval {
    pub removed : Vec<LinkId>,
    pub failed :  Vec<(LinkId, Error)>,
}

fn save(conn : &Connection, link_id : LinkId, user_id : UserId) -> Result<Time> {
    conn.prepare_cached(
        "INSERT INTO user_links (user_id, link_id) VALUES (?, ?)
         ON CONFLICT (user_id, link_id) DO NOTHING",
    )?
    .execute(params![user_id, link_id])
    .map_err(|err| -> Error {
        if !database::is_foreign_key_violation(&err) {
            return err.into();
        }

        match links::exists(conn, link_id) {
            Ok(false) => Error::LinkIdNotFound(link_id),
            Ok(true) => Error::UserIdNotFound(user_id),
            Err(err) => err,
        }
    })?;

    let saved_at = conn
        .prepare_cached(
            "SELECT created_at FROM user_links WHERE user_id = ? AND link_id = ?",
        )?
        .query_row(params![user_id, link_id], |row| row.get(0))?;

    Ok(saved_at)
}

/// Drops the association and then the link itself if nobody else holds
/// it. Returns whether the link row went away.
fn remove(conn : &Connection, link_id : LinkId, user_id : UserId) -> Result<bool> {
    let tx = database::immediate(conn)?;

    tx.prepare_cached("DELETE FROM user_links WHERE user_id = ? AND link_id = ?")?
        .execute(params![user_id, link_id])?;

    let orphaned = tx
        .prepare_cached(
            "DELETE FROM links WHERE id = ?1
             AND NOT EXISTS (SELECT 1 FROM user_links WHERE link_id = ?1)",
        )?
        .execute(params![link_id])?;

    tx.commit()?;

    Ok(orphaned > 0)
}

impl Handle {
    db_method! {
        /// Adds the link to the user's list. Saving twice keeps the first
        /// timestamp.
        save_link(&self, conn, link_id : LinkId, user_id : UserId) -> Result<Time> {
            let tx = database::immediate(&conn)?;
            let saved_at = save(&tx, link_id, user_id)?;
            tx.commit()?;

            Ok(saved_at)
        }
    }

    db_method! {
        /// Find-or-create plus save under one write lock, so the link can't
        /// be garbage collected in between.
        save_url(
            &self,
            conn,
            user_id : UserId,
            raw : &str
        ) -> Result<(LinkId, Time)> {
            let url = links::normalize(raw)?;

            let tx = database::immediate(&conn)?;
            let link_id = links::find_or_insert(&tx, &url)?;
            let saved_at = save(&tx, link_id, user_id)?;
            tx.commit()?;

            tracing::debug!(user_id, link_id, "saved link");

            Ok((link_id, saved_at))
        }
    }

    db_method! {
        /// The user's links, most recently saved first.
        list_links(&self, conn, user_id : UserId) -> Result<Vec<SavedLink>> {
            query_all(
                &conn,
                "SELECT l.id, l.url, ul.created_at AS saved_at
                 FROM user_links ul JOIN links l ON l.id = ul.link_id
                 WHERE ul.user_id = ?
                 ORDER BY ul.created_at DESC, ul.rowid DESC",
                params![user_id],
            )
        }
    }

    db_method! {remove_link(
        &self,
        conn,
        link_id : LinkId,
        user_id : UserId
    ) -> Result<()> {
        if remove(&conn, link_id, user_id)? {
            tracing::debug!(link_id, "deleted orphaned link");
        }
        Ok(())
    }}

    db_method! {remove_links(
        &self,
        conn,
        link_ids : &[LinkId],
        user_id : UserId
    ) -> BatchRemoval {
        let mut out = BatchRemoval::default();

        for &link_id in link_ids {
            match remove(&conn, link_id, user_id) {
                Ok(_) => out.removed.push(link_id),
                Err(err) => {
                    tracing::warn!(link_id, user_id, ?err, "failed to remove link");
                    out.failed.push((link_id, err));
                },
            }
        }

        out
    }}
}
