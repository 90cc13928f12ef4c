//! Login tokens.
//!
//! A token is a bearer credential: whoever presents it is the user it was
//! issued to, until it is revoked. Tokens never expire on their own.

use rusqlite::params;

use crate::database::{self, db_method, query_one, Handle};
use crate::models::{Login, User, UserId};
use crate::{crypto, Error, Result};

impl Handle {
    db_method! {issue_token(&self, conn, user_id : UserId) -> Result<String> {
        let token = crypto::generate_token();

        conn
            .prepare_cached("INSERT INTO logins (token, user_id) VALUES (?, ?)")?
            .execute(params![token, user_id])
            .map_err(|err| {
                if database::is_foreign_key_violation(&err) {
                    Error::UserIdNotFound(user_id)
                } else {
                    err.into()
                }
            })?;

        tracing::debug!(user_id, "issued login token");

        Ok(token)
    }}

    db_method! {
        /// The user behind `token`, or `None` if no such login exists.
        resolve_token(
            &self,
            conn,
            token : &str
        ) -> Result<Option<(User, Login)>> {
            query_one(
                &conn,
                "SELECT u.id, u.email, u.password_hash, u.created_at,
                        l.token, l.user_id, l.created_at, l.active_at
                 FROM logins l JOIN users u ON u.id = l.user_id
                 WHERE l.token = ?
                 LIMIT 1",
                params![token],
            )
        }
    }

    db_method! {touch_token(&self, conn, token : &str) -> Result<()> {
        conn
            .prepare_cached(
                "UPDATE logins SET active_at = datetime('now') WHERE token = ?"
            )?
            .execute(params![token])?;
        Ok(())
    }}

    db_method! {
        /// Signs the login out. Unknown tokens are fine.
        revoke_token(&self, conn, token : &str) -> Result<()> {
            let n = conn
                .prepare_cached("DELETE FROM logins WHERE token = ?")?
                .execute(params![token])?;

            if n > 0 {
                tracing::debug!("revoked login token");
            }

            Ok(())
        }
    }

    db_method! {
        /// Signs the user out everywhere, returning how many logins ended.
        revoke_user_tokens(&self, conn, user_id : UserId) -> Result<usize> {
            let n = conn
                .prepare_cached("DELETE FROM logins WHERE user_id = ?")?
                .execute(params![user_id])?;

            tracing::info!(user_id, revoked = n, "revoked all login tokens");

            Ok(n)
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::database::testing::temp_db;
    use crate::Error;

    #[tokio::test(flavor = "multi_thread")]
    async fn issue_and_resolve() {
        let (_dir, db) = temp_db();
        let h = db.handle().unwrap();

        let id = h.create_user("a@b.com", "hash").await.unwrap();
        let token = h.issue_token(id).await.unwrap();

        let (user, login) = h.resolve_token(&token).await.unwrap().unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.email, "a@b.com");
        assert_eq!(login.user_id, id);
        assert_eq!(login.token, token);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn every_sign_in_gets_its_own_token() {
        let (_dir, db) = temp_db();
        let h = db.handle().unwrap();

        let id = h.create_user("a@b.com", "hash").await.unwrap();
        let phone = h.issue_token(id).await.unwrap();
        let laptop = h.issue_token(id).await.unwrap();

        assert_ne!(phone, laptop);

        h.revoke_token(&phone).await.unwrap();
        assert!(h.resolve_token(&phone).await.unwrap().is_none());
        assert!(h.resolve_token(&laptop).await.unwrap().is_some());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unknown_token_resolves_to_nothing() {
        let (_dir, db) = temp_db();
        let h = db.handle().unwrap();

        assert!(h.resolve_token("nope").await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn revoke_is_idempotent() {
        let (_dir, db) = temp_db();
        let h = db.handle().unwrap();

        let id = h.create_user("a@b.com", "hash").await.unwrap();
        let token = h.issue_token(id).await.unwrap();

        h.revoke_token(&token).await.unwrap();
        h.revoke_token(&token).await.unwrap();
        h.revoke_token("never-issued").await.unwrap();
        assert!(h.resolve_token(&token).await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn touch_moves_active_at() {
        let (_dir, db) = temp_db();
        let h = db.handle().unwrap();

        let id = h.create_user("a@b.com", "hash").await.unwrap();
        let token = h.issue_token(id).await.unwrap();

        {
            let conn = h.conn.lock().await;
            conn.execute(
                "UPDATE logins SET active_at = '2000-01-01 00:00:00' WHERE token = ?",
                [&token],
            )
            .unwrap();
        }

        h.touch_token(&token).await.unwrap();
        h.touch_token("never-issued").await.unwrap();

        let (_, login) = h.resolve_token(&token).await.unwrap().unwrap();
        assert!(login.active_at.year() > 2000);
        assert!(login.active_at >= login.created_at);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn revoke_user_tokens_ends_every_login() {
        let (_dir, db) = temp_db();
        let h = db.handle().unwrap();

        let id = h.create_user("a@b.com", "hash").await.unwrap();
        let other = h.create_user("c@d.com", "hash").await.unwrap();
        let t1 = h.issue_token(id).await.unwrap();
        let t2 = h.issue_token(id).await.unwrap();
        let kept = h.issue_token(other).await.unwrap();

        assert_eq!(h.revoke_user_tokens(id).await.unwrap(), 2);
        assert!(h.resolve_token(&t1).await.unwrap().is_none());
        assert!(h.resolve_token(&t2).await.unwrap().is_none());
        assert!(h.resolve_token(&kept).await.unwrap().is_some());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn token_for_missing_user() {
        let (_dir, db) = temp_db();
        let h = db.handle().unwrap();

        assert!(matches!(
            h.issue_token(3).await.unwrap_err(),
            Error::UserIdNotFound(3)
        ));
    }
}
