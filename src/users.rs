//! Credential store.
//!
//! Emails are matched exactly as stored; uniqueness comes from the
//! `UNIQUE` constraint on `users.email`, so two racing registrations can't
//! both succeed.

use rusqlite::{params, Connection};

use crate::database::{self, db_method, query_one, Handle};
use crate::models::{User, UserId};
use crate::{Error, Result};

const SELECT_USER : &str =
    "SELECT id, email, password_hash, created_at FROM users";

fn duplicate_email(email : &str) -> impl FnOnce(rusqlite::Error) -> Error + '_ {
    move |err| {
        if database::is_unique_violation(&err) {
            Error::DuplicateEmail(email.to_string())
        } else {
            err.into()
        }
    }
}

fn set_email(conn : &Connection, user_id : UserId, email : &str) -> Result<()> {
    let n = conn
        .prepare_cached("UPDATE users SET email = ? WHERE id = ?")?
        .execute(params![email, user_id])
        .map_err(duplicate_email(email))?;

    if n == 0 {
        return Err(Error::UserIdNotFound(user_id));
    }

    Ok(())
}

fn set_password(
    conn : &Connection,
    user_id : UserId,
    password_hash : &str,
) -> Result<()> {
    let n = conn
        .prepare_cached("UPDATE users SET password_hash = ? WHERE id = ?")?
        .execute(params![password_hash, user_id])?;

    if n == 0 {
        return Err(Error::UserIdNotFound(user_id));
    }

    Ok(())
}

impl Handle {
    db_method! {find_user_by_email(
        &self,
        conn,
        email : &str
    ) -> Result<Option<User>> {
        query_one(
            &conn,
            &format!("{} WHERE email = ?", SELECT_USER),
            params![email],
        )
    }}

    db_method! {get_user(&self, conn, user_id : UserId) -> Result<User> {
        query_one(&conn, &format!("{} WHERE id = ?", SELECT_USER), params![user_id])?
            .ok_or(Error::UserIdNotFound(user_id))
    }}

    db_method! {create_user(
        &self,
        conn,
        email : &str,
        password_hash : &str
    ) -> Result<UserId> {
        conn
            .prepare_cached("INSERT INTO users (email, password_hash) VALUES (?, ?)")?
            .execute(params![email, password_hash])
            .map_err(duplicate_email(email))?;

        let user_id = conn.last_insert_rowid();
        tracing::info!(user_id, "created user");

        Ok(user_id)
    }}

    db_method! {update_user_password(
        &self,
        conn,
        user_id : UserId,
        password_hash : &str
    ) -> Result<()> {
        set_password(&conn, user_id, password_hash)?;
        tracing::info!(user_id, "updated password");
        Ok(())
    }}

    db_method! {update_user_email(
        &self,
        conn,
        user_id : UserId,
        email : &str
    ) -> Result<()> {
        set_email(&conn, user_id, email)
    }}

    db_method! {
        /// Changes the email and, when given, the password hash together;
        /// neither lands if the other fails.
        update_credentials(
            &self,
            conn,
            user_id : UserId,
            email : &str,
            password_hash : Option<&str>
        ) -> Result<()> {
            let tx = database::immediate(&conn)?;

            set_email(&tx, user_id, email)?;
            if let Some(hash) = password_hash {
                set_password(&tx, user_id, hash)?;
            }

            tx.commit()?;
            tracing::info!(
                user_id,
                password_changed = password_hash.is_some(),
                "updated credentials"
            );

            Ok(())
        }
    }
}
