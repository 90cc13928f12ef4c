//! Registration, sign-in and profile changes, with the input checks the
//! forms need.

use std::sync::LazyLock;

use regex::Regex;

use crate::database::Handle;
use crate::models::User;
use crate::{crypto, Error, Result};

pub const MIN_PASSWORD_LEN : usize = 4;

/// Loose shape check: something, `@`, something, `.`, something.
static EMAIL : LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r".+@.+\..+").unwrap());

pub fn is_valid_email(email : &str) -> bool {
    EMAIL.is_match(email)
}

pub fn validate_email(email : &str) -> Result<()> {
    if !is_valid_email(email) {
        return Err(Error::InvalidEmail(email.to_string()));
    }

    Ok(())
}

pub fn validate_new_password(password : &str, confirm : &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(Error::PasswordTooShort);
    }

    if password != confirm {
        return Err(Error::PasswordMismatch);
    }

    Ok(())
}

fn hash(password : &str) -> Result<String> {
    tokio::task::block_in_place(|| crypto::encode_password(password.as_bytes()))
}

fn verify(user : &User, password : &str) -> Result<bool> {
    tokio::task::block_in_place(|| {
        crypto::verify_password(&user.password_hash, password.as_bytes())
    })
}

impl Handle {
    /// Creates the account and signs it in, returning the first token.
    pub async fn register(
        &self,
        email : &str,
        password : &str,
        confirm : &str,
    ) -> Result<String> {
        if self.find_user_by_email(email).await?.is_some() {
            return Err(Error::DuplicateEmail(email.to_string()));
        }

        validate_email(email)?;
        validate_new_password(password, confirm)?;

        // the unique constraint still catches a registration racing this one
        let user_id = self.create_user(email, &hash(password)?).await?;

        self.issue_token(user_id).await
    }

    /// A new token for the account, or [`Error::FailedLogin`] without
    /// saying whether the email or the password was wrong.
    pub async fn sign_in(&self, email : &str, password : &str) -> Result<String> {
        let user = match self.find_user_by_email(email).await? {
            Some(user) => user,
            None => return Err(Error::FailedLogin),
        };

        if !verify(&user, password)? {
            tracing::info!(user_id = user.id, "rejected sign in");
            return Err(Error::FailedLogin);
        }

        self.issue_token(user.id).await
    }

    /// Saves a profile form. `current_password` must verify; an empty
    /// `new_password` keeps the old one.
    pub async fn update_profile(
        &self,
        user : &User,
        current_password : &str,
        email : &str,
        new_password : &str,
        confirm : &str,
    ) -> Result<()> {
        if !verify(user, current_password)? {
            return Err(Error::WrongPassword);
        }

        validate_email(email)?;

        if let Some(other) = self.find_user_by_email(email).await? {
            if other.id != user.id {
                return Err(Error::DuplicateEmail(email.to_string()));
            }
        }

        let password_hash = if new_password.is_empty() {
            None
        } else {
            validate_new_password(new_password, confirm)?;
            Some(hash(new_password)?)
        };

        self.update_credentials(user.id, email, password_hash.as_deref())
            .await
    }
}
