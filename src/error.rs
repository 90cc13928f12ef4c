use std::fmt;

use quick_from::QuickFrom;

use crate::models::{LinkId, UserId};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(QuickFrom, Debug)]
pub enum Error {
    DuplicateEmail(String),
    InvalidEmail(String),
    InvalidUrl(String),
    PasswordTooShort,
    PasswordMismatch,
    FailedLogin,
    WrongPassword,
    Unauthorized,
    AlreadySignedIn,
    UserIdNotFound(UserId),
    LinkIdNotFound(LinkId),

    #[quick_from]
    StorageUnavailable(rusqlite::Error),

    #[quick_from]
    Hash(argon2::Error),

    #[quick_from]
    Encode(serde_urlencoded::ser::Error),

    #[quick_from]
    Json(serde_json::Error),

    #[quick_from]
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f : &mut fmt::Formatter<'_>) -> fmt::Result {
        use Error::*;
        match self {
            DuplicateEmail(email) => {
                write!(f, "an account for {} exists already", email)
            },
            InvalidEmail(email) => write!(f, "invalid email: {}", email),
            InvalidUrl(url) => write!(f, "invalid url: {}", url),
            PasswordTooShort => f.write_str("password is too short"),
            PasswordMismatch => f.write_str("passwords do not match"),
            FailedLogin => f.write_str("invalid email or password"),
            WrongPassword => f.write_str("password is not correct"),
            Unauthorized => f.write_str("not signed in"),
            AlreadySignedIn => f.write_str("already signed in"),
            UserIdNotFound(id) => write!(f, "user {} not found", id),
            LinkIdNotFound(id) => write!(f, "link {} not found", id),
            StorageUnavailable(err) => write!(f, "storage unavailable: {}", err),
            Hash(err) => write!(f, "password hashing failed: {}", err),
            Encode(err) => write!(f, "query encoding failed: {}", err),
            Json(err) => write!(f, "json: {}", err),
            Io(err) => write!(f, "io: {}", err),
        }
    }
}

impl std::error::Error for Error {}
