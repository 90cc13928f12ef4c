use serde::Serialize;

pub type Time = crate::time_utils::Time;

pub type UserId = i64;
pub type LinkId = i64;

#[derive(Debug, Serialize)]
pub struct User {
    pub id :            UserId,
    pub email :         String,
    #[serde(skip)]
    pub password_hash : String,
    pub created_at :    Time,
}

/// One sign-in. A user holds as many of these as devices they signed in
/// from.
#[derive(Debug, Serialize)]
pub struct Login {
    #[serde(skip)]
    pub token :      String,
    pub user_id :    UserId,
    pub created_at : Time,
    pub active_at :  Time,
}

#[derive(Debug, Serialize)]
pub struct Link {
    pub id :         LinkId,
    pub url :        String,
    pub created_at : Time,
}

/// A link as it appears in one user's list.
#[derive(Debug, Serialize)]
pub struct SavedLink {
    pub id :       LinkId,
    pub url :      String,
    pub saved_at : Time,
}
