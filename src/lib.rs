mod error;
pub use error::*;

pub mod accounts;
pub mod config;
pub mod crypto;
pub mod database;
pub mod links;
pub mod logins;
pub mod models;
pub mod request;
pub mod time_utils;
pub mod user_links;
pub mod users;

pub use config::Config;
pub use database::{Db, Handle};
pub use request::RequestContext;
