use rand::{thread_rng, Rng};
use uuid::Uuid;

use crate::Result;

/// Salted argon2 hash in the self-describing encoded form, so the cost
/// parameters travel with the hash.
pub fn encode_password(pass : &[u8]) -> Result<String> {
    let mut salt = [0; 32];
    thread_rng().fill(&mut salt);

    Ok(argon2::hash_encoded(pass, &salt, &argon2::Config::default())?)
}

pub fn verify_password(encoded : &str, pass : &[u8]) -> Result<bool> {
    Ok(argon2::verify_encoded(encoded, pass)?)
}

/// Fresh opaque login token (random v4 uuid).
pub fn generate_token() -> String {
    Uuid::new_v4().to_string()
}
