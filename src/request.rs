//! Per-request state.
//!
//! The routing layer builds one [`RequestContext`] per request from the
//! token it pulled out of the cookie, asks it whether the request may go
//! on, and calls [`RequestContext::finish`] once the response exists.

use crate::database::{Db, Handle};
use crate::models::{LinkId, Login, SavedLink, Time, User};
use crate::user_links::BatchRemoval;
use crate::{links, Error, Result};

/// Link ids in a comma separated list such as the one the link page keeps
/// in its "mark for deletion" cookie. Entries that are not ids are skipped.
pub fn parse_link_ids(list : &str) -> Vec<LinkId> {
    list.split(',')
        .filter_map(|id| id.trim().parse().ok())
        .collect()
}

pub struct RequestContext {
    handle :  Handle,
    session : Option<(User, Login)>,
}

impl RequestContext {
    /// Opens the request's own storage handle and resolves `token`. A
    /// missing or unknown token makes an anonymous request.
    pub async fn begin(db : &Db, token : Option<&str>) -> Result<Self> {
        let handle = db.handle()?;

        let session = match token {
            Some(token) => handle.resolve_token(token).await?,
            None => None,
        };

        Ok(Self { handle, session })
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    pub fn user(&self) -> Option<&User> {
        self.session.as_ref().map(|(user, _)| user)
    }

    pub fn login(&self) -> Option<&Login> {
        self.session.as_ref().map(|(_, login)| login)
    }

    /// Gate for pages that need a signed in user.
    pub fn require_user(&self) -> Result<&User> {
        self.user().ok_or(Error::Unauthorized)
    }

    /// Gate for the sign in and register pages.
    pub fn require_anonymous(&self) -> Result<()> {
        match self.session {
            Some(_) => Err(Error::AlreadySignedIn),
            None => Ok(()),
        }
    }

    /// Removes the links listed in the deletion cookie, if there is one and
    /// the request is signed in.
    pub async fn apply_pending_deletes(
        &self,
        cookie : Option<&str>,
    ) -> Result<BatchRemoval> {
        let (user, cookie) = match (self.user(), cookie) {
            (Some(user), Some(cookie)) => (user, cookie),
            _ => return Ok(BatchRemoval::default()),
        };

        let ids = parse_link_ids(cookie);
        Ok(self.handle.remove_links(&ids, user.id).await)
    }

    /// Saves `raw` for the signed in user. `query` carries parameters that
    /// arrived outside the url itself.
    pub async fn save_link(
        &self,
        raw : &str,
        query : &[(String, String)],
    ) -> Result<(LinkId, Time)> {
        let user = self.require_user()?;
        let raw = links::append_query(raw, query)?;

        self.handle.save_url(user.id, &raw).await
    }

    pub async fn links(&self) -> Result<Vec<SavedLink>> {
        let user = self.require_user()?;

        self.handle.list_links(user.id).await
    }

    pub async fn remove_link(&self, link_id : LinkId) -> Result<()> {
        let user = self.require_user()?;

        self.handle.remove_link(link_id, user.id).await
    }

    /// Revokes this request's token; the rest of the request is anonymous.
    pub async fn sign_out(&mut self) -> Result<()> {
        if let Some((user, login)) = self.session.take() {
            self.handle.revoke_token(&login.token).await?;
            tracing::info!(user_id = user.id, "signed out");
        }

        Ok(())
    }

    /// Marks the login as active. Runs after the response is built, so a
    /// failure is only logged.
    pub async fn finish(self) {
        if let Some((user, login)) = &self.session {
            if let Err(err) = self.handle.touch_token(&login.token).await {
                tracing::warn!(user_id = user.id, ?err, "failed to refresh login");
            }
        }
    }
}
