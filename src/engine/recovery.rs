use super::session::SessionContext;
use crate::{PanelError, Result};

/// The two chains session recovery needs from the panel-specific recipes.
#[async_trait::async_trait]
pub trait Authenticator: Send + Sync {
    /// Runs the lightweight "am I logged in" chain.
    async fn is_authenticated(&self, session: &mut SessionContext) -> Result<bool>;

    /// Runs the full login chain once.
    async fn login(&self, session: &mut SessionContext) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    AlreadyAuthenticated,
    Reauthenticated,
}

/// Checks the session and, if it is not authenticated, logs in exactly once.
/// Anything short of a confirmed login after that single attempt is an
/// authentication error.
pub async fn ensure_session(
    session: &mut SessionContext,
    auth: &dyn Authenticator,
) -> Result<Recovery> {
    match auth.is_authenticated(session).await {
        Ok(true) => return Ok(Recovery::AlreadyAuthenticated),
        Ok(false) => tracing::debug!("Session is not authenticated, trying to log in again"),
        Err(e) => tracing::debug!("Session check failed ({}), trying to log in again", e),
    }

    if let Err(e) = auth.login(session).await {
        tracing::debug!("Re-authentication failed: {}", e);
        return Err(PanelError::Authentication(format!(
            "session timed out and login failed: {}",
            e
        )));
    }

    match auth.is_authenticated(session).await {
        Ok(true) => {
            tracing::debug!("Re-authenticated");
            Ok(Recovery::Reauthenticated)
        }
        Ok(false) => Err(PanelError::Authentication(
            "session timed out; please log in".into(),
        )),
        Err(e) => Err(PanelError::Authentication(format!(
            "could not confirm login: {}",
            e
        ))),
    }
}

/// Runs `operation` only once the session is known to be authenticated.
pub async fn run_protected<T>(
    session: &mut SessionContext,
    auth: &dyn Authenticator,
    operation: impl AsyncFnOnce(&mut SessionContext) -> Result<T>,
) -> Result<T> {
    ensure_session(session, auth).await?;
    operation(session).await
}
