use super::{CTL, paths, select_text, selector};
use crate::engine::{
    ActionChain, Authenticator, FormValues, SessionContext, Shared, Step, StepRequest,
    StepResponse,
};
use crate::output::{self, OutputFormatter};
use crate::state::AccountStore;
use crate::{PanelError, Result};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde::Serialize;

static LOGIN_USER: Lazy<Selector> = Lazy::new(|| selector("#divLoginUser"));

#[derive(Clone)]
pub struct Credentials {
    pub account: String,
    pub password: String,
}

impl Credentials {
    pub fn new(account: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            password: password.into(),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.account.is_empty() && !self.password.is_empty()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("account", &self.account)
            .field("password", &"***")
            .finish()
    }
}

/// Landing page step: the header shows the account id only when logged in.
pub fn login_check_step(session: &SessionContext, logged_in: Shared<bool>) -> Result<Step> {
    let url = session.endpoint(paths::TOP)?;
    Ok(Step::document(
        move |_: &FormValues| -> Result<StepRequest> { Ok(StepRequest::get(url.clone())) },
        move |_: &StepResponse, doc: &Html| -> Result<()> {
            logged_in.set(!select_text(doc, &LOGIN_USER).trim().is_empty());
            Ok(())
        },
    ))
}

pub async fn is_logged_in(session: &mut SessionContext) -> Result<bool> {
    let logged_in = Shared::new(false);
    let mut chain = ActionChain::new();
    chain.add_step(login_check_step(session, logged_in.clone())?)?;
    chain.run(session).await?;
    Ok(logged_in.get())
}

/// Login form fetch followed by the credential postback.
pub fn login_steps(session: &SessionContext, credentials: &Credentials) -> Result<Vec<Step>> {
    let form_url = session.endpoint(paths::LOGIN)?;

    let fetch_url = form_url.clone();
    let fetch = Step::document(
        move |_: &FormValues| -> Result<StepRequest> { Ok(StepRequest::get(fetch_url.clone())) },
        |_: &StepResponse, _: &Html| -> Result<()> { Ok(()) },
    );

    let credentials = credentials.clone();
    let submit = Step::document(
        move |carried: &FormValues| -> Result<StepRequest> {
            let mut form = carried.clone();
            form.set(format!("{CTL}txtConoHaLoginID"), &credentials.account);
            form.set(format!("{CTL}txtConoHaLoginPW"), &credentials.password);
            form.set(format!("{CTL}btnLogin"), "ログイン");
            StepRequest::post_form(form_url.clone(), &form).with_referer(&form_url)
        },
        |_: &StepResponse, _: &Html| -> Result<()> { Ok(()) },
    );

    Ok(vec![fetch, submit])
}

pub async fn login(session: &mut SessionContext, credentials: &Credentials) -> Result<()> {
    let mut chain = ActionChain::new();
    for step in login_steps(session, credentials)? {
        chain.add_step(step)?;
    }
    chain.run(session).await
}

/// Session recovery against the real panel using stored credentials.
pub struct PanelAuthenticator {
    credentials: Credentials,
}

impl PanelAuthenticator {
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }
}

#[async_trait::async_trait]
impl Authenticator for PanelAuthenticator {
    async fn is_authenticated(&self, session: &mut SessionContext) -> Result<bool> {
        is_logged_in(session).await
    }

    async fn login(&self, session: &mut SessionContext) -> Result<()> {
        if !self.credentials.is_complete() {
            return Err(PanelError::Authentication(
                "no stored account; run `conoha login` first".into(),
            ));
        }
        login(session, &self.credentials).await
    }
}

#[derive(Debug, Serialize)]
pub struct LoginResult {
    pub account: String,
    pub logged_in: bool,
}

impl OutputFormatter for LoginResult {
    fn format_text(&self) -> String {
        use crate::output::text;
        if self.logged_in {
            text::success("Login Successfully.")
        } else {
            text::error("Login failed. Enter correct ConoHa account ID and password.")
        }
    }

    fn format_json(&self, pretty: bool) -> Result<String> {
        output::to_json(self, pretty)
    }
}

pub async fn handle_login(
    session: &mut SessionContext,
    credentials: &Credentials,
) -> Result<LoginResult> {
    login(session, credentials).await?;
    let logged_in = is_logged_in(session).await?;
    tracing::debug!(account = %credentials.account, logged_in, "Login chain finished");

    Ok(LoginResult {
        account: credentials.account.clone(),
        logged_in,
    })
}

#[derive(Debug, Serialize)]
pub struct LogoutResult {
    pub removed: String,
}

impl OutputFormatter for LogoutResult {
    fn format_text(&self) -> String {
        crate::output::text::success(&format!("Removed {}", self.removed))
    }

    fn format_json(&self, pretty: bool) -> Result<String> {
        output::to_json(self, pretty)
    }
}

pub fn handle_logout(store: &AccountStore) -> Result<LogoutResult> {
    store.remove()?;
    Ok(LogoutResult {
        removed: store.path().display().to_string(),
    })
}
