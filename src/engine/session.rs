use super::form::FormValues;
use super::step::{StepRequest, StepResponse};
use crate::{PanelError, Result};
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, USER_AGENT};
use std::sync::Arc;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://cp.conoha.jp/";
pub const SESSION_COOKIE_NAME: &str = "ASP.NET_SessionId";
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.10; rv:34.0) Gecko/20100101 Firefox/34.0";
pub const DEFAULT_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
pub const DEFAULT_ACCEPT_LANGUAGE: &str = "ja,en-us;q=0.7,en;q=0.3";

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub base_url: Url,
    pub session_cookie: String,
    pub user_agent: String,
    pub accept: String,
    pub accept_language: String,
}

impl SessionOptions {
    pub fn with_base_url(base_url: Url) -> Self {
        Self {
            base_url,
            ..Default::default()
        }
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("static URL"),
            session_cookie: SESSION_COOKIE_NAME.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept: DEFAULT_ACCEPT.to_string(),
            accept_language: DEFAULT_ACCEPT_LANGUAGE.to_string(),
        }
    }
}

/// Everything that makes consecutive chains look like one returning browser:
/// cookie jar, default headers and the hidden form state carried between
/// steps.
pub struct SessionContext {
    client: reqwest::Client,
    jar: Arc<Jar>,
    base_url: Url,
    session_cookie: String,
    default_headers: HeaderMap,
    carried: FormValues,
}

impl SessionContext {
    pub fn new(options: SessionOptions) -> Result<Self> {
        let jar = Arc::new(Jar::default());
        let client = reqwest::Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .build()
            .map_err(|e| PanelError::Configuration(format!("HTTP client: {}", e)))?;

        let mut session = Self {
            client,
            jar,
            base_url: options.base_url.clone(),
            session_cookie: options.session_cookie.clone(),
            default_headers: HeaderMap::new(),
            carried: FormValues::new(),
        };
        session.initialize_default(&options)?;
        Ok(session)
    }

    /// Resets default headers and carried parameters. The cookie jar is
    /// created empty with the context and is not touched here.
    pub fn initialize_default(&mut self, options: &SessionOptions) -> Result<()> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, header_value(&options.user_agent)?);
        headers.insert(ACCEPT, header_value(&options.accept)?);
        headers.insert(ACCEPT_LANGUAGE, header_value(&options.accept_language)?);
        self.default_headers = headers;
        self.carried = FormValues::new();
        Ok(())
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolves a panel path (`/Service/VPS/`) against the base URL.
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    pub fn default_headers(&self) -> &HeaderMap {
        &self.default_headers
    }

    pub fn set_default_header(&mut self, name: reqwest::header::HeaderName, value: &str) -> Result<()> {
        self.default_headers.insert(name, header_value(value)?);
        Ok(())
    }

    /// Current value of the session cookie, or an empty string.
    pub fn session_id(&self) -> String {
        let Some(header) = self.jar.cookies(&self.base_url) else {
            return String::new();
        };
        let Ok(header) = header.to_str() else {
            return String::new();
        };

        header
            .split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == self.session_cookie)
            .map(|(_, value)| value.to_string())
            .unwrap_or_default()
    }

    /// Installs the session cookie so the next request resumes that session.
    /// A later call replaces the cookie rather than adding a second one.
    pub fn seed_session_id(&mut self, id: &str) {
        let cookie = format!("{}={}; Path=/", self.session_cookie, id);
        self.jar.add_cookie_str(&cookie, &self.base_url);
    }

    pub fn carried_params(&self) -> &FormValues {
        &self.carried
    }

    pub(crate) fn replace_carried(&mut self, values: FormValues) {
        self.carried = values;
    }

    /// One HTTP exchange. Request headers win over default headers with the
    /// same name. The whole body is read before returning.
    pub(crate) async fn exchange(&self, request: StepRequest) -> Result<StepResponse> {
        let mut headers = self.default_headers.clone();
        for (name, value) in request.headers.iter() {
            headers.insert(name.clone(), value.clone());
        }

        let mut builder = self
            .client
            .request(request.method, request.url)
            .headers(headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let url = response.url().clone();
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();

        Ok(StepResponse {
            status,
            url,
            headers,
            body,
        })
    }
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("base_url", &self.base_url.as_str())
            .field("session_cookie", &self.session_cookie)
            .field("carried", &self.carried.len())
            .finish_non_exhaustive()
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| PanelError::Configuration(format!("invalid header value {:?}: {}", value, e)))
}
