use super::form::FormValues;
use crate::{PanelError, Result};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use scraper::Html;
use serde::de::DeserializeOwned;
use url::Url;

/// A fully-formed outgoing request. Producers build these without doing I/O.
#[derive(Debug, Clone)]
pub struct StepRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<String>,
}

impl StepRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// POST with an `application/x-www-form-urlencoded` body.
    pub fn post_form(url: Url, form: &FormValues) -> Self {
        let mut request = Self::new(Method::POST, url);
        request.headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        request.body = Some(form.encode());
        request
    }

    /// Replaces the query string with the encoded form.
    pub fn with_query(mut self, form: &FormValues) -> Self {
        if form.is_empty() {
            self.url.set_query(None);
        } else {
            self.url.set_query(Some(&form.encode()));
        }
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| PanelError::RequestConstruction(format!("header name {}: {}", name, e)))?;
        let value = HeaderValue::from_str(value).map_err(|e| {
            PanelError::RequestConstruction(format!("header value for {}: {}", name, e))
        })?;
        self.headers.insert(name, value);
        Ok(self)
    }

    pub fn with_referer(self, referer: &Url) -> Result<Self> {
        self.with_header("Referer", referer.as_str())
    }
}

/// A fully-read response. The body is buffered before any consumer sees it.
#[derive(Debug, Clone)]
pub struct StepResponse {
    pub status: StatusCode,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl StepResponse {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body)
            .map_err(|e| PanelError::ResponseParse(format!("invalid JSON from {}: {}", self.url, e)))
    }

    pub fn ensure_ok(&self) -> Result<()> {
        if self.status == StatusCode::OK {
            Ok(())
        } else {
            Err(PanelError::ResultValidation(format!(
                "server returned status code {}",
                self.status.as_u16()
            )))
        }
    }
}

/// Builds the outgoing request for a step from the carried parameters.
pub trait RequestProducer: Send {
    fn produce(&self, carried: &FormValues) -> Result<StepRequest>;
}

impl<F> RequestProducer for F
where
    F: Fn(&FormValues) -> Result<StepRequest> + Send,
{
    fn produce(&self, carried: &FormValues) -> Result<StepRequest> {
        self(carried)
    }
}

/// Consumes an HTML response that the engine has already parsed.
pub trait DocumentConsumer: Send {
    fn consume(&mut self, response: &StepResponse, document: &Html) -> Result<()>;
}

impl<F> DocumentConsumer for F
where
    F: FnMut(&StepResponse, &Html) -> Result<()> + Send,
{
    fn consume(&mut self, response: &StepResponse, document: &Html) -> Result<()> {
        self(response, document)
    }
}

/// Consumes the raw response body (JSON, file downloads, bare status checks).
pub trait RawConsumer: Send {
    fn consume(&mut self, response: &StepResponse) -> Result<()>;
}

impl<F> RawConsumer for F
where
    F: FnMut(&StepResponse) -> Result<()> + Send,
{
    fn consume(&mut self, response: &StepResponse) -> Result<()> {
        self(response)
    }
}

pub enum Consumer {
    Document(Box<dyn DocumentConsumer>),
    Raw(Box<dyn RawConsumer>),
}

impl Consumer {
    pub fn is_document(&self) -> bool {
        matches!(self, Self::Document(_))
    }
}

impl std::fmt::Debug for Consumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Document(_) => f.write_str("Consumer::Document"),
            Self::Raw(_) => f.write_str("Consumer::Raw"),
        }
    }
}

/// One request/response round trip.
pub struct Step {
    pub(crate) producer: Box<dyn RequestProducer>,
    pub(crate) consumer: Consumer,
}

impl Step {
    pub fn document(
        producer: impl RequestProducer + 'static,
        consumer: impl DocumentConsumer + 'static,
    ) -> Self {
        Self {
            producer: Box::new(producer),
            consumer: Consumer::Document(Box::new(consumer)),
        }
    }

    pub fn raw(
        producer: impl RequestProducer + 'static,
        consumer: impl RawConsumer + 'static,
    ) -> Self {
        Self {
            producer: Box::new(producer),
            consumer: Consumer::Raw(Box::new(consumer)),
        }
    }

    pub fn builder() -> StepBuilder {
        StepBuilder::default()
    }

    pub fn consumer(&self) -> &Consumer {
        &self.consumer
    }
}

impl std::fmt::Debug for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Step")
            .field("consumer", &self.consumer)
            .finish_non_exhaustive()
    }
}

/// Assembles a step from separately supplied parts; a missing half is a
/// configuration error rather than a panic.
#[derive(Default)]
pub struct StepBuilder {
    producer: Option<Box<dyn RequestProducer>>,
    consumer: Option<Consumer>,
}

impl StepBuilder {
    pub fn producer(mut self, producer: impl RequestProducer + 'static) -> Self {
        self.producer = Some(Box::new(producer));
        self
    }

    pub fn document(mut self, consumer: impl DocumentConsumer + 'static) -> Self {
        self.consumer = Some(Consumer::Document(Box::new(consumer)));
        self
    }

    pub fn raw(mut self, consumer: impl RawConsumer + 'static) -> Self {
        self.consumer = Some(Consumer::Raw(Box::new(consumer)));
        self
    }

    pub fn build(self) -> Result<Step> {
        let producer = self.producer.ok_or_else(|| {
            PanelError::Configuration("step has no request producer".into())
        })?;
        let consumer = self.consumer.ok_or_else(|| {
            PanelError::Configuration("step declares neither a document nor a raw consumer".into())
        })?;
        Ok(Step { producer, consumer })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_post_form_sets_body_and_content_type() {
        let mut form = FormValues::new();
        form.add("a", "1").add("b", "x y");
        let req = StepRequest::post_form(url("https://example.com/f"), &form);
        assert_eq!(req.method, Method::POST);
        assert_eq!(req.body.as_deref(), Some("a=1&b=x+y"));
        assert_eq!(
            req.headers.get(CONTENT_TYPE).unwrap(),
            "application/x-www-form-urlencoded"
        );
    }

    #[test]
    fn test_with_query() {
        let mut form = FormValues::new();
        form.add("evid", "123");
        let req = StepRequest::get(url("https://example.com/s.aspx")).with_query(&form);
        assert_eq!(req.url.as_str(), "https://example.com/s.aspx?evid=123");
    }

    #[test]
    fn test_with_header_rejects_invalid_value() {
        let req = StepRequest::get(url("https://example.com/"));
        let err = req.with_header("X-Test", "bad\nvalue").unwrap_err();
        assert!(matches!(err, PanelError::RequestConstruction(_)));
    }

    #[test]
    fn test_builder_without_consumer_is_configuration_error() {
        let err = Step::builder()
            .producer(|_: &FormValues| -> Result<StepRequest> {
                Ok(StepRequest::get(url("https://example.com/")))
            })
            .build()
            .unwrap_err();
        assert!(matches!(err, PanelError::Configuration(_)));
    }

    #[test]
    fn test_builder_without_producer_is_configuration_error() {
        let err = Step::builder()
            .raw(|_: &StepResponse| -> Result<()> { Ok(()) })
            .build()
            .unwrap_err();
        assert!(matches!(err, PanelError::Configuration(_)));
    }

    #[test]
    fn test_builder_selects_variant() {
        let step = Step::builder()
            .producer(|_: &FormValues| -> Result<StepRequest> {
                Ok(StepRequest::get(url("https://example.com/")))
            })
            .document(|_: &StepResponse, _: &Html| -> Result<()> { Ok(()) })
            .build()
            .unwrap();
        assert!(step.consumer().is_document());
    }

    #[test]
    fn test_ensure_ok() {
        let resp = StepResponse {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            url: url("https://example.com/"),
            headers: HeaderMap::new(),
            body: Vec::new(),
        };
        assert!(matches!(
            resp.ensure_ok().unwrap_err(),
            PanelError::ResultValidation(_)
        ));
    }
}
