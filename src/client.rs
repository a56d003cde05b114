use std::collections::BTreeMap;
use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::{Error, TransportError};
use crate::request::RequestSpec;

/// What came back from the remote end. Status is not interpreted here.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

impl Response {
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("content-type"))
            .map(|(_, v)| v.as_str())
    }
}

#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn send(
        &self,
        request: &RequestSpec,
        timeout: Duration,
    ) -> Result<Response, TransportError>;
}

pub struct ReqwestClient {
    http_client: Client,
}

impl ReqwestClient {
    pub fn new(user_agent: Option<&str>) -> Result<Self, Error> {
        let user_agent = user_agent.unwrap_or(crate::APP_USER_AGENT);
        tracing::debug!(user_agent, "configuring http client");
        let http_client = reqwest::Client::builder()
            .user_agent(user_agent)
            .brotli(true)
            .gzip(true)
            .build()?;
        Ok(Self { http_client })
    }
}

impl Debug for ReqwestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReqwestClient {{ /* omitted */ }}")
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn send(
        &self,
        request: &RequestSpec,
        timeout: Duration,
    ) -> Result<Response, TransportError> {
        let method = reqwest::Method::from_bytes(request.method().as_bytes())
            .map_err(|err| TransportError::InvalidRequest(err.to_string()))?;
        let mut builder = self
            .http_client
            .request(method, request.url())
            .timeout(timeout);
        for (name, value) in request.headers() {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body() {
            builder = builder.body(body.to_vec());
        }

        let response = builder.send().await.map_err(map_reqwest_error)?;
        let status = response.status().as_u16();
        tracing::trace!("response status: {}", status);

        let mut headers = BTreeMap::new();
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                headers.insert(name.to_string(), value.to_string());
            }
        }
        let body = response
            .bytes()
            .await
            .map_err(|err| match map_reqwest_error(err) {
                TransportError::Request(msg) => TransportError::Body(msg),
                other => other,
            })?
            .to_vec();

        Ok(Response {
            status,
            headers,
            body,
        })
    }
}

fn map_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        return TransportError::Timeout;
    }
    if err.is_connect() {
        return TransportError::Connect(err.to_string());
    }
    if err.is_builder() {
        return TransportError::InvalidRequest(err.to_string());
    }
    if err.is_body() || err.is_decode() {
        return TransportError::Body(err.to_string());
    }
    TransportError::Request(err.to_string())
}
