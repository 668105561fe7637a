//! The `listen` action: a one-shot mock HTTP endpoint
//!
//! The listener is bound before the trigger pipeline starts, so the trigger
//! can call it right away. Exactly one request is accepted and answered with
//! the configured response; only then is it checked against the expected
//! url and method.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde::Deserialize;
use serde_json::Value;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tracing::{debug, info};

use super::payload::Payload;
use super::request::{header_map, Method};
use super::serial::Pipeline;
use super::step::Step;
use super::{Action, ActionContext, Content};
use crate::common::{Error, Result};
use crate::http::codec::{self, HttpRequest, HttpResponse};

/// All interfaces
const DEFAULT_HOST: &str = "0.0.0.0";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListenOptions {
    pub port: u16,
    /// Expected request path
    pub url: String,
    /// Expected request method
    #[serde(default)]
    pub method: Method,
    /// Response body
    pub body: Option<Value>,
    pub body_from: Option<Vec<Step>>,
    /// Response headers
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Response status, 200 when absent
    pub code: Option<u16>,
    pub host: Option<String>,
    /// Bound on the wait for the request
    pub timeout_ms: Option<u64>,
    /// Steps run while listening, usually the request that makes the
    /// system under test call back
    #[serde(default)]
    pub trigger: Vec<Step>,
}

#[derive(Debug, Clone)]
pub struct Listen {
    host: String,
    port: u16,
    url: String,
    method: Method,
    payload: Payload,
    headers: HeaderMap,
    code: u16,
    timeout: Option<Duration>,
    trigger: Pipeline,
}

impl Listen {
    pub fn new(options: ListenOptions) -> Result<Self> {
        if options.url.is_empty() {
            return Err(Error::invalid_parameter(
                "listen",
                "\"url\" is not allowed to be empty",
            ));
        }
        let code = options.code.unwrap_or(200);
        if !(100..=999).contains(&code) {
            return Err(Error::invalid_parameter(
                "listen",
                format!("\"code\" must be a valid status code, got {}", code),
            ));
        }
        Ok(Self {
            host: options.host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: options.port,
            url: options.url,
            method: options.method,
            payload: Payload::from_options("listen", options.body, options.body_from)?,
            headers: header_map("listen", &options.headers)?,
            code,
            timeout: options.timeout_ms.map(Duration::from_millis),
            trigger: Pipeline::from_steps(options.trigger)?,
        })
    }

    async fn response(&self, ctx: &ActionContext) -> Result<HttpResponse> {
        let body = self.payload.resolve(ctx).await?;
        let mut headers = Vec::new();
        let has_content_type = self.headers.contains_key("content-type");
        if let Some(content) = body.as_ref().filter(|_| !has_content_type) {
            headers.push(("Content-Type".to_string(), content.content_type().to_string()));
        }
        for (name, value) in &self.headers {
            headers.push((
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            ));
        }
        Ok(HttpResponse {
            status: self.code,
            headers,
            body: body
                .map(|content| content.as_text().into_owned().into_bytes())
                .unwrap_or_default(),
        })
    }

    async fn accept(&self, listener: &TcpListener, response: &HttpResponse) -> Result<HttpRequest> {
        let (stream, peer) = listener.accept().await?;
        debug!(%peer, "Accepted connection");
        let (reader, mut writer) = stream.into_split();
        let request = codec::read_request(&mut BufReader::new(reader)).await?;
        codec::write_response(&mut writer, response).await?;
        let _ = writer.shutdown().await;
        Ok(request)
    }

    async fn serve(&self, listener: &TcpListener, response: &HttpResponse) -> Result<HttpRequest> {
        match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, self.accept(listener, response))
                .await
                .map_err(|_| Error::Timeout(timeout.as_millis() as u64))?,
            None => self.accept(listener, response).await,
        }
    }
}

#[async_trait]
impl Action for Listen {
    async fn apply(&self, mut ctx: ActionContext) -> Result<ActionContext> {
        ctx.push(format!("listen to {} {}", self.method, self.url));
        let response = self.response(&ctx).await?;

        let addr = format!("{}:{}", self.host, self.port);
        let listener = TcpListener::bind(&addr).await.map_err(|e| Error::Bind {
            addr: addr.clone(),
            error: ctx.trail(e.to_string()),
        })?;
        info!(%addr, "Listening for {} {}", self.method, self.url);

        let (request, _) = tokio::try_join!(
            self.serve(&listener, &response),
            self.trigger.apply(ctx.child()),
        )?;
        drop(listener);
        debug!(method = %request.method, target = %request.target, "Received request");

        if request.path() != self.url {
            return Err(Error::Assertion(ctx.trail(format!(
                "Unexpected url: expected '{}' to equal '{}'",
                request.path(),
                self.url
            ))));
        }
        if !request.method.eq_ignore_ascii_case(self.method.as_str()) {
            return Err(Error::Assertion(ctx.trail(format!(
                "Unexpected method: expected '{}' to equal '{}'",
                request.method,
                self.method
            ))));
        }

        let headers: BTreeMap<String, String> = request.headers.iter().cloned().collect();
        let content_type = headers.get("content-type").map(String::as_str);
        ctx.content = Some(Content::parse(
            String::from_utf8_lossy(&request.body).into_owned(),
            content_type,
        )?);
        ctx.headers = Some(headers);
        Ok(ctx)
    }
}
