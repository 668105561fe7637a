//! The `request` action

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::redirect::Policy;
use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::payload::Payload;
use super::step::Step;
use super::{Action, ActionContext, Content};
use crate::common::{Error, Result};

/// HTTP methods scenarios may use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Head,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Head => "HEAD",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Head => reqwest::Method::HEAD,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequestOptions {
    pub url: String,
    #[serde(default)]
    pub method: Method,
    pub body: Option<Value>,
    pub body_from: Option<Vec<Step>>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub follow_redirect: bool,
    pub timeout_ms: Option<u64>,
}

/// Parse header pairs, naming the action on failure
pub(super) fn header_map(action: &str, headers: &BTreeMap<String, String>) -> Result<HeaderMap> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
            Error::invalid_parameter(action, format!("invalid header name '{}'", name))
        })?;
        let value = HeaderValue::from_str(value).map_err(|_| {
            Error::invalid_parameter(action, format!("invalid value for header '{}'", name))
        })?;
        map.insert(name, value);
    }
    Ok(map)
}

/// Send an HTTP request; the response fills `code`, `headers` and `content`
#[derive(Debug, Clone)]
pub struct Request {
    url: Url,
    method: Method,
    payload: Payload,
    headers: HeaderMap,
    follow_redirect: bool,
    timeout: Option<Duration>,
}

impl Request {
    pub fn new(options: RequestOptions) -> Result<Self> {
        let url = Url::parse(&options.url)
            .ok()
            .filter(|url| matches!(url.scheme(), "http" | "https"))
            .ok_or_else(|| {
                Error::invalid_parameter(
                    "request",
                    format!("\"url\" must be an http(s) URL, got '{}'", options.url),
                )
            })?;
        Ok(Self {
            url,
            method: options.method,
            payload: Payload::from_options("request", options.body, options.body_from)?,
            headers: header_map("request", &options.headers)?,
            follow_redirect: options.follow_redirect,
            timeout: options.timeout_ms.map(Duration::from_millis),
        })
    }

    fn client(&self) -> Result<reqwest::Client> {
        let policy = if self.follow_redirect {
            Policy::default()
        } else {
            Policy::none()
        };
        Ok(reqwest::Client::builder().redirect(policy).build()?)
    }
}

#[async_trait]
impl Action for Request {
    async fn apply(&self, mut ctx: ActionContext) -> Result<ActionContext> {
        let body = self.payload.resolve(&ctx).await?;
        ctx.push(format!("request {}", self.url));

        let mut headers = HeaderMap::new();
        if let Some(content) = &body {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(content.content_type()));
        }
        for (name, value) in &self.headers {
            headers.insert(name.clone(), value.clone());
        }

        let mut request = self
            .client()?
            .request(self.method.into(), self.url.clone())
            .headers(headers);
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }
        if let Some(content) = body {
            request = request.body(content.as_text().into_owned());
        }

        debug!(method = %self.method, url = %self.url, "Sending request");
        let response = request.send().await.map_err(|e| transport_error(&ctx, e))?;

        let status = response.status().as_u16();
        let headers: BTreeMap<String, String> = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| transport_error(&ctx, e))?;
        debug!(status, bytes = bytes.len(), "Received response");

        let content_type = headers.get("content-type").map(String::as_str);
        ctx.content = Some(Content::parse(
            String::from_utf8_lossy(&bytes).into_owned(),
            content_type,
        )?);
        ctx.code = Some(status);
        ctx.headers = Some(headers);
        Ok(ctx)
    }
}

/// Transport failures carry the context trail
fn transport_error(ctx: &ActionContext, e: reqwest::Error) -> Error {
    match Error::from(e) {
        Error::Transport(message) => Error::Transport(ctx.trail(message)),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ErrorKind;
    use crate::http::codec;
    use tokio::io::{AsyncWriteExt, BufReader};
    use tokio::net::TcpListener;

    /// Serve one canned response and hand back what was received
    async fn one_shot_server(
        response: codec::HttpResponse,
    ) -> (String, tokio::task::JoinHandle<codec::HttpRequest>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (reader, mut writer) = stream.into_split();
            let request = codec::read_request(&mut BufReader::new(reader)).await.unwrap();
            codec::write_response(&mut writer, &response).await.unwrap();
            request
        });
        (url, handle)
    }

    fn options(url: &str) -> RequestOptions {
        RequestOptions {
            url: url.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_rejects_bad_parameters() {
        let err = Request::new(options("localhost:8080")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);

        let mut bad_header = options("http://localhost/");
        bad_header.headers.insert("bad header".into(), "x".into());
        assert!(Request::new(bad_header).is_err());

        let method: std::result::Result<Method, _> = serde_yaml::from_str("PATCH");
        assert!(method.is_err());
    }

    #[tokio::test]
    async fn test_json_response_and_default_content_type() {
        let (url, server) = one_shot_server(codec::HttpResponse {
            status: 201,
            headers: vec![("Content-Type".into(), "application/json".into())],
            body: b"{\"id\":3}".to_vec(),
        })
        .await;

        let mut opts = options(&format!("{}/users?x=1", url));
        opts.method = Method::Post;
        opts.body = Some(serde_json::json!({"name": "ada"}));
        let ctx = Request::new(opts)
            .unwrap()
            .apply(ActionContext::new())
            .await
            .unwrap();

        assert_eq!(ctx.code, Some(201));
        assert_eq!(ctx.content, Some(Content::Json(serde_json::json!({"id": 3}))));
        assert_eq!(ctx.stack(), [format!("request {}/users?x=1", url)]);

        let received = server.await.unwrap();
        assert_eq!(received.method, "POST");
        assert_eq!(received.path(), "/users");
        assert_eq!(received.header("content-type"), Some("application/json"));
        assert_eq!(received.body, b"{\"name\":\"ada\"}");
    }

    #[tokio::test]
    async fn test_caller_headers_override_default() {
        let (url, server) = one_shot_server(codec::HttpResponse {
            status: 200,
            headers: Vec::new(),
            body: Vec::new(),
        })
        .await;

        let mut opts = options(&url);
        opts.method = Method::Put;
        opts.body = Some(Value::String("<a/>".into()));
        opts.headers
            .insert("Content-Type".into(), "text/xml".into());
        let ctx = Request::new(opts)
            .unwrap()
            .apply(ActionContext::new())
            .await
            .unwrap();
        assert_eq!(ctx.content, Some(Content::Text(String::new())));

        let received = server.await.unwrap();
        assert_eq!(received.header("content-type"), Some("text/xml"));
    }

    #[tokio::test]
    async fn test_redirects_not_followed_by_default() {
        let (url, _server) = one_shot_server(codec::HttpResponse {
            status: 302,
            headers: vec![("Location".into(), "/elsewhere".into())],
            body: Vec::new(),
        })
        .await;
        let ctx = Request::new(options(&url))
            .unwrap()
            .apply(ActionContext::new())
            .await
            .unwrap();
        assert_eq!(ctx.code, Some(302));
        assert_eq!(ctx.headers.unwrap()["location"], "/elsewhere");
    }

    #[tokio::test]
    async fn test_truncated_body_keeps_trail() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/", listener.local_addr().unwrap());
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (reader, mut writer) = stream.into_split();
            codec::read_request(&mut BufReader::new(reader)).await.unwrap();
            writer
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\nshort")
                .await
                .unwrap();
        });

        let err = Request::new(options(&url))
            .unwrap()
            .apply(ActionContext::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.to_string().contains(&format!("when request {}: ", url)), "{}", err);
    }

    #[tokio::test]
    async fn test_connection_refused_keeps_os_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = Request::new(options(&format!("http://{}/", addr)))
            .unwrap()
            .apply(ActionContext::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.to_string().contains("when request"));
    }
}
