//! MCP tool client: JSON-RPC 2.0 over streamable HTTP
//!
//! Handles the `initialize` handshake, session tracking and `tools/call`.
//! Servers may answer with plain JSON or with an `text/event-stream` body
//! carrying the JSON-RPC response in a `data:` frame.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, ACCEPT, CONTENT_TYPE};
use reqwest::Url;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, trace};

use super::{AccountContext, ToolClient, ToolClientFactory, ToolError, ToolResult, ToolService};

const SESSION_HEADER: &str = "mcp-session-id";
const PROTOCOL_VERSION: &str = "2025-03-26";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Tool client for one MCP server
///
/// The handshake runs lazily on the first call, so constructing a client
/// never touches the network.
pub struct McpHttpClient {
    http: reqwest::Client,
    endpoint: Url,
    bearer: String,
    session: OnceCell<Option<String>>,
    next_id: AtomicU64,
}

impl McpHttpClient {
    pub fn new(http: reqwest::Client, endpoint: &str, account: &AccountContext) -> Result<Self, ToolError> {
        let endpoint = Url::parse(endpoint).map_err(|e| ToolError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            http,
            endpoint,
            bearer: account.bearer_token().to_string(),
            session: OnceCell::new(),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }

    async fn session(&self) -> Result<Option<&str>, ToolError> {
        let session = self.session.get_or_try_init(|| self.initialize()).await?;
        Ok(session.as_deref())
    }

    async fn initialize(&self) -> Result<Option<String>, ToolError> {
        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION"),
            },
        });
        let (headers, _result) = self.request("initialize", params, None).await?;

        let session = headers
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        self.notify("notifications/initialized", session.as_deref()).await?;
        debug!(endpoint = %self.endpoint, has_session = session.is_some(), "MCP session initialized");
        Ok(session)
    }

    async fn request(
        &self,
        method: &str,
        params: Value,
        session: Option<&str>,
    ) -> Result<(HeaderMap, Value), ToolError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params });

        let resp = self.post(&body, session).await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ToolError::ServerError(status));
        }

        let headers = resp.headers().clone();
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let text = resp.text().await?;
        trace!(method, id, body = %text, "MCP response");

        let result = parse_rpc_response(&content_type, &text, id)?;
        Ok((headers, result))
    }

    async fn notify(&self, method: &str, session: Option<&str>) -> Result<(), ToolError> {
        let body = json!({ "jsonrpc": "2.0", "method": method });
        let resp = self.post(&body, session).await?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(ToolError::ServerError(resp.status()))
        }
    }

    async fn post(&self, body: &Value, session: Option<&str>) -> Result<reqwest::Response, ToolError> {
        let mut req = self
            .http
            .post(self.endpoint.clone())
            .bearer_auth(&self.bearer)
            .header(ACCEPT, "application/json, text/event-stream")
            .json(body);
        if let Some(session) = session {
            req = req.header(SESSION_HEADER, session);
        }
        Ok(req.send().await?)
    }
}

#[async_trait]
impl ToolClient for McpHttpClient {
    async fn call_tool(&self, tool_name: &str, arguments: Value) -> Result<ToolResult, ToolError> {
        let session = self.session().await?;
        let params = json!({ "name": tool_name, "arguments": arguments });
        let (_headers, result) = self.request("tools/call", params, session).await?;
        Ok(serde_json::from_value(result)?)
    }
}

/// Extract the `result` of the JSON-RPC response with the given id
fn parse_rpc_response(content_type: &str, body: &str, id: u64) -> Result<Value, ToolError> {
    if content_type.starts_with("text/event-stream") {
        for payload in sse_data_payloads(body) {
            let message: Value = serde_json::from_str(&payload)?;
            if message.get("id").and_then(Value::as_u64) == Some(id) {
                return unwrap_rpc(message);
            }
        }
        return Err(ToolError::UnexpectedResult(format!(
            "no response for request {id} in event stream"
        )));
    }

    unwrap_rpc(serde_json::from_str(body)?)
}

fn unwrap_rpc(mut message: Value) -> Result<Value, ToolError> {
    if let Some(error) = message.get("error") {
        return Err(ToolError::Rpc {
            code: error.get("code").and_then(Value::as_i64).unwrap_or_default(),
            message: error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string(),
        });
    }
    message
        .get_mut("result")
        .map(Value::take)
        .ok_or_else(|| ToolError::UnexpectedResult("response has neither result nor error".to_string()))
}

/// Joined `data:` lines of each event in an event-stream body
fn sse_data_payloads(body: &str) -> Vec<String> {
    let mut payloads = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in body.lines() {
        if line.is_empty() {
            if !current.is_empty() {
                payloads.push(current.join("\n"));
                current.clear();
            }
        } else if let Some(data) = line.strip_prefix("data:") {
            current.push(data.strip_prefix(' ').unwrap_or(data));
        }
    }
    if !current.is_empty() {
        payloads.push(current.join("\n"));
    }
    payloads
}

/// Builds one `McpHttpClient` per service, sharing a connection pool
#[derive(Clone)]
pub struct McpClientFactory {
    http: reqwest::Client,
}

impl McpClientFactory {
    pub fn new() -> Result<Self, ToolError> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl ToolClientFactory for McpClientFactory {
    async fn connect(
        &self,
        service: &ToolService,
        account: &AccountContext,
    ) -> Result<Arc<dyn ToolClient>, ToolError> {
        let client = McpHttpClient::new(self.http.clone(), &service.endpoint, account)?;
        Ok(Arc::new(client))
    }
}
