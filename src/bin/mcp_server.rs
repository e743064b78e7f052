/// MCP сервер поиска метаданных конфигураций 1С
///
/// Реализован через простой JSON-RPC протокол (по строке на сообщение в stdio)
/// без внешних MCP библиотек.
///
/// Поддерживает:
/// - Инициализацию протокола
/// - Получение списка инструментов
/// - Инструменты `metadatasearch` и `list_configurations`
///
/// Настройки берутся из окружения: INPUT_METADATA_DIR, DIST_METADATA_DIR,
/// METADATA_DEFAULT_LIMIT, METADATA_RESCAN_INTERVAL_SECS, METADATA_QUERY_TIMEOUT_MS.
use anyhow::{Context, Result};
use bsl_metadata::mcp_server::{self, McpError};
use bsl_metadata::{MetadataService, ServiceSettings};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, error, info};

#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    #[allow(dead_code)]
    jsonrpc: String,
    method: String,
    params: Option<Value>,
    /// Уведомления приходят без id
    #[serde(default)]
    id: Option<Value>,
}

#[derive(Debug, Serialize)]
struct JsonRpcResponse {
    jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
    id: Value,
}

#[derive(Debug, Serialize)]
struct JsonRpcError {
    code: i32,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl JsonRpcResponse {
    fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    fn failure(id: Value, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
            id,
        }
    }
}

pub struct MetadataMcpServer {
    service: Arc<MetadataService>,
}

impl MetadataMcpServer {
    pub fn new(service: MetadataService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }

    async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let Some(id) = request.id else {
            debug!("Notification: {}", request.method);
            return None;
        };

        let response = match request.method.as_str() {
            "initialize" => JsonRpcResponse::success(
                id,
                json!({
                    "protocolVersion": "2024-11-05",
                    "serverInfo": {
                        "name": "BSL Metadata Search",
                        "version": env!("CARGO_PKG_VERSION")
                    },
                    "capabilities": {
                        "tools": {}
                    }
                }),
            ),
            "tools/list" => JsonRpcResponse::success(id, mcp_server::tool_definitions()),
            "tools/call" => self.call_tool(id, request.params).await,
            "ping" => JsonRpcResponse::success(id, json!({})),
            other => JsonRpcResponse::failure(id, -32601, format!("Method not found: {}", other)),
        };
        Some(response)
    }

    async fn call_tool(&self, id: Value, params: Option<Value>) -> JsonRpcResponse {
        let params = params.unwrap_or_else(|| json!({}));
        let Some(tool_name) = params.get("name").and_then(Value::as_str).map(str::to_string) else {
            let error = McpError::InvalidParameter("missing tool name".to_string());
            return JsonRpcResponse::failure(id, error.code(), error.to_string());
        };
        let arguments = params.get("arguments").cloned().unwrap_or_else(|| json!({}));

        // Поиск и перестройка снимка блокирующие: выносим с реактора
        let service = Arc::clone(&self.service);
        let name = tool_name.clone();
        let outcome =
            tokio::task::spawn_blocking(move || mcp_server::call_tool(&service, &name, arguments))
                .await
                .map_err(|e| McpError::Internal(e.to_string()))
                .and_then(|result| result);

        match outcome {
            Ok(response) => JsonRpcResponse::success(
                id,
                json!({
                    "content": [{
                        "type": "text",
                        "text": mcp_server::render(&response)
                    }],
                    "isError": response.is_error()
                }),
            ),
            Err(e) => {
                error!("Tool '{}' failed: {}", tool_name, e);
                JsonRpcResponse::failure(id, e.code(), e.to_string())
            }
        }
    }

    async fn write_response(
        stdout: &mut tokio::io::Stdout,
        response: &JsonRpcResponse,
    ) -> Result<()> {
        let response_str = serde_json::to_string(response)?;
        stdout.write_all(response_str.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
        debug!("Sent: {}", response_str);
        Ok(())
    }

    pub async fn run(&self) -> Result<()> {
        let mut reader = BufReader::new(tokio::io::stdin());
        let mut stdout = tokio::io::stdout();

        let mut line = String::new();

        loop {
            line.clear();
            let n = reader.read_line(&mut line).await?;
            if n == 0 {
                break; // EOF
            }

            let message = line.trim();
            if message.is_empty() {
                continue;
            }

            debug!("Received: {}", message);

            match serde_json::from_str::<JsonRpcRequest>(message) {
                Ok(request) => {
                    if let Some(response) = self.handle_request(request).await {
                        Self::write_response(&mut stdout, &response).await?;
                    }
                }
                Err(e) => {
                    error!("Failed to parse request: {}", e);
                    let response = JsonRpcResponse::failure(Value::Null, -32700, "Parse error");
                    Self::write_response(&mut stdout, &response).await?;
                }
            }
        }

        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    bsl_metadata::cli_common::init_logging(tracing::Level::INFO)?;

    info!("Starting BSL Metadata MCP Server (JSON-RPC over stdio)...");

    let settings = ServiceSettings::from_env().context("Failed to read settings from environment")?;
    let service = tokio::task::spawn_blocking(move || MetadataService::open(settings))
        .await
        .context("Service initialization task failed")??;

    let server = MetadataMcpServer::new(service);
    info!("Server initialized. Waiting for JSON-RPC requests...");

    server.run().await
}
