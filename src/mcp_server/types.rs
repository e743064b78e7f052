/// <module>
///   <name>types</name>
///   <purpose>Типы данных MCP-инструментов поиска метаданных</purpose>
/// </module>
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// <type>
///   <name>McpResult</name>
///   <purpose>Результат выполнения MCP операций</purpose>
/// </type>
pub type McpResult<T> = Result<T, McpError>;

/// <type>
///   <name>McpError</name>
///   <purpose>Ошибки уровня протокола (не статусы поиска)</purpose>
/// </type>
#[derive(Error, Debug)]
pub enum McpError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl McpError {
    /// Код ошибки JSON-RPC
    pub fn code(&self) -> i32 {
        match self {
            McpError::UnknownTool(_) => -32601,
            McpError::InvalidParameter(_) => -32602,
            McpError::Internal(_) => -32603,
        }
    }
}

/// <type>
///   <name>MetadataSearchParams</name>
///   <purpose>Аргументы инструмента metadatasearch</purpose>
/// </type>
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct MetadataSearchParams {
    /// Имя объекта: `Справочник.Номенклатура`, `Документы.Счет`, `Номенклатура`
    pub query: String,
    /// Поиск использований (зарезервировано)
    #[serde(default)]
    pub find_usages: bool,
    /// Максимальное число результатов, по умолчанию 5
    #[serde(default)]
    pub limit: Option<Value>,
    /// Конфигурация: имя файла, Имя или Синоним
    #[serde(default)]
    pub config: Option<String>,
}

impl MetadataSearchParams {
    /// Лимит как целое число. Дробные и нечисловые значения отвергаются.
    pub fn limit(&self) -> Result<Option<i64>, String> {
        match &self.limit {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(number)) => number
                .as_i64()
                .map(Some)
                .ok_or_else(|| format!("limit must be an integer, got {}", number)),
            Some(Value::String(text)) => text
                .trim()
                .parse::<i64>()
                .map(Some)
                .map_err(|_| format!("limit must be an integer, got '{}'", text)),
            Some(other) => Err(format!("limit must be an integer, got {}", other)),
        }
    }
}

/// <type>
///   <name>ListConfigurationsParams</name>
///   <purpose>Аргументы инструмента list_configurations (пусто)</purpose>
/// </type>
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct ListConfigurationsParams {}

/// <type>
///   <name>ToolStatus</name>
///   <purpose>Статус ответа инструмента</purpose>
/// </type>
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    Success,
    NoMatch,
    Ambiguous,
    ConfigNotFound,
    InvalidArgument,
    NotImplemented,
    Error,
}

/// <type>
///   <name>ToolResponse</name>
///   <purpose>JSON-ответ инструмента: статус, подсказка и данные</purpose>
/// </type>
#[derive(Debug, Clone, Serialize)]
pub struct ToolResponse {
    pub status: ToolStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub result: Value,
}

impl ToolResponse {
    pub fn new(status: ToolStatus, result: Value) -> Self {
        Self {
            status,
            message: None,
            result,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn is_error(&self) -> bool {
        matches!(self.status, ToolStatus::InvalidArgument | ToolStatus::Error)
    }
}
