/// <module>
///   <name>tools</name>
///   <purpose>Реализация MCP инструментов поиска метаданных</purpose>
/// </module>
use schemars::schema_for;
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Instant;
use tracing::{debug, info};

use crate::core::SearchError;
use crate::mcp_server::types::{
    ListConfigurationsParams, McpError, McpResult, MetadataSearchParams, ToolResponse, ToolStatus,
};
use crate::resolver::{format_configs_info, ConfigCandidate};
use crate::search::SearchResult;
use crate::service::{MetadataQuery, MetadataService};

pub const METADATA_SEARCH_TOOL: &str = "metadatasearch";
pub const LIST_CONFIGURATIONS_TOOL: &str = "list_configurations";

/// <function>
///   <name>tool_definitions</name>
///   <purpose>Описание инструментов для tools/list; схемы генерируются schemars</purpose>
/// </function>
pub fn tool_definitions() -> Value {
    json!({
        "tools": [
            {
                "name": METADATA_SEARCH_TOOL,
                "description": "Поиск объекта метаданных 1С (справочник, документ, регистр, перечисление) \
                    по полному имени, имени или синониму. Возвращает реквизиты и табличные части. \
                    Параметр config выбирает конфигурацию по имени файла, Имени или Синониму.",
                "inputSchema": schema_for!(MetadataSearchParams),
            },
            {
                "name": LIST_CONFIGURATIONS_TOOL,
                "description": "Список загруженных конфигураций и файлов, которые не удалось загрузить",
                "inputSchema": schema_for!(ListConfigurationsParams),
            }
        ]
    })
}

/// Вызов инструмента по имени. Ошибка - только для неизвестного инструмента;
/// всё остальное возвращается статусом в ответе.
pub fn call_tool(service: &MetadataService, name: &str, arguments: Value) -> McpResult<ToolResponse> {
    match name {
        METADATA_SEARCH_TOOL => match serde_json::from_value::<MetadataSearchParams>(arguments) {
            Ok(params) => Ok(metadatasearch_impl(service, params)),
            Err(e) => Ok(ToolResponse::new(ToolStatus::InvalidArgument, Value::Null)
                .with_message(format!("Некорректные аргументы: {}", e))),
        },
        LIST_CONFIGURATIONS_TOOL => Ok(list_configurations_impl(service)),
        other => Err(McpError::UnknownTool(other.to_string())),
    }
}

pub fn metadatasearch_impl(service: &MetadataService, params: MetadataSearchParams) -> ToolResponse {
    let start = Instant::now();
    let limit = match params.limit() {
        Ok(limit) => limit,
        Err(message) => {
            return ToolResponse::new(ToolStatus::InvalidArgument, Value::Null).with_message(message)
        }
    };

    let query = MetadataQuery {
        query: params.query,
        config: params.config,
        limit,
        find_usages: params.find_usages,
    };

    let response = match service.search(&query) {
        Ok(result) => from_search_result(result),
        Err(error) => from_search_error(error),
    };

    info!(
        "metadatasearch '{}' -> {:?} in {:?}",
        query.query,
        response.status,
        start.elapsed()
    );
    response
}

pub fn list_configurations_impl(service: &MetadataService) -> ToolResponse {
    let report = service.load_report();
    let summaries = service.config_summaries();
    debug!("Listing {} configurations", summaries.len());

    let message = if summaries.is_empty() {
        Some(no_configurations_message(service))
    } else {
        None
    };

    let response = serialized(
        ToolStatus::Success,
        json!({
            "configs": summaries,
            "failed": report.failed,
        }),
    );
    match message {
        Some(message) => response.with_message(message),
        None => response,
    }
}

fn serialized(status: ToolStatus, value: impl Serialize) -> ToolResponse {
    match serde_json::to_value(value) {
        Ok(value) => ToolResponse::new(status, value),
        Err(e) => ToolResponse::new(ToolStatus::Error, Value::Null)
            .with_message(format!("Ошибка сериализации результата: {}", e)),
    }
}

fn guidance(message: &str, candidates: &[ConfigCandidate]) -> String {
    format!("{}\n\n{}", message, format_configs_info(candidates))
}

fn no_configurations_message(service: &MetadataService) -> String {
    format!(
        "Не найдены конфигурации. Поместите *.json в каталог {}",
        service.settings().input_dir.display()
    )
}

/// Перевод результата поиска в статус инструмента с текстом-подсказкой
pub fn from_search_result(result: SearchResult) -> ToolResponse {
    match result {
        SearchResult::Matches(hits) => serialized(ToolStatus::Success, hits),
        SearchResult::NoMatch => ToolResponse::new(ToolStatus::NoMatch, Value::Null)
            .with_message("Объекты метаданных по запросу не найдены"),
        SearchResult::Ambiguous {
            selector,
            candidates,
        } => {
            let message = match &selector {
                None => "Найдено несколько конфигураций. Укажите параметр 'config' (имя файла без расширения)".to_string(),
                Some(selector) => format!(
                    "Найдено несколько конфигураций по параметру '{}'. Уточните параметр 'config'",
                    selector
                ),
            };
            serialized(ToolStatus::Ambiguous, json!({ "candidates": candidates }))
                .with_message(guidance(&message, &candidates))
        }
        SearchResult::ConfigNotFound {
            selector,
            available,
        } => {
            let message = match &selector {
                None => "Не найдены конфигурации.".to_string(),
                Some(selector) => format!("Конфигурация по параметру '{}' не найдена.", selector),
            };
            serialized(ToolStatus::ConfigNotFound, json!({ "available": available }))
                .with_message(guidance(&message, &available))
        }
    }
}

pub fn from_search_error(error: SearchError) -> ToolResponse {
    let status = match &error {
        SearchError::InvalidArgument(_) => ToolStatus::InvalidArgument,
        SearchError::NotImplemented(_) => ToolStatus::NotImplemented,
        SearchError::TimedOut | SearchError::Load(_) => ToolStatus::Error,
    };
    ToolResponse::new(status, Value::Null).with_message(error.to_string())
}

/// Текст ответа инструмента
pub fn render(response: &ToolResponse) -> String {
    serde_json::to_string_pretty(response).unwrap_or_else(|e| {
        format!("{{\"status\": \"error\", \"message\": \"{}\"}}", e)
    })
}
