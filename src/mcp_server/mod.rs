/// <module>
///   <name>mcp_server</name>
///   <purpose>Инструменты MCP для поиска метаданных конфигураций 1С</purpose>
///   <description>
///     Тонкий слой над MetadataService: разбор аргументов, перевод результатов
///     поиска в статусы и тексты-подсказки для LLM.
///   </description>
/// </module>
mod tools;
mod types;

pub use tools::{
    call_tool, from_search_error, from_search_result, list_configurations_impl,
    metadatasearch_impl, render, tool_definitions, LIST_CONFIGURATIONS_TOOL, METADATA_SEARCH_TOOL,
};
pub use types::{
    ListConfigurationsParams, McpError, McpResult, MetadataSearchParams, ToolResponse, ToolStatus,
};
