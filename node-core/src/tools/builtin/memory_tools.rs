//! `memory_write`, `memory_read`, `memory_search`, `memory_update`, `memory_delete`:
//! thin wrappers over C2's operations.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ToolError;
use crate::memory::{MemoryCategory, MemoryPatch, MemoryStoreHandle, ReadFilter};
use crate::tools::{Tool, ToolDefinition};

fn parse_category(v: Option<&serde_json::Value>) -> Result<Option<MemoryCategory>, ToolError> {
    match v.and_then(|v| v.as_str()) {
        None => Ok(None),
        Some(s) => serde_json::from_value(serde_json::Value::String(s.to_string()))
            .map(Some)
            .map_err(|_| ToolError::InvalidArguments(format!("invalid category: {}", s))),
    }
}

pub struct MemoryWriteTool(pub Arc<MemoryStoreHandle>);

#[async_trait]
impl Tool for MemoryWriteTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "memory_write".to_string(),
            description: "Store a new local memory".to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "category": {"type": "string", "enum": ["learning", "solution", "observation", "note"]},
                    "title": {"type": "string"},
                    "content": {"type": "string"},
                    "tags": {"type": "array", "items": {"type": "string"}},
                    "context": {"type": "string"},
                    "ttl": {"type": "integer"}
                },
                "required": ["category", "title", "content"]
            }),
        }
    }

    async fn execute(&self, args: serde_json::Value) -> Result<String, ToolError> {
        let category = parse_category(args.get("category"))?
            .ok_or_else(|| ToolError::InvalidArguments("missing `category`".to_string()))?;
        let title = args
            .get("title")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::InvalidArguments("missing `title`".to_string()))?
            .to_string();
        let content = args
            .get("content")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::InvalidArguments("missing `content`".to_string()))?
            .to_string();
        let tags: HashSet<String> = args
            .get("tags")
            .and_then(|v| v.as_array())
            .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default();
        let context = args.get("context").and_then(|v| v.as_str()).map(str::to_string);
        let ttl = args.get("ttl").and_then(|v| v.as_i64());

        let memory = self.0.write(category, title, content, tags, context, ttl).await;
        serde_json::to_string(&memory).map_err(|e| ToolError::Execution(e.to_string()))
    }
}

pub struct MemoryReadTool(pub Arc<MemoryStoreHandle>);

#[async_trait]
impl Tool for MemoryReadTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "memory_read".to_string(),
            description: "Read memories, optionally filtered by category/tags/source".to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "category": {"type": "string"},
                    "tags": {"type": "array", "items": {"type": "string"}},
                    "source": {"type": "string"},
                    "limit": {"type": "integer"},
                    "include_shared": {"type": "boolean"}
                }
            }),
        }
    }

    async fn execute(&self, args: serde_json::Value) -> Result<String, ToolError> {
        let category = parse_category(args.get("category"))?;
        let tags = args
            .get("tags")
            .and_then(|v| v.as_array())
            .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect());
        let source = args.get("source").and_then(|v| v.as_str()).map(str::to_string);
        let limit = args.get("limit").and_then(|v| v.as_u64()).map(|v| v as usize);
        let include_shared = args
            .get("include_shared")
            .and_then(|v| v.as_bool())
            .unwrap_or(true);

        let memories = self
            .0
            .read(ReadFilter {
                category,
                tags,
                source,
                limit,
                include_shared,
            })
            .await;
        serde_json::to_string(&memories).map_err(|e| ToolError::Execution(e.to_string()))
    }
}

pub struct MemorySearchTool(pub Arc<MemoryStoreHandle>);

#[async_trait]
impl Tool for MemorySearchTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "memory_search".to_string(),
            description: "Case-insensitive substring search over title/content/tags/context".to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string"},
                    "category": {"type": "string"},
                    "limit": {"type": "integer"},
                    "include_shared": {"type": "boolean"}
                },
                "required": ["query"]
            }),
        }
    }

    async fn execute(&self, args: serde_json::Value) -> Result<String, ToolError> {
        let query = args
            .get("query")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::InvalidArguments("missing `query`".to_string()))?;
        let category = parse_category(args.get("category"))?;
        let limit = args.get("limit").and_then(|v| v.as_u64()).unwrap_or(5) as usize;
        let include_shared = args
            .get("include_shared")
            .and_then(|v| v.as_bool())
            .unwrap_or(true);

        let memories = self.0.search(query, category, limit, include_shared).await;
        serde_json::to_string(&memories).map_err(|e| ToolError::Execution(e.to_string()))
    }
}

pub struct MemoryUpdateTool(pub Arc<MemoryStoreHandle>);

#[async_trait]
impl Tool for MemoryUpdateTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "memory_update".to_string(),
            description: "Update a local memory by id".to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "id": {"type": "string"},
                    "title": {"type": "string"},
                    "content": {"type": "string"},
                    "tags": {"type": "array", "items": {"type": "string"}},
                    "context": {"type": "string"},
                    "ttl": {"type": "integer"}
                },
                "required": ["id"]
            }),
        }
    }

    async fn execute(&self, args: serde_json::Value) -> Result<String, ToolError> {
        let id = args
            .get("id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::InvalidArguments("missing `id`".to_string()))?;

        let patch = MemoryPatch {
            title: args.get("title").and_then(|v| v.as_str()).map(str::to_string),
            content: args.get("content").and_then(|v| v.as_str()).map(str::to_string),
            tags: args.get("tags").and_then(|v| v.as_array()).map(|a| {
                a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect()
            }),
            context: args.get("context").and_then(|v| v.as_str()).map(str::to_string),
            ttl: args.get("ttl").map(|v| v.as_i64()),
        };

        match self.0.update(id, patch).await {
            Ok(memory) => serde_json::to_string(&memory).map_err(|e| ToolError::Execution(e.to_string())),
            Err(e) => Err(ToolError::Execution(e.to_string())),
        }
    }
}

pub struct MemoryDeleteTool(pub Arc<MemoryStoreHandle>);

#[async_trait]
impl Tool for MemoryDeleteTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "memory_delete".to_string(),
            description: "Delete a local memory by id".to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {"id": {"type": "string"}},
                "required": ["id"]
            }),
        }
    }

    async fn execute(&self, args: serde_json::Value) -> Result<String, ToolError> {
        let id = args
            .get("id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::InvalidArguments("missing `id`".to_string()))?;
        let deleted = self.0.delete(id).await;
        Ok(serde_json::json!({"deleted": deleted}).to_string())
    }
}
