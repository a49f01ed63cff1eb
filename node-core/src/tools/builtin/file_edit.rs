//! File-edit tool: always requires confirmation.

use async_trait::async_trait;

use crate::error::ToolError;
use crate::tools::{Tool, ToolDefinition};

#[derive(Default)]
pub struct FileEditTool;

#[async_trait]
impl Tool for FileEditTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "file_edit".to_string(),
            description: "Overwrite a file with new content".to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "path": {"type": "string"},
                    "content": {"type": "string"}
                },
                "required": ["path", "content"]
            }),
        }
    }

    async fn execute(&self, args: serde_json::Value) -> Result<String, ToolError> {
        let path = args
            .get("path")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::InvalidArguments("missing `path`".to_string()))?;
        let content = args
            .get("content")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::InvalidArguments("missing `content`".to_string()))?;

        tokio::fs::write(path, content)
            .await
            .map_err(|e| ToolError::Execution(e.to_string()))?;
        Ok(format!("wrote {} bytes to {}", content.len(), path))
    }

    fn requires_confirmation(&self, _args: &serde_json::Value) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn always_requires_confirmation() {
        let tool = FileEditTool;
        assert!(tool.requires_confirmation(&serde_json::json!({})));
    }

    #[tokio::test]
    async fn execute_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let tool = FileEditTool;
        tool.execute(serde_json::json!({"path": path.to_str().unwrap(), "content": "hi"}))
            .await
            .unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hi");
    }
}
