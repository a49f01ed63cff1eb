//! Shell-execution tool: treats a specific set of command patterns as
//! requiring confirmation. Pattern-based and incomplete by design; a speed
//! bump, not a security boundary.

use async_trait::async_trait;
use regex::Regex;
use tokio::process::Command;

use crate::error::ToolError;
use crate::tools::{Tool, ToolDefinition};

pub struct BashTool {
    dangerous_patterns: Vec<Regex>,
}

impl Default for BashTool {
    fn default() -> Self {
        let patterns = [
            r"\brm\s+(-[a-zA-Z]*r[a-zA-Z]*f|-[a-zA-Z]*f[a-zA-Z]*r)\s+\S",
            r"\bsudo\b",
            r"\b(systemctl|service)\s+(stop|restart|disable|start)\b",
            r"\b(reboot|shutdown|halt|poweroff)\b",
            r"\bdd\s+.*\bof=/dev/",
            r":\(\)\s*\{\s*:\s*\|\s*:\s*&\s*\}\s*;\s*:",
            r"\bchmod\s+777\b",
            r"\bchown\s+root\b",
            r">\s*/dev/(sd|nvme|hd)",
        ];
        Self {
            dangerous_patterns: patterns
                .iter()
                .map(|p| Regex::new(p).expect("static dangerous-command pattern"))
                .collect(),
        }
    }
}

#[async_trait]
impl Tool for BashTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "bash".to_string(),
            description: "Execute a shell command and return combined stdout/stderr".to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "command": {"type": "string", "description": "The shell command to run"}
                },
                "required": ["command"]
            }),
        }
    }

    async fn execute(&self, args: serde_json::Value) -> Result<String, ToolError> {
        let command = args
            .get("command")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::InvalidArguments("missing `command`".to_string()))?;

        let output = Command::new("sh")
            .arg("-c")
            .arg(command)
            .output()
            .await
            .map_err(|e| ToolError::Execution(e.to_string()))?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(combined)
    }

    fn requires_confirmation(&self, args: &serde_json::Value) -> bool {
        let Some(command) = args.get("command").and_then(|v| v.as_str()) else {
            return false;
        };
        self.dangerous_patterns.iter().any(|p| p.is_match(command))
    }
}
