//! OCR tool registry
//!
//! Each tool the evaluation knows about is a row in a table: its name, the
//! directory its outputs are collected in, and the rule that pulls text out
//! of its JSON. Supporting a new tool means adding a row here or in the
//! tools config file.

use crate::error::EvalError;
use crate::extract::ExtractionRule;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One OCR tool and how to read its output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    /// Directory holding this tool's outputs, relative to the working dir
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,
    #[serde(default)]
    pub rule: ExtractionRule,
}

impl ToolSpec {
    pub fn new(name: &str, rule: ExtractionRule) -> Self {
        Self {
            name: name.to_string(),
            output_dir: None,
            rule,
        }
    }

    /// Output directory, falling back to the `_<name>_json` convention
    pub fn output_dir(&self) -> String {
        self.output_dir
            .clone()
            .unwrap_or_else(|| format!("_{}_json", self.name))
    }
}

/// Tools shipped with the evaluator
pub fn builtin_tools() -> Vec<ToolSpec> {
    vec![
        ToolSpec::new("docling", ExtractionRule::field(&["ocr-result"])),
        ToolSpec::new("marker", ExtractionRule::escaped_field(&["ocr-result"])),
        ToolSpec::new("paddleocr", ExtractionRule::Root),
        ToolSpec::new("kreuzberg", ExtractionRule::field(&["ocr-result"])),
    ]
}

pub const DEFAULT_TOOL: &str = "marker";

/// Registry of configured OCR tools
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    tools: Vec<ToolSpec>,
    default_tool: String,
}

impl ToolRegistry {
    pub fn new(tools: Vec<ToolSpec>, default_tool: Option<String>) -> Result<Self, EvalError> {
        if tools.is_empty() {
            return Err(EvalError::Config("no OCR tools configured".to_string()));
        }

        for (i, tool) in tools.iter().enumerate() {
            if tool.name.trim().is_empty() {
                return Err(EvalError::Config("tool name must not be empty".to_string()));
            }
            if tools[..i].iter().any(|t| t.name == tool.name) {
                return Err(EvalError::Config(format!(
                    "tool `{}` is configured twice",
                    tool.name
                )));
            }
        }

        let default_tool = match default_tool {
            Some(name) if tools.iter().any(|t| t.name == name) => name,
            Some(name) => return Err(EvalError::UnknownTool(name)),
            None if tools.iter().any(|t| t.name == DEFAULT_TOOL) => DEFAULT_TOOL.to_string(),
            None => tools[0].name.clone(),
        };

        Ok(Self {
            tools,
            default_tool,
        })
    }

    pub fn builtin() -> Self {
        Self {
            tools: builtin_tools(),
            default_tool: DEFAULT_TOOL.to_string(),
        }
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<&ToolSpec> {
        self.tools.iter().find(|t| t.name == name)
    }

    /// Get the default tool
    pub fn default(&self) -> &ToolSpec {
        self.get(&self.default_tool)
            .unwrap_or(&self.tools[0])
    }

    pub fn default_name(&self) -> &str {
        &self.default_tool
    }

    /// List all tool names
    pub fn list(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn tools(&self) -> &[ToolSpec] {
        &self.tools
    }

    /// Infer the tool from a path, e.g. `run/_marker_json/doc.json` → marker
    ///
    /// Matches a path component equal to a tool's output directory first,
    /// then any component containing a tool name.
    pub fn infer(&self, path: &Path) -> Option<&ToolSpec> {
        let components: Vec<String> = path
            .parent()
            .into_iter()
            .flat_map(|p| p.components())
            .map(|c| c.as_os_str().to_string_lossy().to_lowercase())
            .collect();

        self.tools
            .iter()
            .find(|t| components.iter().any(|c| *c == t.output_dir().to_lowercase()))
            .or_else(|| {
                self.tools.iter().find(|t| {
                    let name = t.name.to_lowercase();
                    components.iter().any(|c| c.contains(&name))
                })
            })
    }

    /// Pick the tool for a file: explicit name, then inferred, then default
    pub fn resolve(&self, explicit: Option<&str>, path: &Path) -> Result<&ToolSpec, EvalError> {
        if let Some(name) = explicit {
            return self
                .get(name)
                .ok_or_else(|| EvalError::UnknownTool(name.to_string()));
        }

        match self.infer(path) {
            Some(tool) => Ok(tool),
            None => {
                tracing::debug!(
                    "No tool inferred from {}, using default {}",
                    path.display(),
                    self.default_tool
                );
                Ok(self.default())
            }
        }
    }

    /// Select tools by name; an empty selection means all tools
    pub fn select(&self, names: &[String]) -> Result<Vec<&ToolSpec>, EvalError> {
        if names.is_empty() {
            return Ok(self.tools.iter().collect());
        }

        names
            .iter()
            .map(|name| {
                self.get(name)
                    .ok_or_else(|| EvalError::UnknownTool(name.clone()))
            })
            .collect()
    }
}
