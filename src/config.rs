use crate::error::EvalError;
use crate::tools::{builtin_tools, ToolRegistry, ToolSpec};
use crate::Args;
use encoding_rs::Encoding;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Evaluation configuration, built once at startup
#[derive(Debug, Clone)]
pub struct Config {
    pub encoding: &'static Encoding,
    pub registry: ToolRegistry,
    /// File the tool table was loaded from, if any
    pub tools_source: Option<PathBuf>,
}

/// On-disk tool table
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ToolsFile {
    default_tool: Option<String>,
    #[serde(default)]
    tools: Vec<ToolSpec>,
}

impl TryFrom<&Args> for Config {
    type Error = EvalError;

    fn try_from(args: &Args) -> Result<Self, Self::Error> {
        let encoding = Encoding::for_label(args.encoding.trim().as_bytes())
            .ok_or_else(|| EvalError::Config(format!("unknown encoding `{}`", args.encoding)))?;

        let tools_source = match &args.tools_config {
            Some(path) => Some(path.clone()),
            None => default_tools_path().filter(|p| p.is_file()),
        };

        let registry = match &tools_source {
            Some(path) => load_registry(path)?,
            None => ToolRegistry::builtin(),
        };

        Ok(Self {
            encoding,
            registry,
            tools_source,
        })
    }
}

/// `<config dir>/ocr-eval/tools.toml`
fn default_tools_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("ocr-eval").join("tools.toml"))
}

/// Load a tool table; an empty `tools` list keeps the built-in tools
pub fn load_registry(path: &Path) -> Result<ToolRegistry, EvalError> {
    let contents = std::fs::read_to_string(path).map_err(|e| EvalError::read(path, e))?;
    parse_registry(&contents).map_err(|e| match e {
        EvalError::Config(msg) => EvalError::Config(format!("{}: {}", path.display(), msg)),
        other => other,
    })
}

fn parse_registry(contents: &str) -> Result<ToolRegistry, EvalError> {
    let file: ToolsFile =
        toml::from_str(contents).map_err(|e| EvalError::Config(e.message().to_string()))?;

    let tools = if file.tools.is_empty() {
        builtin_tools()
    } else {
        file.tools
    };

    ToolRegistry::new(tools, file.default_tool)
}
