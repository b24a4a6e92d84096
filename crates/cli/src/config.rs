use anyhow::Context as _;
use restbind_http_tools::ToolsConfig;
use std::path::Path;

/// Read and parse a tool configuration file (JSON or YAML).
///
/// `timeout_ms` overrides the file's `timeoutMs` when set.
pub fn load_config(path: &Path, timeout_ms: Option<u64>) -> anyhow::Result<ToolsConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("read config {}", path.display()))?;
    let mut cfg =
        ToolsConfig::parse(&content).with_context(|| format!("parse {}", path.display()))?;
    if timeout_ms.is_some() {
        cfg.timeout_ms = timeout_ms;
    }
    Ok(cfg)
}
