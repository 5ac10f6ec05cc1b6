use std::{fs, path::Path};

use serde_yaml::Value;

/// Reads and parses a YAML document. Errors carry the path for logging.
pub fn load_yaml(path: &Path) -> Result<Value, String> {
    let txt = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    parse_yaml(&txt).map_err(|e| format!("Failed to parse {}: {e}", path.display()))
}

pub fn parse_yaml(txt: &str) -> Result<Value, String> {
    serde_yaml::from_str::<Value>(txt).map_err(|e| e.to_string())
}
