// src/content.rs

use serde::Serialize;

use crate::errors::Result;

/// Code produced for a virtual module, with an optional source map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleContent {
    pub code: String,
    pub map: Option<String>,
}

impl ModuleContent {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            map: None,
        }
    }

    pub fn with_map(mut self, map: impl Into<String>) -> Self {
        self.map = Some(map.into());
        self
    }
}

impl From<String> for ModuleContent {
    fn from(code: String) -> Self {
        ModuleContent::new(code)
    }
}

impl From<&str> for ModuleContent {
    fn from(code: &str) -> Self {
        ModuleContent::new(code)
    }
}

/// Render serializable `data` as a module whose default export is `data`.
///
/// The output has the form `export default JSON.parse("...");` where the
/// argument is the JSON text encoded as a string literal. `serde_json`
/// escapes quotes, backslashes and control characters; U+2028 and U+2029 are
/// escaped as well since older parsers reject them inside string literals.
pub fn to_content_module<T: Serialize + ?Sized>(data: &T) -> Result<String> {
    let json = serde_json::to_string(data)?;
    let literal = serde_json::to_string(&json)?
        .replace('\u{2028}', "\\u2028")
        .replace('\u{2029}', "\\u2029");
    Ok(format!("export default JSON.parse({literal});"))
}
