#![allow(dead_code)]

pub use virtmod_test_utils::builders;
pub use virtmod_test_utils::fakes;
pub use virtmod_test_utils::{init_tracing, with_timeout};

use serde_json::Value;

/// Decode the default export of a module produced by `to_content_module`.
pub fn decode_content_module(code: &str) -> Value {
    let literal = code
        .strip_prefix("export default JSON.parse(")
        .and_then(|rest| rest.strip_suffix(");"))
        .unwrap_or_else(|| panic!("not a content module: {code}"));
    let json: String = serde_json::from_str(literal).expect("argument is a JSON string literal");
    serde_json::from_str(&json).expect("literal holds JSON text")
}
