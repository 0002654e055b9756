mod common;
use crate::common::{decode_content_module, init_tracing};

use proptest::prelude::*;
use serde_json::{json, Value};

use virtmod::{to_content_module, ModuleContent};

#[test]
fn exports_the_value_through_json_parse() {
    init_tracing();
    let code = to_content_module(&json!({ "a": 1 })).unwrap();
    assert_eq!(code, r#"export default JSON.parse("{\"a\":1}");"#);
}

#[test]
fn empty_object_and_array_survive() {
    assert_eq!(decode_content_module(&to_content_module(&json!({})).unwrap()), json!({}));
    assert_eq!(decode_content_module(&to_content_module(&json!([])).unwrap()), json!([]));
}

#[test]
fn quotes_backslashes_and_newlines_are_escaped() {
    let data = json!({
        "quote": "she said \"hi\"",
        "path": "C:\\tmp\\x",
        "multi": "line1\nline2\r\n\ttabbed",
        "close": "</script>",
    });
    let code = to_content_module(&data).unwrap();
    assert!(!code.contains('\n'));
    assert_eq!(decode_content_module(&code), data);
}

#[test]
fn line_and_paragraph_separators_are_escaped() {
    let data = json!({ "s": "a\u{2028}b\u{2029}c" });
    let code = to_content_module(&data).unwrap();
    assert!(!code.contains('\u{2028}'));
    assert!(!code.contains('\u{2029}'));
    assert!(code.contains("\\u2028"));
    assert_eq!(decode_content_module(&code), data);
}

#[test]
fn serializable_structs_are_accepted() {
    #[derive(serde::Serialize)]
    struct Author<'a> {
        name: &'a str,
        books: u32,
    }

    let code = to_content_module(&[Author { name: "Ada", books: 1 }]).unwrap();
    assert_eq!(
        decode_content_module(&code),
        json!([{ "name": "Ada", "books": 1 }])
    );
}

#[test]
fn module_content_conversions() {
    let from_str: ModuleContent = "export default 1;".into();
    assert_eq!(from_str.code, "export default 1;");
    assert_eq!(from_str.map, None);

    let with_map = ModuleContent::new(String::from("x")).with_map("{}");
    assert_eq!(with_map.map.as_deref(), Some("{}"));
}

fn json_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        any::<String>().prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 32, 6, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            proptest::collection::btree_map(any::<String>(), inner, 0..6)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

proptest! {
    #[test]
    fn evaluating_the_literal_yields_the_same_value(value in json_value()) {
        let code = to_content_module(&value).unwrap();
        prop_assert!(code.starts_with("export default JSON.parse(\""));
        prop_assert!(code.ends_with("\");"));
        prop_assert_eq!(decode_content_module(&code), value);
    }
}
