use serde_json::Value;

/// Name-based navigation over a parsed JSON tree.
pub trait JsonNodeExt {
    /// Child property `name`, or `None` when absent or when this is not an object.
    fn get_field(&self, name: &str) -> Option<&Value>;

    /// Like [`get_field`](Self::get_field) but yields `null` instead of `None`.
    fn path(&self, name: &str) -> &Value;

    /// Textual value: strings unquoted, scalars in their JSON spelling,
    /// containers as an empty string.
    fn as_text(&self) -> String;

    /// First property called `name` anywhere below this node, depth first.
    fn find_value(&self, name: &str) -> Option<&Value>;

    fn field_names(&self) -> Vec<&str>;
}

impl JsonNodeExt for Value {
    fn get_field(&self, name: &str) -> Option<&Value> {
        self.as_object()?.get(name)
    }

    fn path(&self, name: &str) -> &Value {
        &self[name]
    }

    fn as_text(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Null => "null".to_string(),
            Value::Array(_) | Value::Object(_) => String::new(),
        }
    }

    fn find_value(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Object(fields) => fields
                .get(name)
                .or_else(|| fields.values().find_map(|child| child.find_value(name))),
            Value::Array(items) => items.iter().find_map(|item| item.find_value(name)),
            _ => None,
        }
    }

    fn field_names(&self) -> Vec<&str> {
        self.as_object()
            .map(|fields| fields.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_field() {
        let node = json!({"color": "Black", "type": "FIAT"});
        assert_eq!(node.get_field("color").map(JsonNodeExt::as_text), Some("Black".to_string()));
        assert!(node.get_field("year").is_none());
        assert!(json!(["color"]).get_field("color").is_none());
    }

    #[test]
    fn test_path_never_panics() {
        let node = json!({"car": {"color": "Red"}});
        assert_eq!(node.path("car").path("color").as_text(), "Red");
        assert!(node.path("missing").path("color").is_null());
        assert!(json!(42).path("anything").is_null());
    }

    #[test]
    fn test_as_text() {
        assert_eq!(json!("1970").as_text(), "1970");
        assert_eq!(json!(1970).as_text(), "1970");
        assert_eq!(json!(2.5).as_text(), "2.5");
        assert_eq!(json!(true).as_text(), "true");
        assert_eq!(Value::Null.as_text(), "null");
        assert_eq!(json!({"a": 1}).as_text(), "");
        assert_eq!(json!([1, 2]).as_text(), "");
    }

    #[test]
    fn test_find_value_searches_nested() {
        let node = json!({
            "car": {"color": "yellow", "type": "renault"},
            "owners": [{"name": "Ada"}, {"name": "Grace"}]
        });
        assert_eq!(node.find_value("type"), Some(&json!("renault")));
        assert_eq!(node.find_value("name"), Some(&json!("Ada")));
        assert!(node.find_value("year").is_none());
    }

    #[test]
    fn test_field_names_keep_document_order() {
        let node: Value = serde_json::from_str(r#"{"type": "BMW", "color": "Black"}"#).unwrap();
        assert_eq!(node.field_names(), vec!["type", "color"]);
        assert!(json!("scalar").field_names().is_empty());
    }
}
