use anyhow::bail;
use serde_json::{Map, Value};

/// Split a dotted path like `ui.theme` into its segments.
pub fn parse(path: &str) -> anyhow::Result<Vec<String>> {
    let segments: Vec<String> = path.split('.').map(str::to_string).collect();
    if segments.iter().any(String::is_empty) {
        bail!("invalid path {path:?}: empty segment");
    }
    Ok(segments)
}

/// Value at `segments`, or `Null` when any step is missing.
pub fn lookup(doc: &Value, segments: &[String]) -> Value {
    segments
        .iter()
        .try_fold(doc, |node, segment| node.get(segment))
        .cloned()
        .unwrap_or(Value::Null)
}

/// Store `value` at `segments`, creating objects along the way.
///
/// `Null` removes the entry instead. Non-object nodes on the way are
/// replaced by objects.
pub fn assign(doc: Value, segments: &[String], value: Value) -> Value {
    let Some((first, rest)) = segments.split_first() else {
        return value;
    };
    let mut map = match doc {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    if rest.is_empty() {
        if value.is_null() {
            map.remove(first);
        } else {
            map.insert(first.clone(), value);
        }
    } else if let Some(child) = map.remove(first) {
        map.insert(first.clone(), assign(child, rest, value));
    } else if !value.is_null() {
        map.insert(first.clone(), assign(Value::Null, rest, value));
    }
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn segs(path: &str) -> Vec<String> {
        parse(path).unwrap()
    }

    #[test]
    fn parse_rejects_empty_segments() {
        assert_eq!(segs("a.b"), vec!["a", "b"]);
        assert!(parse("a..b").is_err());
        assert!(parse("").is_err());
    }

    #[test]
    fn lookup_missing_is_null() {
        let doc = json!({"ui": {"theme": "dark"}});
        assert_eq!(lookup(&doc, &segs("ui.theme")), json!("dark"));
        assert_eq!(lookup(&doc, &segs("ui.size")), Value::Null);
        assert_eq!(lookup(&doc, &segs("ui.theme.x")), Value::Null);
    }

    #[test]
    fn assign_creates_parents() {
        let doc = assign(json!({}), &segs("ui.theme"), json!("dark"));
        assert_eq!(doc, json!({"ui": {"theme": "dark"}}));
    }

    #[test]
    fn assign_keeps_siblings() {
        let doc = assign(json!({"ui": {"theme": "dark", "size": 3}}), &segs("ui.size"), json!(4));
        assert_eq!(doc, json!({"ui": {"theme": "dark", "size": 4}}));
    }

    #[test]
    fn assign_null_removes() {
        let doc = json!({"ui": {"theme": "dark", "size": 3}});
        let doc = assign(doc, &segs("ui.size"), Value::Null);
        assert_eq!(doc, json!({"ui": {"theme": "dark"}}));
    }

    #[test]
    fn removing_a_missing_path_adds_nothing() {
        let doc = assign(json!({"a": 1}), &segs("ui.size"), Value::Null);
        assert_eq!(doc, json!({"a": 1}));
    }

    #[test]
    fn assign_replaces_scalars_on_the_way() {
        let doc = assign(json!({"ui": 5}), &segs("ui.theme"), json!("dark"));
        assert_eq!(doc, json!({"ui": {"theme": "dark"}}));
    }
}
