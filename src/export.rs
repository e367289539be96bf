//! JSON-LD export — serialize a node tree as a DATS document.
//!
//! ```text
//! Node tree → to_json() → serde_json::Value → write_document() → pretty JSON
//! ```
//!
//! Key order per object: `@context`, `@id`, `@type`, then properties in
//! insertion order. References become `{"@id": …}`.

use std::io::Write;

use serde_json::{Map, Number, Value as Json};

use crate::model::*;
use crate::Result;

/// Convert a node body to a JSON object.
pub fn node_to_json(node: &Node) -> Json {
    let mut obj = Map::new();
    if let Some(context) = node.context() {
        obj.insert("@context".into(), Json::String(context.to_string()));
    }
    // Access has no @id in its schema
    if node.kind().emits_id() {
        obj.insert("@id".into(), Json::String(node.id().to_string()));
    }
    obj.insert("@type".into(), Json::String(node.kind().name().to_string()));
    for (key, value) in node.properties().iter() {
        obj.insert(key.to_string(), to_json(value));
    }
    Json::Object(obj)
}

/// Convert a property value to JSON.
pub fn to_json(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Int(i) => Json::Number((*i).into()),
        // NaN and infinities have no JSON form
        Value::Float(f) => Number::from_f64(*f).map(Json::Number).unwrap_or(Json::Null),
        Value::String(s) => Json::String(s.clone()),
        Value::List(items) => Json::Array(items.iter().map(to_json).collect()),
        Value::Map(m) => Json::Object(m.iter().map(|(k, v)| (k.to_string(), to_json(v))).collect()),
        Value::Node(n) => node_to_json(n),
        Value::Ref(r) => {
            let mut obj = Map::new();
            obj.insert("@id".into(), Json::String(r.id.to_string()));
            Json::Object(obj)
        }
    }
}

/// Write `root` as a pretty-printed JSON document.
pub fn write_document(root: &Node, writer: &mut dyn Write) -> Result<()> {
    serde_json::to_writer_pretty(&mut *writer, &node_to_json(root))?;
    writeln!(writer)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_key_order() {
        let node = Node::create(
            NodeKind::Dataset,
            PropertyMap::from(vec![("title", "T"), ("description", "D")]),
            Some(NodeId::new("_:b1")),
        );
        let json = node_to_json(&node);
        let keys: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, ["@context", "@id", "@type", "title", "description"]);
    }

    #[test]
    fn test_reference_and_values() {
        let target = Node::create(NodeKind::Material, PropertyMap::new(), Some(NodeId::new("_:b9")));
        let mut props = PropertyMap::new();
        props.insert("derivesFrom", vec![target.reference()]);
        props.insert("n", 3);
        props.insert("missing", Value::Null);
        let node = Node::create(NodeKind::Annotation, props, Some(NodeId::new("_:b2")));
        let json = node_to_json(&node);
        assert_eq!(json["derivesFrom"], json!([{ "@id": "_:b9" }]));
        assert_eq!(json["n"], json!(3));
        assert!(json["missing"].is_null());
        assert!(json.get("@context").is_none());
    }

    #[test]
    fn test_access_omits_id() {
        let node = Node::create(NodeKind::Access, PropertyMap::new(), None);
        let json = node_to_json(&node);
        assert!(json.get("@id").is_none());
        assert_eq!(json["@type"], json!("Access"));
    }

    #[test]
    fn test_write_document() {
        let node = Node::create(NodeKind::Dataset, PropertyMap::from(vec![("title", "T")]), None);
        let mut out = Vec::new();
        write_document(&node, &mut out).unwrap();
        let parsed: Json = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed["title"], json!("T"));
    }
}
