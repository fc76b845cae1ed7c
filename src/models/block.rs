use crate::utils::BlockPath;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Kind of a block. Unknown tags are kept verbatim so newer clients can store
/// block types this core does not validate yet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BlockType {
    Page,
    Container,
    Text,
    Other(String),
}

impl BlockType {
    pub fn as_str(&self) -> &str {
        match self {
            BlockType::Page => "PAGE",
            BlockType::Container => "CONTAINER",
            BlockType::Text => "TEXT",
            BlockType::Other(tag) => tag,
        }
    }
}

impl From<String> for BlockType {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "PAGE" => BlockType::Page,
            "CONTAINER" => BlockType::Container,
            "TEXT" => BlockType::Text,
            _ => BlockType::Other(tag),
        }
    }
}

impl From<&str> for BlockType {
    fn from(tag: &str) -> Self {
        BlockType::from(tag.to_string())
    }
}

impl From<BlockType> for String {
    fn from(block_type: BlockType) -> Self {
        block_type.as_str().to_string()
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node in the content tree.
///
/// `path` is the only source of truth for ancestry. `owner_id` is set on
/// pages only; every other block inherits ownership from the page named by
/// the first path segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: String,
    pub block_type: BlockType,
    pub meta: Value,
    pub path: BlockPath,
    pub owner_id: Option<String>,
    pub order: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Block {
    pub fn is_page(&self) -> bool {
        self.path.is_root()
    }

    /// Id of the page this block lives under (its own id for a page).
    pub fn page_id(&self) -> &str {
        self.path.page_id()
    }

    pub fn title(&self) -> Option<&str> {
        self.meta.get("title").and_then(Value::as_str)
    }
}

/// Title listing entry for a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageTitle {
    pub id: String,
    pub title: Option<String>,
}

/// Shallow merge: keys in `patch` overwrite, other keys in `base` are kept.
pub fn merge_meta(base: &mut Value, patch: &Map<String, Value>) {
    if !base.is_object() {
        *base = Value::Object(Map::new());
    }
    if let Some(obj) = base.as_object_mut() {
        for (key, value) in patch {
            obj.insert(key.clone(), value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn block_at(path: &str, owner: Option<&str>) -> Block {
        let path = BlockPath::parse(path).unwrap();
        Block {
            id: path.block_id().to_string(),
            block_type: BlockType::Text,
            meta: json!({}),
            path,
            owner_id: owner.map(str::to_string),
            order: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_block_type_tags() {
        assert_eq!(BlockType::from("PAGE"), BlockType::Page);
        assert_eq!(BlockType::from("TEXT").as_str(), "TEXT");
        assert_eq!(
            BlockType::from("IMAGE"),
            BlockType::Other("IMAGE".to_string())
        );
    }

    #[test]
    fn test_block_type_serde_uses_tag() {
        let encoded = serde_json::to_value(BlockType::Container).unwrap();
        assert_eq!(encoded, json!("CONTAINER"));

        let decoded: BlockType = serde_json::from_value(json!("VIDEO")).unwrap();
        assert_eq!(decoded, BlockType::Other("VIDEO".to_string()));
    }

    #[test]
    fn test_page_resolution_from_path() {
        let page = block_at("p1", Some("alice"));
        assert!(page.is_page());
        assert_eq!(page.page_id(), "p1");

        let nested = block_at("p1.c1.t1", None);
        assert!(!nested.is_page());
        assert_eq!(nested.page_id(), "p1");
    }

    #[test]
    fn test_merge_meta_is_shallow() {
        let mut base = json!({ "title": "Old", "color": "red", "nested": { "a": 1 } });
        let patch = json!({ "title": "New", "nested": { "b": 2 } });
        merge_meta(&mut base, patch.as_object().unwrap());

        assert_eq!(
            base,
            json!({ "title": "New", "color": "red", "nested": { "b": 2 } })
        );
    }

    #[test]
    fn test_merge_meta_into_null() {
        let mut base = Value::Null;
        merge_meta(&mut base, json!({ "title": "T" }).as_object().unwrap());
        assert_eq!(base, json!({ "title": "T" }));
    }
}
