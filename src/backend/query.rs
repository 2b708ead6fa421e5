use serde_json::{json, Value};
use std::fmt;

/// One clause of a document listing request.
///
/// Serializes to the JSON query strings the remote service expects in
/// repeated `queries[]` parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    Equal { attribute: String, values: Vec<Value> },
    OrderAsc(String),
    OrderDesc(String),
    Limit(u32),
    CursorAfter(String),
    Search { attribute: String, term: String },
}

impl Query {
    pub fn equal(attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        Query::Equal {
            attribute: attribute.into(),
            values: vec![value.into()],
        }
    }

    pub fn order_asc(attribute: impl Into<String>) -> Self {
        Query::OrderAsc(attribute.into())
    }

    pub fn order_desc(attribute: impl Into<String>) -> Self {
        Query::OrderDesc(attribute.into())
    }

    pub fn limit(limit: u32) -> Self {
        Query::Limit(limit)
    }

    pub fn cursor_after(document_id: impl Into<String>) -> Self {
        Query::CursorAfter(document_id.into())
    }

    pub fn search(attribute: impl Into<String>, term: impl Into<String>) -> Self {
        Query::Search {
            attribute: attribute.into(),
            term: term.into(),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Query::Equal { attribute, values } => {
                json!({ "method": "equal", "attribute": attribute, "values": values })
            }
            Query::OrderAsc(attribute) => json!({ "method": "orderAsc", "attribute": attribute }),
            Query::OrderDesc(attribute) => json!({ "method": "orderDesc", "attribute": attribute }),
            Query::Limit(limit) => json!({ "method": "limit", "values": [limit] }),
            Query::CursorAfter(id) => json!({ "method": "cursorAfter", "values": [id] }),
            Query::Search { attribute, term } => {
                json!({ "method": "search", "attribute": attribute, "values": [term] })
            }
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_carries_values_array() {
        let q = Query::equal("accountId", "abc");
        assert_eq!(
            q.to_json(),
            json!({ "method": "equal", "attribute": "accountId", "values": ["abc"] })
        );
    }

    #[test]
    fn order_has_no_values() {
        let q = Query::order_desc("$createdAt");
        let v = q.to_json();
        assert_eq!(v["method"], "orderDesc");
        assert_eq!(v["attribute"], "$createdAt");
        assert!(v.get("values").is_none());
    }

    #[test]
    fn limit_and_cursor_wrap_single_value() {
        assert_eq!(
            Query::limit(20).to_json(),
            json!({ "method": "limit", "values": [20] })
        );
        assert_eq!(
            Query::cursor_after("doc9").to_json(),
            json!({ "method": "cursorAfter", "values": ["doc9"] })
        );
    }

    #[test]
    fn display_is_compact_json() {
        let s = Query::search("caption", "sunset").to_string();
        let parsed: Value = serde_json::from_str(&s).unwrap();
        assert_eq!(parsed["method"], "search");
        assert_eq!(parsed["values"][0], "sunset");
    }
}
