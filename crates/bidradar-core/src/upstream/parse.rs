//! Pull items out of the portal's `response.body` envelope.

use serde_json::Value;

use crate::normalize::RawRecord;

/// Items of one page plus the advertised total, if any.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedPage {
    /// `None` when the page carries no items at all.
    pub items: Option<Vec<RawRecord>>,
    pub total_count: Option<u64>,
}

/// Parse `{"response": {"body": {"items": ..., "totalCount": N}}}`.
///
/// `items` may be a list, `{"item": [...]}`, `{"item": {...}}`, an empty
/// string or absent. Non-object entries are skipped.
pub fn parse_page(doc: &Value) -> ParsedPage {
    let body = doc.pointer("/response/body");
    let total_count = body
        .and_then(|b| b.get("totalCount"))
        .and_then(|v| match v {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        });
    let items = body
        .and_then(|b| b.get("items"))
        .map(collect_items)
        .filter(|items| !items.is_empty());
    ParsedPage { items, total_count }
}

fn collect_items(items: &Value) -> Vec<RawRecord> {
    match items {
        Value::Array(list) => objects(list),
        Value::Object(map) => match map.get("item") {
            Some(Value::Array(list)) => objects(list),
            Some(Value::Object(one)) => vec![RawRecord::new(one.clone())],
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

fn objects(list: &[Value]) -> Vec<RawRecord> {
    list.iter()
        .filter_map(|v| v.as_object().cloned().map(RawRecord::new))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(items: Value) -> Value {
        json!({
            "response": {
                "header": {"resultCode": "00", "resultMsg": "NORMAL SERVICE."},
                "body": {"items": items, "numOfRows": 100, "pageNo": 1, "totalCount": 2}
            }
        })
    }

    #[test]
    fn array_items() {
        let page = parse_page(&envelope(json!([{"bidNtceNo": "A"}, {"bidNtceNo": "B"}])));
        let items = page.items.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].text("bidNtceNo").as_deref(), Some("B"));
        assert_eq!(page.total_count, Some(2));
    }

    #[test]
    fn nested_item_list_and_single_object() {
        let page = parse_page(&envelope(json!({"item": [{"bidNtceNo": "A"}]})));
        assert_eq!(page.items.unwrap().len(), 1);
        let page = parse_page(&envelope(json!({"item": {"bidNtceNo": "S"}})));
        assert_eq!(
            page.items.unwrap()[0].text("bidNtceNo").as_deref(),
            Some("S")
        );
    }

    #[test]
    fn empty_or_missing_items_are_none() {
        assert_eq!(parse_page(&envelope(json!([]))).items, None);
        assert_eq!(parse_page(&envelope(json!(""))).items, None);
        assert_eq!(parse_page(&json!({"response": {"body": {}}})).items, None);
        assert_eq!(parse_page(&json!({"unexpected": true})).items, None);
    }

    #[test]
    fn total_count_may_be_a_string() {
        let doc = json!({"response": {"body": {"items": [], "totalCount": "345"}}});
        assert_eq!(parse_page(&doc).total_count, Some(345));
    }
}
