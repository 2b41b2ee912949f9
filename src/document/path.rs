use serde_json::{Map, Value};

/// Keyword sub-fields are mapped onto the same data as their parent field
pub const KEYWORD_SUFFIX: &str = ".keyword";

pub fn strip_keyword(path: &str) -> &str {
    path.strip_suffix(KEYWORD_SUFFIX).unwrap_or(path)
}

/// Last segment of a dotted path
pub fn leaf_name(path: &str) -> &str {
    path.rsplit('.').next().unwrap_or(path)
}

/// Scalar values found at `path`.
///
/// Arrays met on intermediate segments fan out into every object element, in
/// array order. A leaf array of scalars is flattened one level. Nulls,
/// objects and anything unreachable are skipped, never an error.
pub fn values_at<'a>(document: &'a Value, path: &str) -> Vec<&'a Value> {
    let segments: Vec<&str> = strip_keyword(path).split('.').collect();
    let mut elements = Vec::new();
    elements_at(document, &segments, &mut elements);

    let mut values = Vec::with_capacity(elements.len());
    for element in elements {
        match element {
            Value::Bool(_) | Value::Number(_) | Value::String(_) => values.push(element),
            Value::Array(items) => values.extend(
                items.iter().filter(|item| matches!(item, Value::Bool(_) | Value::Number(_) | Value::String(_))),
            ),
            _ => {}
        }
    }
    values
}

/// Objects directly enclosing the leaf of `path`, with the same array fan-out
/// applied to every segment but the last.
pub fn parents_of_leaf<'a>(document: &'a Value, path: &str) -> Vec<&'a Map<String, Value>> {
    let segments: Vec<&str> = path.split('.').collect();
    if segments.len() == 1 {
        return document.as_object().into_iter().collect();
    }

    let mut elements = Vec::new();
    elements_at(document, &segments[..segments.len() - 1], &mut elements);

    let mut parents = Vec::with_capacity(elements.len());
    for element in elements {
        match element {
            Value::Object(object) => parents.push(object),
            Value::Array(items) => parents.extend(items.iter().filter_map(Value::as_object)),
            _ => {}
        }
    }
    parents
}

fn elements_at<'a>(node: &'a Value, segments: &[&str], out: &mut Vec<&'a Value>) {
    let Some((first, rest)) = segments.split_first() else {
        out.push(node);
        return;
    };
    let Some(child) = node.as_object().and_then(|object| object.get(*first)) else {
        return;
    };
    if rest.is_empty() {
        out.push(child);
        return;
    }
    match child {
        Value::Object(_) => elements_at(child, rest, out),
        Value::Array(items) => {
            for item in items.iter().filter(|item| item.is_object()) {
                elements_at(item, rest, out);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_object_path_matches_direct_access() {
        let doc = json!({"user": {"address": {"city": "Paris"}}, "age": 30});

        assert_eq!(values_at(&doc, "user.address.city"), vec![&doc["user"]["address"]["city"]]);
        assert_eq!(values_at(&doc, "age"), vec![&json!(30)]);
        assert!(values_at(&doc, "user.address.zip").is_empty());
        assert!(values_at(&doc, "age.value").is_empty());
    }

    #[test]
    fn test_intermediate_arrays_concatenate_in_order() {
        let doc = json!({
            "comments": [
                {"author": "ann", "replies": [{"author": "bob"}, {"author": "cid"}]},
                "not an object",
                {"author": "dan", "replies": [{"author": "eve"}]}
            ]
        });

        let authors: Vec<&str> = values_at(&doc, "comments.author").iter().filter_map(|v| v.as_str()).collect();
        assert_eq!(authors, vec!["ann", "dan"]);

        let replies: Vec<&str> = values_at(&doc, "comments.replies.author").iter().filter_map(|v| v.as_str()).collect();
        assert_eq!(replies, vec!["bob", "cid", "eve"]);
    }

    #[test]
    fn test_keyword_suffix_and_leaf_arrays() {
        let doc = json!({"tags": ["a", null, "b", {"x": 1}], "name": null});

        let tags: Vec<&str> = values_at(&doc, "tags.keyword").iter().filter_map(|v| v.as_str()).collect();
        assert_eq!(tags, vec!["a", "b"]);
        assert!(values_at(&doc, "name").is_empty());
    }

    #[test]
    fn test_parents_of_leaf() {
        let doc = json!({
            "title": "x",
            "comments": [{"author": null}, {"text": "hi"}],
            "meta": {"owner": "me"}
        });

        assert_eq!(parents_of_leaf(&doc, "title").len(), 1);
        assert_eq!(parents_of_leaf(&doc, "comments.author").len(), 2);
        assert_eq!(parents_of_leaf(&doc, "meta.owner").len(), 1);
        assert!(parents_of_leaf(&doc, "missing.owner").is_empty());
        assert_eq!(leaf_name("comments.author"), "author");
        assert_eq!(leaf_name("title"), "title");
    }
}
