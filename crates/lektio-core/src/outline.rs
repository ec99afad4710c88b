use serde_json::Value;

use crate::OutlineNode;

/// Interpret a recovered JSON value as an outline tree.
///
/// Non-arrays become empty; elements that are not objects are dropped;
/// titles are stringified and children recurse. Best-effort by design --
/// a malformed outline degrades to fewer nodes, never to an error.
pub fn parse_outline(value: &Value) -> Vec<OutlineNode> {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| item.as_object())
        .map(|object| OutlineNode {
            title: object
                .get("title")
                .map(|title| match title {
                    Value::String(s) => s.trim().to_string(),
                    other => other.to_string(),
                })
                .unwrap_or_default(),
            children: object.get("children").map(parse_outline).unwrap_or_default(),
        })
        .collect()
}

/// Flatten the tree into an indented bullet list, two spaces per level.
pub fn flatten_outline(nodes: &[OutlineNode]) -> String {
    let mut lines = Vec::new();
    push_nodes(nodes, 0, &mut lines);
    lines.join("\n")
}

fn push_nodes(nodes: &[OutlineNode], level: usize, lines: &mut Vec<String>) {
    for node in nodes {
        let indent = "  ".repeat(level);
        if node.title.is_empty() {
            lines.push(format!("{indent}-"));
        } else {
            lines.push(format!("{indent}- {}", node.title));
        }
        push_nodes(&node.children, level + 1, lines);
    }
}
