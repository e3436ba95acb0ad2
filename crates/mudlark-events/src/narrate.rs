//! Small text helpers shared by the event kinds

use mudlark_core::{Graph, Node, NodeId};

/// Uppercase the first character.
pub fn cap(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// "a", "a and b", "a, b and c"; "nothing" when empty.
pub fn list(items: &[String]) -> String {
    match items {
        [] => "nothing".to_string(),
        [one] => one.clone(),
        [init @ .., last] => format!("{} and {}", init.join(", "), last),
    }
}

/// Mid-sentence name of a node ("a sword", "Bob", "the tavern").
pub fn name(graph: &Graph, id: &NodeId) -> String {
    graph
        .get(id)
        .map(Node::view_name)
        .unwrap_or_else(|| id.to_string())
}

/// Definite form of a node's name: "the sword" for "a sword", proper names
/// unchanged.
pub fn the(graph: &Graph, id: &NodeId) -> String {
    match graph.get(id) {
        Some(node) if matches!(node.name_prefix.as_str(), "a" | "an" | "some") => {
            format!("the {}", node.name)
        }
        Some(node) => node.view_name(),
        None => id.to_string(),
    }
}

/// Present-tense third person of a verb ("waves", "cries", "blushes").
pub fn third_person(verb: &str) -> String {
    if verb.ends_with("sh") || verb.ends_with("ch") || verb.ends_with("ss") || verb.ends_with('x') {
        format!("{}es", verb)
    } else if let Some(stem) = verb.strip_suffix('y') {
        match stem.chars().last() {
            Some('a' | 'e' | 'i' | 'o' | 'u') => format!("{}s", verb),
            _ => format!("{}ies", stem),
        }
    } else {
        format!("{}s", verb)
    }
}

pub fn health_phrase(health: i32, max: i32) -> &'static str {
    let max = max.max(1);
    match health {
        h if h <= 0 => "dead",
        h if h * 4 <= max => "on the verge of collapse",
        h if h * 2 <= max => "badly hurt",
        h if h * 4 <= max * 3 => "a little bruised",
        _ => "in perfect health",
    }
}

/// Strip one pair of surrounding quotes.
pub fn unquote(text: &str) -> &str {
    let text = text.trim();
    for (open, close) in [('"', '"'), ('\'', '\''), ('\u{201c}', '\u{201d}')] {
        if let Some(inner) = text.strip_prefix(open).and_then(|t| t.strip_suffix(close)) {
            return inner.trim();
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_read_naturally() {
        assert_eq!(list(&[]), "nothing");
        assert_eq!(list(&["a hat".into()]), "a hat");
        assert_eq!(list(&["a".into(), "b".into(), "c".into()]), "a, b and c");
    }

    #[test]
    fn conjugation() {
        assert_eq!(third_person("wave"), "waves");
        assert_eq!(third_person("cry"), "cries");
        assert_eq!(third_person("blush"), "blushes");
        assert_eq!(third_person("play"), "plays");
    }

    #[test]
    fn unquote_strips_one_layer() {
        assert_eq!(unquote("\"hello there\""), "hello there");
        assert_eq!(unquote("hello"), "hello");
        assert_eq!(cap("bob waves"), "Bob waves");
    }
}
