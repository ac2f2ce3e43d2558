//! Rendering Go type expressions to compact strings.

use tree_sitter::Node;

use super::parser::node_text;

/// Render a type expression the way it reads in source, with incidental
/// whitespace collapsed: `models.CalculationRequest`, `*Calculator`,
/// `[]string`, `map[string]int`, `func(int) error`.
pub fn render_type(node: Node, source: &str) -> String {
    match node.kind() {
        "type_identifier" | "package_identifier" | "field_identifier" => {
            node_text(node, source).to_string()
        }
        "qualified_type" => {
            let pkg = node
                .child_by_field_name("package")
                .map(|n| node_text(n, source))
                .unwrap_or("");
            let name = node
                .child_by_field_name("name")
                .map(|n| node_text(n, source))
                .unwrap_or("");
            format!("{}.{}", pkg, name)
        }
        "pointer_type" => {
            let inner = named_child(node)
                .map(|n| render_type(n, source))
                .unwrap_or_default();
            format!("*{}", inner)
        }
        "slice_type" => {
            let elem = node
                .child_by_field_name("element")
                .map(|n| render_type(n, source))
                .unwrap_or_default();
            format!("[]{}", elem)
        }
        "array_type" => {
            let len = node
                .child_by_field_name("length")
                .map(|n| node_text(n, source))
                .unwrap_or("");
            let elem = node
                .child_by_field_name("element")
                .map(|n| render_type(n, source))
                .unwrap_or_default();
            format!("[{}]{}", len, elem)
        }
        "map_type" => {
            let key = node
                .child_by_field_name("key")
                .map(|n| render_type(n, source))
                .unwrap_or_default();
            let value = node
                .child_by_field_name("value")
                .map(|n| render_type(n, source))
                .unwrap_or_default();
            format!("map[{}]{}", key, value)
        }
        "channel_type" => {
            let elem = node
                .child_by_field_name("value")
                .map(|n| render_type(n, source))
                .unwrap_or_default();
            format!("chan {}", elem)
        }
        "parenthesized_type" => named_child(node)
            .map(|n| render_type(n, source))
            .unwrap_or_default(),
        "generic_type" => node_text(node, source).split_whitespace().collect(),
        _ => node_text(node, source).split_whitespace().collect::<Vec<_>>().join(" "),
    }
}

/// Strip pointer and slice/array wrappers: `*[]*pkg.T` → `pkg.T`.
pub fn base_type_name(type_string: &str) -> &str {
    let mut s = type_string;
    loop {
        if let Some(rest) = s.strip_prefix('*') {
            s = rest;
        } else if let Some(rest) = s.strip_prefix("[]") {
            s = rest;
        } else if s.starts_with('[') {
            match s.find(']') {
                Some(i) => s = &s[i + 1..],
                None => break,
            }
        } else {
            break;
        }
    }
    s
}

/// Split `pkg.Name` into its package qualifier and bare name.
pub fn split_qualified(type_name: &str) -> (Option<&str>, &str) {
    match type_name.rsplit_once('.') {
        Some((pkg, name)) => (Some(pkg), name),
        None => (None, type_name),
    }
}

/// The underlying named type of a receiver declaration: `(c *Calculator)`
/// yields `Calculator`.
pub fn receiver_base(type_string: &str) -> &str {
    let base = base_type_name(type_string);
    match base.find('[') {
        Some(i) => &base[..i],
        None => base,
    }
}

fn named_child(node: Node) -> Option<Node> {
    let mut cursor = node.walk();
    let child = node.named_children(&mut cursor).next();
    child
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_type_name() {
        assert_eq!(base_type_name("*Calculator"), "Calculator");
        assert_eq!(base_type_name("[]models.Item"), "models.Item");
        assert_eq!(base_type_name("*[]*Node"), "Node");
        assert_eq!(base_type_name("[4]byte"), "byte");
        assert_eq!(base_type_name("int"), "int");
    }

    #[test]
    fn test_split_qualified() {
        assert_eq!(
            split_qualified("models.CalculationRequest"),
            (Some("models"), "CalculationRequest")
        );
        assert_eq!(split_qualified("Calculator"), (None, "Calculator"));
    }

    #[test]
    fn test_receiver_base() {
        assert_eq!(receiver_base("*Calculator"), "Calculator");
        assert_eq!(receiver_base("Tree[T]"), "Tree");
    }
}
