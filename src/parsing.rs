//! Tree-sitter parsing entry and shared AST helpers.
//!
//! All detection walks the JavaScript grammar; the helpers here are the only
//! place node text and tree traversal are implemented.

use tree_sitter::{Node, Tree};

use crate::error::UpliftError;

/// Parse a JavaScript source into a tree-sitter tree.
///
/// Returns `UpliftError::Parse` when the grammar cannot be loaded, the
/// parser gives up, or the tree contains syntax errors. Callers treat a
/// parse failure as file-level: the file is skipped, others are unaffected.
pub fn parse_source(path: &str, source: &str) -> crate::Result<Tree> {
    let mut parser = tree_sitter::Parser::new();
    parser
        .set_language(&tree_sitter_javascript::LANGUAGE.into())
        .map_err(|e| UpliftError::Parse {
            path: path.to_string(),
            message: format!("failed to set language: {:?}", e),
        })?;

    let tree = parser.parse(source, None).ok_or_else(|| UpliftError::Parse {
        path: path.to_string(),
        message: "parser returned no tree".to_string(),
    })?;

    if tree.root_node().has_error() {
        return Err(UpliftError::Parse {
            path: path.to_string(),
            message: format!("syntax error near line {}", first_error_line(&tree.root_node())),
        });
    }
    Ok(tree)
}

fn first_error_line(root: &Node) -> usize {
    let mut line = root.start_position().row + 1;
    let mut found = false;
    visit_all(root, |n| {
        if !found && (n.is_error() || n.is_missing()) {
            line = n.start_position().row + 1;
            found = true;
        }
    });
    line
}

/// Get text content of a node
pub fn node_text(node: &Node, source: &str) -> String {
    node.utf8_text(source.as_bytes()).unwrap_or("").to_string()
}

/// Get text content of a node, normalized to a single line
pub fn node_text_normalized(node: &Node, source: &str) -> String {
    node_text(node, source)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Inner text of a string or template-string literal, without quotes
pub fn string_value(node: &Node, source: &str) -> Option<String> {
    match node.kind() {
        "string" | "template_string" => {
            let raw = node_text(node, source);
            let mut chars = raw.chars();
            chars.next();
            chars.next_back();
            Some(chars.as_str().to_string())
        }
        _ => None,
    }
}

/// True for any function-valued expression node
pub fn is_function_node(kind: &str) -> bool {
    matches!(
        kind,
        "function_expression" | "function" | "function_declaration" | "arrow_function"
    )
}

/// Visit all nodes in a tree, depth-first
pub fn visit_all<'tree, F>(node: &Node<'tree>, mut visitor: F)
where
    F: FnMut(&Node<'tree>),
{
    visit_all_recursive(node, &mut visitor);
}

fn visit_all_recursive<'tree, F>(node: &Node<'tree>, visitor: &mut F)
where
    F: FnMut(&Node<'tree>),
{
    visitor(node);
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        visit_all_recursive(&child, visitor);
    }
}
