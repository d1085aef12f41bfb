//! Filepath: src/parsers/go_parser.rs
//! Tree-sitter front-end for Go sources.

use std::path::{Path, PathBuf};

use tree_sitter::{Language, Node, Parser, Tree};

use crate::core::error::{Error, Result};

/// Thin wrapper around the Go grammar; cheap to clone and share.
#[derive(Clone)]
pub struct GoParser {
    language: Language,
}

/// Syntax problem recorded by the parser, 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

/// Top-level `func` declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuncDecl {
    pub name: String,
    /// Offset of the `func` keyword
    pub start_byte: usize,
    /// Offset just past the closing brace
    pub end_byte: usize,
    /// 1-based line of the `func` keyword
    pub line: usize,
    /// Go doc text; empty when there is no doc comment
    pub doc: String,
}

/// Source text together with its syntax tree.
pub struct ParsedFile {
    path: PathBuf,
    source: String,
    tree: Tree,
}

impl GoParser {
    pub fn new() -> Self {
        Self {
            language: tree_sitter_go::LANGUAGE.into(),
        }
    }

    /// Parse `source`; only a missing tree is fatal, syntax errors are
    /// reported through [`ParsedFile::errors`].
    pub fn parse(&self, path: &Path, source: String) -> Result<ParsedFile> {
        let mut parser = Parser::new();
        parser
            .set_language(&self.language)
            .map_err(|e| Error::ParseFailure {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let tree = parser
            .parse(&source, None)
            .ok_or_else(|| Error::ParseFailure {
                path: path.to_path_buf(),
                reason: "parser produced no syntax tree".to_string(),
            })?;

        Ok(ParsedFile {
            path: path.to_path_buf(),
            source,
            tree,
        })
    }
}

impl Default for GoParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ParsedFile {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    /// All ERROR and MISSING nodes in document order.
    pub fn errors(&self) -> Vec<SyntaxError> {
        let mut out = Vec::new();
        if self.root().has_error() {
            collect_errors(self.root(), self.source.as_bytes(), &mut out);
        }
        out
    }

    /// Fail with the first syntax error, if any.
    pub fn ensure_clean(&self) -> Result<()> {
        match self.errors().into_iter().next() {
            None => Ok(()),
            Some(e) => Err(Error::Syntax {
                path: self.path.clone(),
                line: e.line,
                column: e.column,
                message: e.message,
            }),
        }
    }

    /// Top-level function and method declarations in source order.
    pub fn function_decls(&self) -> Vec<FuncDecl> {
        let root = self.root();
        let mut cursor = root.walk();
        root.children(&mut cursor)
            .filter_map(|n| func_decl(n, self.source.as_bytes()))
            .collect()
    }
}

/// Build a [`FuncDecl`] when `node` is a named function or method.
pub fn func_decl(node: Node, bytes: &[u8]) -> Option<FuncDecl> {
    if !matches!(node.kind(), "function_declaration" | "method_declaration") {
        return None;
    }
    let name = decl_name(node, bytes)?;

    Some(FuncDecl {
        name,
        start_byte: node.start_byte(),
        end_byte: node.end_byte(),
        line: node.start_position().row + 1,
        doc: doc_text(&doc_comments(node, bytes)),
    })
}

/// Identifier of a function-like declaration.
pub fn decl_name(node: Node, bytes: &[u8]) -> Option<String> {
    let name = node.child_by_field_name("name")?;
    let text = name.utf8_text(bytes).ok()?;
    (!text.is_empty()).then(|| text.to_string())
}

fn collect_errors(node: Node, bytes: &[u8], out: &mut Vec<SyntaxError>) {
    if node.is_missing() {
        out.push(syntax_error(node, format!("missing {}", node.kind())));
        return;
    }
    if node.is_error() {
        let text = node.utf8_text(bytes).unwrap_or_default();
        let snippet: String = text.chars().take(24).collect();
        out.push(syntax_error(
            node,
            format!("syntax error: unexpected {:?}", snippet.trim()),
        ));
        return;
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.has_error() || child.is_missing() {
            collect_errors(child, bytes, out);
        }
    }
}

fn syntax_error(node: Node, message: String) -> SyntaxError {
    let p = node.start_position();
    SyntaxError {
        line: p.row + 1,
        column: p.column + 1,
        message,
    }
}

/// Comment texts of the group ending on the line directly above `decl`.
/// A comment trailing code on its own line ends the group.
fn doc_comments<'a>(decl: Node, bytes: &'a [u8]) -> Vec<&'a str> {
    let mut acc = Vec::new();
    let mut next_row = decl.start_position().row;
    let mut cur = decl;

    while let Some(prev) = cur.prev_sibling() {
        if prev.kind() != "comment" {
            break;
        }
        // The first comment must end on the line right above the decl;
        // earlier ones may be separated by at most one newline.
        let end_row = prev.end_position().row;
        let adjacent = if acc.is_empty() {
            end_row + 1 == next_row
        } else {
            end_row + 1 >= next_row
        };
        if !adjacent || trails_code(prev) {
            break;
        }
        let Ok(text) = prev.utf8_text(bytes) else {
            break;
        };

        acc.push(text);
        next_row = prev.start_position().row;
        cur = prev;
    }

    acc.reverse();
    acc
}

/// True when a comment shares its first line with the end of a token.
fn trails_code(comment: Node) -> bool {
    comment
        .prev_sibling()
        .is_some_and(|p| p.kind() != "comment" && p.end_position().row == comment.start_position().row)
}

/// Go doc text for a comment group: markers removed, directives dropped,
/// blank runs collapsed, newline-terminated unless empty.
pub fn doc_text(comments: &[&str]) -> String {
    let mut lines: Vec<String> = Vec::new();

    for raw in comments {
        let body: &str = if let Some(rest) = raw.strip_prefix("//") {
            match rest.strip_prefix(' ') {
                Some(r) => r,
                None if is_directive(rest) => continue,
                None => rest,
            }
        } else if let Some(rest) = raw.strip_prefix("/*") {
            rest.strip_suffix("*/").unwrap_or(rest)
        } else {
            raw
        };

        for l in body.split('\n') {
            lines.push(l.trim_end_matches([' ', '\t', '\n', '\x0b', '\x0c', '\r']).to_string());
        }
    }

    // Drop leading blanks and squeeze interior blank runs.
    let mut kept: Vec<String> = Vec::with_capacity(lines.len());
    for line in lines {
        if !line.is_empty() || kept.last().is_some_and(|l| !l.is_empty()) {
            kept.push(line);
        }
    }

    if kept.last().is_some_and(|l| !l.is_empty()) {
        kept.push(String::new());
    }
    kept.join("\n")
}

/// `//line`, `//export`, `//extern` and `//tool:directive` comments.
fn is_directive(c: &str) -> bool {
    if c.starts_with("line ") || c.starts_with("extern ") || c.starts_with("export ") {
        return true;
    }
    let b = c.as_bytes();
    let Some(colon) = c.find(':') else {
        return false;
    };
    if colon == 0 || colon + 1 >= b.len() {
        return false;
    }
    (0..=colon + 1)
        .filter(|&i| i != colon)
        .all(|i| b[i].is_ascii_lowercase() || b[i].is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> ParsedFile {
        GoParser::new()
            .parse(Path::new("x_test.go"), src.to_string())
            .expect("tree")
    }

    #[test]
    fn collects_functions_and_methods() {
        let f = parse(
            "package p\n\nfunc TestA(t *testing.T) {}\n\nfunc (s *S) TestB() {}\n\nvar x = 1\n",
        );
        let decls = f.function_decls();

        assert_eq!(decls.len(), 2);
        assert_eq!(decls[0].name, "TestA");
        assert_eq!(decls[0].line, 3);
        assert_eq!(decls[1].name, "TestB");
        assert_eq!(decls[1].line, 5);
        assert!(f.errors().is_empty());
    }

    #[test]
    fn doc_comment_must_touch_declaration() {
        let f = parse(
            "package p\n\n// Detached.\n\nfunc A() {}\n\n// First line.\n//\n// Second para.\nfunc B() {}\n",
        );
        let decls = f.function_decls();

        assert_eq!(decls[0].doc, "");
        assert_eq!(decls[1].doc, "First line.\n\nSecond para.\n");
    }

    #[test]
    fn directives_and_trailing_comments_are_not_docs() {
        let f = parse(
            "package p\n\nvar x = 1 // about x\nfunc A() {}\n\n//go:noinline\n// Real doc.\nfunc B() {}\n",
        );
        let decls = f.function_decls();

        assert_eq!(decls[0].doc, "");
        assert_eq!(decls[1].doc, "Real doc.\n");
    }

    #[test]
    fn block_comment_docs() {
        let f = parse("package p\n\n/*\n  Block doc.\n*/\nfunc A() {}\n");
        assert_eq!(f.function_decls()[0].doc, "  Block doc.\n");
    }

    #[test]
    fn doc_text_rules() {
        assert_eq!(doc_text(&[]), "");
        assert_eq!(doc_text(&["//", "// a  ", "//", "//", "// b"]), "a\n\nb\n");
        assert_eq!(doc_text(&["//export Foo"]), "");
        assert_eq!(doc_text(&["//nospace"]), "nospace\n");
    }

    #[test]
    fn syntax_errors_are_reported_not_fatal() {
        let f = parse("package p\n\nfunc A( {\n");
        assert!(!f.errors().is_empty());
        assert!(f.ensure_clean().is_err());
    }
}
