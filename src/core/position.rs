//! Map a cursor position to the function declaration around it.

use std::path::Path;

use tracing::trace;
use tree_sitter::Node;

use crate::{
    core::error::{Error, NoContainingFunctionError, Result},
    infra::{io::read_source, line_index::NewlineIndex},
    parsers::go_parser::{GoParser, decl_name},
};

/// Name of the function or method whose source range contains the start
/// of `line`. Reads `path` when `content` is None. Syntax errors do not
/// fail the lookup as long as a tree was produced.
pub fn containing_function(
    path: &Path,
    content: Option<&str>,
    line: usize,
    column: usize,
) -> Result<String>
{
    let source = match content
    {
        Some(s) => s.to_string(),
        None => read_source(path).map_err(|e| Error::Read { path: path.to_path_buf(), reason: format!("{e:#}") })?,
    };

    let parsed = GoParser::new().parse(path, source)?;
    let index = NewlineIndex::build(
        parsed
            .source()
            .as_bytes(),
    );

    let max = index.line_count();
    if line < 1 || line > max
    {
        return Err(Error::InvalidLine { line, max });
    }
    let pos = index
        .start_byte_of_line(line)
        .ok_or(Error::InvalidPosition { line })?;

    // Fast check over top-level declarations
    if let Some(decl) = parsed
        .function_decls()
        .into_iter()
        .find(|d| d.start_byte <= pos && pos <= d.end_byte)
    {
        return Ok(decl.name);
    }

    trace!(pos, "no top-level match, walking the whole tree");
    if let Some(name) = first_enclosing(parsed.root(), pos, parsed.source().as_bytes())
    {
        return Ok(name);
    }

    Err(NoContainingFunctionError {
        filename: path
            .to_string_lossy()
            .into_owned(),
        line,
        column,
    }
    .into())
}

/// Pre-order search for the first named function declaration whose range
/// contains `pos`.
fn first_enclosing(
    root: Node,
    pos: usize,
    bytes: &[u8],
) -> Option<String>
{
    let mut stack = vec![root];
    while let Some(node) = stack.pop()
    {
        let is_func = matches!(node.kind(), "function_declaration" | "method_declaration");
        if is_func
            && node.start_byte() <= pos
            && pos <= node.end_byte()
            && let Some(name) = decl_name(node, bytes)
        {
            return Some(name);
        }

        // Children pushed in reverse so the leftmost is visited first
        let mut cursor = node.walk();
        let children: Vec<Node> = node
            .children(&mut cursor)
            .collect();
        stack.extend(children.into_iter().rev());
    }
    None
}
