//! `path:line:column` position references.

use std::{fmt, path::PathBuf, str::FromStr};

use crate::core::error::QueryError;

/// Cursor position in a file, 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionQuery
{
    pub path: PathBuf,
    pub line: usize,
    pub column: usize,
}

/// Split `text` on its last two colons. Everything before them is the
/// path, so drive letters and other embedded colons survive.
pub fn parse_query(text: &str) -> Result<PositionQuery, QueryError>
{
    let (rest, column) = text
        .rsplit_once(':')
        .ok_or(QueryError::MissingColumn)?;
    let column = column
        .parse::<usize>()
        .map_err(|_| QueryError::ColumnFormat(column.to_string()))?;

    let (path, line) = rest
        .rsplit_once(':')
        .ok_or(QueryError::MissingLine)?;
    let line = line
        .parse::<usize>()
        .map_err(|_| QueryError::LineFormat(line.to_string()))?;

    Ok(PositionQuery { path: PathBuf::from(path), line, column })
}

impl FromStr for PositionQuery
{
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        parse_query(s)
    }
}

impl fmt::Display for PositionQuery
{
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result
    {
        write!(f, "{}:{}:{}", self.path.display(), self.line, self.column)
    }
}
