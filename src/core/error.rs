//! Error types shared by the discovery, environment and position modules.

use std::path::PathBuf;

use serde::Serialize;

/// Convenience alias used across the domain modules.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Every failure the domain layer can report.
#[derive(Debug, thiserror::Error)]
pub enum Error
{
    /// Query string is malformed (`path:line:column`)
    #[error(transparent)]
    Query(#[from] QueryError),

    /// Overlay payload did not match the strict schema
    #[error("invalid overlay: {0}")]
    Schema(#[source] serde_json::Error),

    /// Directory is not a buildable Go package
    #[error(transparent)]
    Import(#[from] ImportError),

    /// The parser produced no syntax tree at all
    #[error("{}: parse failed: {reason}", path.display())]
    ParseFailure { path: PathBuf, reason: String },

    /// Source parsed with syntax errors where a clean parse is required
    #[error("{}:{line}:{column}: {message}", path.display())]
    Syntax { path: PathBuf, line: usize, column: usize, message: String },

    /// Requested line is outside the file
    #[error("invalid line number {line} (should be between 1 and {max})")]
    InvalidLine { line: usize, max: usize },

    /// Line exists but has no resolvable offset
    #[error("invalid pos for line: {line}")]
    InvalidPosition { line: usize },

    /// Well-formed position outside every function
    #[error(transparent)]
    NoContainingFunction(#[from] NoContainingFunctionError),

    /// No environment builds the file, or its constraints are malformed
    #[error("{}: {reason}", path.display())]
    Match { path: PathBuf, reason: String },

    /// Malformed `//go:build` or `// +build` line
    #[error("{}: invalid build constraint: {reason}", path.display())]
    Constraint { path: PathBuf, reason: String },

    /// No project marker above a directory
    #[error("no project root found for {}", .0.display())]
    NoProjectRoot(PathBuf),

    /// Reading a source file failed
    #[error("{}: {reason}", path.display())]
    Read { path: PathBuf, reason: String },

    /// The test command could not be started
    #[error("failed to run {program}: {source}")]
    Spawn
    {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The test command ran and exited unsuccessfully
    #[error("{program} exited with {status}")]
    TestFailed { program: String, status: std::process::ExitStatus },

    /// File-system access other than reading a source failed
    #[error("{}: {source}", path.display())]
    Io
    {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error
{
    /// Wrap an I/O failure together with the path it concerns.
    pub fn io(
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self
    {
        Error::Io { path: path.into(), source }
    }
}

/// Failures parsing a `path:line:column` query.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError
{
    #[error("invalid file query: missing column")]
    MissingColumn,

    #[error("invalid file query: missing line")]
    MissingLine,

    #[error("invalid file query: parsing column: {0:?}")]
    ColumnFormat(String),

    #[error("invalid file query: parsing line: {0:?}")]
    LineFormat(String),
}

/// Reasons a directory cannot be imported as a package.
#[derive(Debug, thiserror::Error)]
pub enum ImportError
{
    #[error("cannot find package in {}", .0.display())]
    NotFound(PathBuf),

    #[error("no buildable Go source files in {}", .0.display())]
    NoGoFiles(PathBuf),

    #[error("build constraints exclude all Go files in {}", .0.display())]
    ConstraintsExcludeAll(PathBuf),

    #[error("found packages {first} ({first_file}) and {second} ({second_file}) in {}", dir.display())]
    MultiplePackages
    {
        dir: PathBuf,
        first: String,
        first_file: String,
        second: String,
        second_file: String,
    },

    #[error("{}: expected 'package', found {found}", path.display())]
    MissingPackageClause { path: PathBuf, found: String },
}

/// No function declaration encloses the queried position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("no containing function at: {filename}:{line}:{column}")]
pub struct NoContainingFunctionError
{
    pub filename: String,
    pub line: usize,
    pub column: usize,
}
