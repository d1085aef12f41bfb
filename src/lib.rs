//! **gotest-util** - Go test discovery and cursor lookup for editors
//!
//! Lists the tests of a package, matches the build environment a file
//! needs, and maps a cursor to its enclosing function, all without
//! invoking the Go compiler. Unsaved editor buffers are honoured through
//! an overlay.

/// Command-line interface with clap integration
pub mod cli;

/// Command handlers behind the CLI
pub mod cli_ext {
    /// list/env/function/escape/run handlers and JSON output
    pub mod commands;
}

/// Shell completion generation
pub mod completion;

/// Domain pipeline - environments, packages, discovery and positions
pub mod core {
    /// Error taxonomy shared by every domain module
    pub mod error;
    pub use error::{Error, ImportError, NoContainingFunctionError, QueryError, Result};

    /// Test binary names derived from package paths
    pub mod escape;
    pub use escape::escape_path;

    /// `//go:build` expressions, `// +build` lines and file name suffixes
    pub mod constraint;

    /// Unsaved-buffer overlay with same-file alias lookup
    pub mod overlay;
    pub use overlay::Overlay;

    /// Build environment, environment matching and diffs
    pub mod env;
    pub use env::{BuildEnv, EnvDiff, TagSet};

    /// Package resolution for a directory
    pub mod package;
    pub use package::{Package, import_dir};

    /// Project root lookup (go.mod, GOROOT, GOPATH)
    pub mod project;
    pub use project::find_project_root;

    /// Parallel test declaration discovery
    pub mod discover;
    pub use discover::{Category, Declaration, DiscoveryReport, discover};

    /// Enclosing function for a cursor position
    pub mod position;
    pub use position::containing_function;

    /// `path:line:column` parsing
    pub mod query;
    pub use query::{PositionQuery, parse_query};

    /// `go test` invocation
    pub mod runner;
    pub use runner::{TestConfig, TestRunner};
}

/// Language processing - tree-sitter front-end
pub mod parsers {
    /// Go syntax trees, function declarations and doc comments
    pub mod go_parser;
    pub use go_parser::{FuncDecl, GoParser, ParsedFile};
}

/// Infrastructure - Configuration, I/O, and utilities
pub mod infra {
    /// Layered configuration (TOML file + GOTEST_UTIL_* variables)
    pub mod config;
    pub use config::{Config, init as config_init, load_config};

    /// Memory-mapped file I/O for large files (>1MB threshold)
    pub mod io;
    pub use io::{FileContent, read_file_smart};

    /// Go-style line accounting for line→byte mapping
    pub mod line_index;
    pub use line_index::NewlineIndex;

    /// Lexical path cleaning and base names
    pub mod paths;

    /// Single-directory file listing
    pub mod walk;
    pub use walk::FileWalker;
}

// Strategic re-exports for clean CLI interface
pub use crate::cli::{AppContext, Cli, Commands};
pub use crate::core::{BuildEnv, DiscoveryReport, Error, Overlay, discover};
pub use crate::infra::{Config, load_config};
