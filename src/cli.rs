use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Shared application context for global flags
#[derive(Clone, Debug)]
pub struct AppContext {
    pub quiet: bool,    // global --quiet
    pub no_color: bool, // global --no-color
}

#[derive(Parser)]
#[command(name = "gotest-util")]
#[command(about = "Editor helper for Go tests: discovery, build environments and cursor lookup")]
#[command(version, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub build: BuildFlags,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

/// Flags that shape the build environment for every command
#[derive(Debug, Clone, Default, Args)]
pub struct BuildFlags {
    /// Build tags, comma separated (replaces configured tags)
    #[arg(long, global = true, value_name = "TAGS")]
    pub tags: Option<String>,

    /// Target operating system
    #[arg(long, global = true, value_name = "GOOS")]
    pub goos: Option<String>,

    /// Target architecture
    #[arg(long, global = true, value_name = "GOARCH")]
    pub goarch: Option<String>,

    /// Enable or disable cgo (true/false)
    #[arg(long, global = true, value_name = "BOOL")]
    pub cgo: Option<bool>,

    /// Unsaved file contents: inline JSON or a path to a JSON file
    /// of the form {"replace": {"<path>": "<content>"}}
    #[arg(long, global = true, value_name = "JSON|FILE")]
    pub overlay: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List tests, benchmarks, examples and fuzz targets of a package
    List(ListArgs),

    /// Print the Go environment matching FILE
    #[command(alias = "environment")]
    Env(EnvArgs),

    /// Print the function containing a cursor position
    Function(FunctionArgs),

    /// Print the test binary name for package paths
    Escape(EscapeArgs),

    /// Run `go test` for a package
    Run(RunArgs),

    /// Initialize a gotest-util.toml config file
    Init(InitArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Debug, Parser)]
pub struct ListArgs {
    /// Package directory, or a file whose build environment is matched first
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum EnvFormat {
    #[default]
    Json,
    Text,
}

#[derive(Debug, Parser)]
pub struct EnvArgs {
    /// Go source file
    pub file: PathBuf,

    /// Output format
    #[arg(long, value_enum, default_value_t = EnvFormat::Json)]
    pub format: EnvFormat,
}

#[derive(Debug, Parser)]
#[command(after_help = "Example: gotest-util function ./main.go:12:8")]
pub struct FunctionArgs {
    /// Cursor position (format: path:line:column)
    #[arg(value_name = "PATH:LINE:COL")]
    pub query: String,
}

#[derive(Debug, Parser)]
pub struct EscapeArgs {
    /// Package paths to turn into binary names
    #[arg(required = true)]
    pub paths: Vec<String>,
}

#[derive(Debug, Parser)]
pub struct RunArgs {
    /// Package directory
    #[arg(default_value = ".")]
    pub dir: PathBuf,

    /// Pass -v to go test
    #[arg(long)]
    pub test_verbose: bool,

    /// Pass -short to go test
    #[arg(long)]
    pub short: bool,

    /// Enable the race detector
    #[arg(long)]
    pub race: bool,

    /// Only run tests matching this pattern
    #[arg(long, value_name = "REGEXP")]
    pub run: Option<String>,

    /// Compile the test binary into DIR instead of running it
    #[arg(long, value_name = "DIR")]
    pub compile: Option<PathBuf>,

    /// Extra arguments passed through to go test
    #[arg(last = true)]
    pub args: Vec<String>,
}

#[derive(Parser)]
pub struct InitArgs {
    /// Directory to initialize config in
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Overwrite existing config file
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

#[derive(Parser)]
pub struct CompletionsArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,

    /// Output directory; if omitted and --stdout not set, prints error
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Print completion script to stdout instead of a file
    #[arg(long)]
    pub stdout: bool,
}
