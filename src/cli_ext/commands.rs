//! CLI command handlers.
//!
//! Each handler takes the parsed arguments plus the environments built
//! once in `main`: `base` is the process default that reports are diffed
//! against, `env` is `base` with the global flags and overlay applied.

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::{
    cli::{AppContext, BuildFlags, EnvArgs, EnvFormat, EscapeArgs, FunctionArgs, ListArgs, RunArgs},
    core::{
        discover::discover,
        env::{BuildEnv, EnvDiff, TagSet},
        escape::escape_path,
        overlay::Overlay,
        position::containing_function,
        query::parse_query,
        runner::{TestConfig, TestRunner},
    },
    infra::{config::Config, paths::absolute_clean},
};

/// Environments shared by every command.
#[derive(Debug, Clone)]
pub struct Session
{
    pub base: BuildEnv,
    pub env: BuildEnv,
}

impl Session
{
    /// Baseline from the process plus the global build flags.
    pub fn from_flags(
        flags: &BuildFlags,
        config: &Config,
    ) -> Result<Self>
    {
        let base = BuildEnv::from_process(config);
        let env = apply_flags(base.clone(), flags)?;
        Ok(Self { base, env })
    }
}

/// Derive an environment from `base` with the global flags applied.
pub fn apply_flags(
    base: BuildEnv,
    flags: &BuildFlags,
) -> Result<BuildEnv>
{
    let mut env = base;
    if let Some(goos) = &flags.goos
    {
        env = env.with_goos(goos);
    }
    if let Some(goarch) = &flags.goarch
    {
        env = env.with_goarch(goarch);
    }
    if let Some(cgo) = flags.cgo
    {
        env = env.with_cgo(cgo);
    }
    if let Some(tags) = &flags.tags
    {
        env = env.with_build_tags(TagSet::parse(tags));
    }
    if let Some(spec) = &flags.overlay
        && let Some(overlay) = load_overlay(spec)?
    {
        debug!(entries = overlay.len(), "overlay loaded");
        env = env.with_overlay(overlay);
    }
    Ok(env)
}

/// Parse `--overlay`: inline JSON when it looks like an object,
/// otherwise the path of a JSON file.
pub fn load_overlay(spec: &str) -> Result<Option<Overlay>>
{
    let trimmed = spec.trim();
    if trimmed.is_empty()
    {
        return Ok(None);
    }

    let text = if trimmed.starts_with('{')
    {
        trimmed.to_string()
    }
    else
    {
        fs::read_to_string(trimmed).with_context(|| format!("Failed to read overlay file {trimmed}"))?
    };

    Ok(Overlay::from_json(&text)?)
}

/// `list [PATH]`
#[instrument(skip_all)]
pub fn list(
    args: ListArgs,
    session: &Session,
) -> Result<()>
{
    let path = args
        .path
        .unwrap_or_else(|| PathBuf::from("."));
    let path = absolute_clean(&path).with_context(|| format!("Failed to resolve {}", path.display()))?;

    // A file picks its own environment; a directory uses the flags as given
    let (env, dir) = if path.is_dir()
    {
        (session.env.clone(), path)
    }
    else
    {
        let env = session
            .env
            .resolve_for(&path)?;
        let dir = parent_dir(&path);
        (env, dir)
    };

    let report = discover(&env, &session.base, &dir)?;
    print_json(&report)
}

/// `env FILE`
#[instrument(skip_all)]
pub fn env(
    args: EnvArgs,
    session: &Session,
    ctx: &AppContext,
) -> Result<()>
{
    let file = absolute_clean(&args.file).with_context(|| format!("Failed to resolve {}", args.file.display()))?;
    let resolved = session
        .env
        .resolve_for(&file)?;
    let diff = EnvDiff::between(&session.base, &resolved);

    match args.format
    {
        EnvFormat::Json => print_json(&diff),
        EnvFormat::Text =>
        {
            let mut out = io::stdout().lock();
            for (key, value) in diff.entries()
            {
                if ctx.no_color
                {
                    writeln!(out, "{key}={value}")?;
                }
                else
                {
                    writeln!(out, "{}={}", key.cyan().bold(), value.green())?;
                }
            }
            Ok(())
        }
    }
}

/// Response of the `function` command; lookup failures go in `error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionResponse
{
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Resolve a `path:line:column` query. Only query and read failures are
/// errors; every lookup outcome is a successful response.
pub fn lookup_function(
    query: &str,
    env: &BuildEnv,
) -> Result<FunctionResponse>
{
    let q = parse_query(query)?;
    let src = env.read_file(&q.path)?;

    Ok(match containing_function(&q.path, Some(&src), q.line, q.column)
    {
        Ok(name) => FunctionResponse { name, error: None },
        Err(e) => FunctionResponse { name: String::new(), error: Some(e.to_string()) },
    })
}

/// `function PATH:LINE:COL`
#[instrument(skip_all)]
pub fn function(
    args: FunctionArgs,
    session: &Session,
) -> Result<()>
{
    let response = lookup_function(&args.query, &session.env)?;
    print_json(&response)
}

/// `escape PATH...`
pub fn escape(args: EscapeArgs) -> Result<()>
{
    let mut out = io::stdout().lock();
    for path in &args.paths
    {
        writeln!(out, "{}", escape_path(path))?;
    }
    Ok(())
}

/// `run [DIR] [-- ARGS]`
#[instrument(skip_all)]
pub fn run(
    args: RunArgs,
    session: &Session,
    config: &Config,
) -> Result<()>
{
    let dir = absolute_clean(&args.dir).with_context(|| format!("Failed to resolve {}", args.dir.display()))?;

    let test_config = TestConfig {
        verbose: args.test_verbose,
        short: args.short,
        race: args.race,
        run: args.run,
        compile_dir: args.compile,
        extra_args: args.args,
    };

    TestRunner::new(&config.go_command, test_config).run(&session.env, &dir)?;
    Ok(())
}

fn parent_dir(file: &Path) -> PathBuf
{
    file.parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// One JSON document per line on stdout.
fn print_json<T: Serialize>(value: &T) -> Result<()>
{
    let mut out = io::stdout().lock();
    serde_json::to_writer(&mut out, value).context("Failed to write JSON")?;
    writeln!(out)?;
    Ok(())
}
