//! Shell completion scripts for the `gotest-util` binary.

use std::{fs, io, path::PathBuf};

use anyhow::{Context, Result};
use clap::CommandFactory;
use clap_complete::{Shell as CompletionShell, generate, generate_to};

use crate::cli::{AppContext, Cli, CompletionsArgs, Shell};

/// Binary name the scripts complete
const BIN_NAME: &str = "gotest-util";

impl From<Shell> for CompletionShell {
    fn from(shell: Shell) -> Self {
        match shell {
            Shell::Bash => CompletionShell::Bash,
            Shell::Zsh => CompletionShell::Zsh,
            Shell::Fish => CompletionShell::Fish,
            Shell::PowerShell => CompletionShell::PowerShell,
            Shell::Elvish => CompletionShell::Elvish,
        }
    }
}

/// Write the script for `args.shell` to stdout or into `--out-dir`.
pub fn run(args: CompletionsArgs, ctx: &AppContext) -> Result<()> {
    let shell: CompletionShell = args.shell.into();

    if args.stdout {
        write_script(shell, &mut io::stdout());
        return Ok(());
    }

    let dir = args
        .out_dir
        .context("--out-dir is required unless --stdout is set")?;
    let path = write_script_to(shell, dir)?;

    if !ctx.quiet {
        eprintln!("Wrote completion to {}", path.display());
    }
    Ok(())
}

fn write_script(shell: CompletionShell, out: &mut dyn io::Write) {
    generate(shell, &mut Cli::command(), BIN_NAME, out);
}

fn write_script_to(shell: CompletionShell, dir: PathBuf) -> Result<PathBuf> {
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    generate_to(shell, &mut Cli::command(), BIN_NAME, &dir).context("generate completion file")
}
