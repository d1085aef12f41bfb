//! `go test` invocation for a package directory.
//!
//! The runner only prepares and launches the command; its output goes
//! straight to the terminal and is never interpreted here.

use std::{
    path::{Path, PathBuf},
    process::Command,
};

use tracing::{debug, instrument};

use crate::core::{
    env::BuildEnv,
    error::{Error, Result},
    escape::escape_path,
};

/// Flags forwarded to `go test`.
#[derive(Debug, Clone, Default)]
pub struct TestConfig
{
    pub verbose: bool,
    pub short: bool,
    pub race: bool,
    /// `-run` pattern
    pub run: Option<String>,
    /// Build the test binary into this directory instead of running it
    pub compile_dir: Option<PathBuf>,
    /// Appended after the generated flags
    pub extra_args: Vec<String>,
}

/// Runs `go test` under a resolved [`BuildEnv`].
#[derive(Debug, Clone)]
pub struct TestRunner
{
    go_command: String,
    config: TestConfig,
}

impl TestRunner
{
    pub fn new(
        go_command: impl Into<String>,
        config: TestConfig,
    ) -> Self
    {
        Self { go_command: go_command.into(), config }
    }

    /// The command that [`TestRunner::run`] would spawn.
    pub fn command(
        &self,
        env: &BuildEnv,
        dir: &Path,
    ) -> Command
    {
        let mut cmd = Command::new(&self.go_command);
        cmd.current_dir(dir);
        cmd.arg("test");

        if let Some(out_dir) = &self
            .config
            .compile_dir
        {
            cmd.arg("-c")
                .arg("-o")
                .arg(out_dir.join(escape_path(&dir.to_string_lossy())));
        }
        if self
            .config
            .verbose
        {
            cmd.arg("-v");
        }
        if self
            .config
            .short
        {
            cmd.arg("-short");
        }
        if self
            .config
            .race
        {
            cmd.arg("-race");
        }
        if let Some(pattern) = &self
            .config
            .run
        {
            cmd.arg("-run")
                .arg(pattern);
        }
        cmd.args(&self.config.extra_args);

        // Export the build environment
        cmd.env("GOOS", &env.goos)
            .env("GOARCH", &env.goarch)
            .env("CGO_ENABLED", if env.cgo_enabled { "1" } else { "0" });
        if !env
            .goroot
            .is_empty()
        {
            cmd.env("GOROOT", &env.goroot);
        }
        if !env
            .gopath
            .is_empty()
        {
            cmd.env("GOPATH", &env.gopath);
        }
        if !env
            .build_tags
            .is_empty()
        {
            cmd.env("GOFLAGS", format!("-tags={}", env.build_tags));
        }
        if !env
            .tool_tags
            .is_empty()
        {
            let experiments: Vec<&str> = env
                .tool_tags
                .iter()
                .map(|t| t.strip_prefix("goexperiment.").unwrap_or(t))
                .collect();
            cmd.env("GOEXPERIMENT", experiments.join(","));
        }

        cmd
    }

    /// Run the tests in `dir`, inheriting stdout and stderr.
    #[instrument(level = "debug", skip(self, env), fields(goos = %env.goos, goarch = %env.goarch))]
    pub fn run(
        &self,
        env: &BuildEnv,
        dir: &Path,
    ) -> Result<()>
    {
        let mut cmd = self.command(env, dir);
        debug!(?cmd, "spawning go test");

        let status = cmd
            .status()
            .map_err(|source| Error::Spawn { program: self.go_command.clone(), source })?;

        if status.success()
        {
            Ok(())
        }
        else
        {
            Err(Error::TestFailed { program: self.go_command.clone(), status })
        }
    }
}

#[cfg(test)]
mod tests
{
    use std::ffi::OsStr;

    use super::*;
    use crate::{core::env::TagSet, infra::config::Config};

    fn env() -> BuildEnv
    {
        BuildEnv::from_vars(|_| None, &Config::default())
            .with_goos("linux")
            .with_goarch("arm64")
            .with_cgo(false)
            .with_build_tags(TagSet::parse("integration,slow"))
    }

    fn args(cmd: &Command) -> Vec<String>
    {
        cmd.get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    fn env_var<'a>(
        cmd: &'a Command,
        key: &str,
    ) -> Option<&'a OsStr>
    {
        cmd.get_envs()
            .find(|(k, _)| *k == key)
            .and_then(|(_, v)| v)
    }

    #[test]
    fn flags_and_environment_are_exported()
    {
        let runner = TestRunner::new(
            "go",
            TestConfig {
                verbose: true,
                race: true,
                run: Some("^TestA$".into()),
                extra_args: vec!["-count=1".into()],
                ..TestConfig::default()
            },
        );
        let cmd = runner.command(&env(), Path::new("/ws/p"));

        assert_eq!(cmd.get_program(), OsStr::new("go"));
        assert_eq!(cmd.get_current_dir(), Some(Path::new("/ws/p")));
        assert_eq!(args(&cmd), ["test", "-v", "-race", "-run", "^TestA$", "-count=1"]);
        assert_eq!(env_var(&cmd, "GOOS"), Some(OsStr::new("linux")));
        assert_eq!(env_var(&cmd, "GOARCH"), Some(OsStr::new("arm64")));
        assert_eq!(env_var(&cmd, "CGO_ENABLED"), Some(OsStr::new("0")));
        assert_eq!(env_var(&cmd, "GOFLAGS"), Some(OsStr::new("-tags=integration,slow")));
        assert_eq!(env_var(&cmd, "GOEXPERIMENT"), None);
    }

    #[test]
    fn compile_mode_names_the_binary_after_the_package()
    {
        let runner = TestRunner::new(
            "go",
            TestConfig { compile_dir: Some(PathBuf::from("/tmp/bin")), ..TestConfig::default() },
        );
        let cmd = runner.command(&env(), Path::new("/ws/p"));

        assert_eq!(args(&cmd), ["test", "-c", "-o", "/tmp/bin/%ws%p"]);
    }

    #[test]
    fn experiments_are_exported_without_prefix()
    {
        let mut e = env();
        e.tool_tags = TagSet::parse("goexperiment.rangefunc,goexperiment.arenas");

        let cmd = TestRunner::new("go", TestConfig::default()).command(&e, Path::new("."));
        assert_eq!(env_var(&cmd, "GOEXPERIMENT"), Some(OsStr::new("rangefunc,arenas")));
    }

    #[cfg(unix)]
    #[test]
    fn missing_program_is_a_spawn_error()
    {
        let runner = TestRunner::new("gotest-util-no-such-go", TestConfig::default());
        let err = runner
            .run(&env(), Path::new("."))
            .unwrap_err();
        assert!(matches!(err, Error::Spawn { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn non_zero_exit_is_an_error()
    {
        let runner = TestRunner::new("false", TestConfig::default());
        let err = runner
            .run(&env(), Path::new("."))
            .unwrap_err();
        assert!(matches!(err, Error::TestFailed { .. }));
    }
}
