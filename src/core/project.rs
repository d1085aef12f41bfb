//! Project root discovery for a package directory.

use std::path::{Path, PathBuf};

use tracing::trace;

use crate::{
    core::{
        env::BuildEnv,
        error::{Error, Result},
    },
    infra::paths::absolute_clean,
};

/// Module marker looked up in each ancestor
const MODULE_FILE: &str = "go.mod";

/// Root of the project containing `dir`, tried in order:
/// nearest ancestor holding `go.mod`, then the `src` directory of GOROOT
/// or of a GOPATH entry that contains `dir`.
pub fn find_project_root(
    env: &BuildEnv,
    dir: &Path,
) -> Result<PathBuf>
{
    let start = absolute_clean(dir).map_err(|e| Error::io(dir, e))?;
    let start = dunce::canonicalize(&start).unwrap_or(start);

    // 1) ascend to the nearest go.mod
    let mut cur = Some(start.as_path());
    while let Some(d) = cur
    {
        if d.join(MODULE_FILE)
            .is_file()
        {
            trace!(root = %d.display(), "found module root");
            return Ok(d.to_path_buf());
        }
        cur = d.parent();
    }

    // 2) GOROOT/src, then each GOPATH entry's src
    let mut roots = Vec::new();
    if !env
        .goroot
        .is_empty()
    {
        roots.push(Path::new(&env.goroot).join("src"));
    }
    roots.extend(
        std::env::split_paths(&env.gopath)
            .filter(|p| !p.as_os_str().is_empty())
            .map(|p| p.join("src")),
    );

    for src in roots
    {
        let src = dunce::canonicalize(&src).unwrap_or(src);
        if start.starts_with(&src)
        {
            trace!(root = %src.display(), "found GOPATH-style root");
            return Ok(src);
        }
    }

    Err(Error::NoProjectRoot(start))
}

#[cfg(test)]
mod tests
{
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::infra::config::Config;

    fn env(
        goroot: &str,
        gopath: &str,
    ) -> BuildEnv
    {
        let mut e = BuildEnv::from_vars(|_| None, &Config::default());
        e.goroot = goroot.to_string();
        e.gopath = gopath.to_string();
        e
    }

    #[test]
    fn nearest_go_mod_wins() -> anyhow::Result<()>
    {
        let tmp = TempDir::new()?;
        let root = dunce::canonicalize(tmp.path())?;
        fs::write(root.join("go.mod"), "module example.com/m\n")?;
        fs::create_dir_all(root.join("inner/pkg"))?;
        fs::write(root.join("inner/go.mod"), "module example.com/inner\n")?;

        let found = find_project_root(&env("", ""), &root.join("inner/pkg"))?;
        assert_eq!(found, root.join("inner"));
        Ok(())
    }

    #[test]
    fn gopath_src_is_a_root() -> anyhow::Result<()>
    {
        let tmp = TempDir::new()?;
        let gopath = dunce::canonicalize(tmp.path())?;
        let pkg = gopath.join("src/example.com/p");
        fs::create_dir_all(&pkg)?;

        let found = find_project_root(&env("", &gopath.to_string_lossy()), &pkg)?;
        assert_eq!(found, gopath.join("src"));
        Ok(())
    }

    #[test]
    fn no_marker_is_an_error() -> anyhow::Result<()>
    {
        let tmp = TempDir::new()?;
        let err = find_project_root(&env("", ""), tmp.path()).unwrap_err();
        assert!(matches!(err, Error::NoProjectRoot(_)));
        Ok(())
    }
}
