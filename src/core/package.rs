//! Package resolution for a single directory.
//!
//! Lists the directory's `.go` files, drops those the environment
//! excludes, and sorts the rest into library, in-package test and
//! external test files. Contents are read through the environment so an
//! overlay can change a file's package clause or constraints.

use std::path::{Path, PathBuf};

use tracing::{debug, instrument, trace};

use crate::{
    core::{
        constraint::scan_header,
        env::BuildEnv,
        error::{Error, ImportError, Result},
    },
    infra::walk::FileWalker,
};

/// Package metadata for one directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Package
{
    /// Package name (without any `_test` suffix)
    pub name: String,
    pub dir: PathBuf,
    /// Non-test sources
    pub go_files: Vec<String>,
    /// `_test.go` files in the package itself
    pub test_go_files: Vec<String>,
    /// `_test.go` files in the `<name>_test` package
    pub xtest_go_files: Vec<String>,
    /// Files excluded by the environment
    pub ignored_go_files: Vec<String>,
}

impl Package
{
    /// In-package tests followed by external tests.
    pub fn all_test_files(&self) -> Vec<String>
    {
        self.test_go_files
            .iter()
            .chain(&self.xtest_go_files)
            .cloned()
            .collect()
    }
}

/// Resolve the package in `dir` under `env`.
#[instrument(level = "debug", skip(env), fields(goos = %env.goos, goarch = %env.goarch))]
pub fn import_dir(
    env: &BuildEnv,
    dir: &Path,
) -> Result<Package>
{
    if !dir.is_dir()
    {
        return Err(ImportError::NotFound(dir.to_path_buf()).into());
    }

    let names = FileWalker::new()
        .with_extension("go")
        .list_files(dir)
        .map_err(|e| Error::Read { path: dir.to_path_buf(), reason: format!("{e:#}") })?;

    let mut pkg = Package { dir: dir.to_path_buf(), ..Package::default() };
    let mut first_file = String::new();
    let mut saw_go = false;

    for name in names
    {
        if name.starts_with('_') || name.starts_with('.')
        {
            continue;
        }
        saw_go = true;

        let path = dir.join(&name);
        let src = env.read_file(&path)?;
        let header = scan_header(&src)
            .map_err(|reason| Error::Constraint { path: path.clone(), reason })?;

        if !env.matches_file(&name, &header)
        {
            trace!(file = %name, "excluded by build environment");
            pkg.ignored_go_files
                .push(name);
            continue;
        }

        let Some(mut declared) = header
            .package
            .clone()
        else
        {
            return Err(ImportError::MissingPackageClause {
                path,
                found: header
                    .unexpected
                    .unwrap_or_else(|| "EOF".to_string()),
            }
            .into());
        };

        if declared == "documentation"
        {
            pkg.ignored_go_files
                .push(name);
            continue;
        }

        let is_test = name.ends_with("_test.go");
        let mut is_xtest = false;
        if is_test && declared.ends_with("_test") && pkg.name != declared
        {
            is_xtest = true;
            declared.truncate(declared.len() - "_test".len());
        }

        if pkg
            .name
            .is_empty()
        {
            pkg.name = declared;
            first_file = name.clone();
        }
        else if declared != pkg.name
        {
            return Err(ImportError::MultiplePackages {
                dir: dir.to_path_buf(),
                first: pkg.name,
                first_file,
                second: declared,
                second_file: name,
            }
            .into());
        }

        if is_xtest
        {
            pkg.xtest_go_files
                .push(name);
        }
        else if is_test
        {
            pkg.test_go_files
                .push(name);
        }
        else
        {
            pkg.go_files
                .push(name);
        }
    }

    if pkg
        .name
        .is_empty()
    {
        let err = if saw_go && !pkg.ignored_go_files.is_empty()
        {
            ImportError::ConstraintsExcludeAll(dir.to_path_buf())
        }
        else
        {
            ImportError::NoGoFiles(dir.to_path_buf())
        };
        return Err(err.into());
    }

    debug!(
        name = %pkg.name,
        files = pkg.go_files.len(),
        tests = pkg.test_go_files.len(),
        xtests = pkg.xtest_go_files.len(),
        "resolved package"
    );
    Ok(pkg)
}
