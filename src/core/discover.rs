//! Test declaration discovery for one package directory.
//!
//! Every test file of the package is parsed on the rayon pool; each task
//! returns its own declarations and the merge happens afterwards in file
//! order, so the first failing file decides the error.

use std::path::Path;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::{
    core::{
        env::{BuildEnv, EnvDiff},
        error::Result,
        package::import_dir,
        project::find_project_root,
    },
    infra::paths::clean_path,
    parsers::go_parser::{FuncDecl, GoParser},
};

/// One test-like declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Declaration
{
    pub name: String,
    pub filename: String,
    pub line: usize,
    #[serde(rename = "comment", skip_serializing_if = "String::is_empty")]
    pub doc: String,
}

/// Kind of test function, decided by name prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category
{
    Test,
    Benchmark,
    Example,
    Fuzz,
}

impl Category
{
    /// Prefixes in match priority order.
    const PREFIXES: [(&'static str, Category); 4] = [
        ("Test", Category::Test),
        ("Benchmark", Category::Benchmark),
        ("Example", Category::Example),
        ("Fuzz", Category::Fuzz),
    ];

    /// Case-sensitive prefix match; `None` for helpers.
    pub fn classify(name: &str) -> Option<Self>
    {
        Self::PREFIXES
            .iter()
            .find(|(prefix, _)| name.starts_with(prefix))
            .map(|(_, c)| *c)
    }
}

/// Result of [`discover`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiscoveryReport
{
    pub pkg_name: String,
    pub pkg_root: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub go_env: Option<EnvDiff>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tests: Vec<Declaration>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub benchmarks: Vec<Declaration>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<Declaration>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fuzz: Vec<Declaration>,
}

impl DiscoveryReport
{
    fn push(
        &mut self,
        category: Category,
        decl: Declaration,
    )
    {
        let bucket = match category
        {
            Category::Test => &mut self.tests,
            Category::Benchmark => &mut self.benchmarks,
            Category::Example => &mut self.examples,
            Category::Fuzz => &mut self.fuzz,
        };
        bucket.push(decl);
    }

    fn sort(&mut self)
    {
        for bucket in [&mut self.tests, &mut self.benchmarks, &mut self.examples, &mut self.fuzz]
        {
            bucket.sort_by(|a, b| a.name.cmp(&b.name));
        }
    }
}

/// List the Test/Benchmark/Example/Fuzz functions of the package in
/// `dir`, built under `env`. `base` is the default environment the
/// report's `go_env` diff is computed against.
#[instrument(level = "debug", skip(env, base), fields(goos = %env.goos, goarch = %env.goarch))]
pub fn discover(
    env: &BuildEnv,
    base: &BuildEnv,
    dir: &Path,
) -> Result<DiscoveryReport>
{
    let pkg = import_dir(env, dir)?;

    let pkg_root = match find_project_root(env, dir)
    {
        Ok(root) => root,
        Err(e) =>
        {
            debug!(error = %e, "no project root, using package directory");
            clean_path(dir)
        }
    };

    let mut report = DiscoveryReport {
        pkg_name: pkg
            .name
            .clone(),
        pkg_root: pkg_root
            .to_string_lossy()
            .into_owned(),
        ..DiscoveryReport::default()
    };

    let names = pkg.all_test_files();
    if names.is_empty()
    {
        debug!(pkg = %pkg.name, "package has no test files");
        return Ok(report);
    }

    let parser = GoParser::new();
    let results: Vec<Result<Vec<(Category, Declaration)>>> = names
        .par_iter()
        .map(|name| scan_file(env, &parser, &dir.join(name)))
        .collect();

    // Aggregate, short-circuiting on first error
    for r in results
    {
        for (category, decl) in r?
        {
            report.push(category, decl);
        }
    }

    report.sort();
    report.go_env = Some(EnvDiff::between(base, env));

    debug!(
        tests = report.tests.len(),
        benchmarks = report.benchmarks.len(),
        examples = report.examples.len(),
        fuzz = report.fuzz.len(),
        "discovery finished"
    );
    Ok(report)
}

/// Parse one file and classify its function declarations.
fn scan_file(
    env: &BuildEnv,
    parser: &GoParser,
    path: &Path,
) -> Result<Vec<(Category, Declaration)>>
{
    let source = env.read_file(path)?;
    let parsed = parser.parse(path, source)?;
    parsed.ensure_clean()?;

    let filename = path
        .to_string_lossy()
        .into_owned();

    Ok(parsed
        .function_decls()
        .into_iter()
        .filter_map(|d: FuncDecl| {
            let category = Category::classify(&d.name)?;
            Some((
                category,
                Declaration { name: d.name, filename: filename.clone(), line: d.line, doc: d.doc },
            ))
        })
        .collect())
}
