//! Build environment: target platform, roots, cgo and tag sets.
//!
//! A [`BuildEnv`] is built once from the process environment and the
//! loaded config, then only ever derived from (`with_*`, [`BuildEnv::resolve_for`]);
//! nothing mutates a value after it is handed to discovery or resolution.

use std::{
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};

use indexmap::IndexSet;
use itertools::Itertools;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::{
    core::{
        constraint::{
            self, FileHeader, NameConstraint, is_known_arch, is_known_os, name_constraint,
            scan_header,
        },
        error::{Error, Result},
        overlay::Overlay,
    },
    infra::{config::Config, io::read_source},
};

/// Upper bound on free tags the resolver will toggle.
const MAX_FREE_TAGS: usize = 8;

/// Platforms tried when a constraint needs "some other" GOOS.
const FALLBACK_OS: &[&str] = &["linux", "darwin", "windows", "freebsd"];

/// Architectures tried when a constraint needs "some other" GOARCH.
const FALLBACK_ARCH: &[&str] = &["amd64", "arm64", "386"];

/// Insertion-ordered tag set; equality ignores order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSet(IndexSet<String>);

impl TagSet
{
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Parse a comma or space separated list, dropping empties.
    pub fn parse(list: &str) -> Self
    {
        list.split([',', ' '])
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn contains(
        &self,
        tag: &str,
    ) -> bool
    {
        self.0
            .contains(tag)
    }

    pub fn insert(
        &mut self,
        tag: impl Into<String>,
    ) -> bool
    {
        self.0
            .insert(tag.into())
    }

    pub fn remove(
        &mut self,
        tag: &str,
    ) -> bool
    {
        self.0
            .shift_remove(tag)
    }

    pub fn is_empty(&self) -> bool
    {
        self.0
            .is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str>
    {
        self.0
            .iter()
            .map(String::as_str)
    }
}

impl FromIterator<String> for TagSet
{
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self
    {
        Self(iter
            .into_iter()
            .collect())
    }
}

impl fmt::Display for TagSet
{
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result
    {
        write!(f, "{}", self.0.iter().join(","))
    }
}

/// Resolved build environment.
#[derive(Debug, Clone)]
pub struct BuildEnv
{
    pub goos: String,
    pub goarch: String,
    pub goroot: String,
    pub gopath: String,
    pub cgo_enabled: bool,
    /// Tags from `-tags`
    pub build_tags: TagSet,
    /// Toolchain tags, e.g. `goexperiment.rangefunc`
    pub tool_tags: TagSet,
    /// `go1.1` .. `go1.N`
    pub release_tags: Vec<String>,
    /// Compiler name matched by its own tag
    pub compiler: String,
    /// Directory the environment was resolved for
    pub dir: Option<PathBuf>,
    overlay: Option<Arc<Overlay>>,
}

/// Go name of the operating system this binary runs on.
pub fn host_os() -> &'static str
{
    match std::env::consts::OS
    {
        "macos" => "darwin",
        other => other,
    }
}

/// Go name of the architecture this binary runs on.
pub fn host_arch() -> &'static str
{
    let little = cfg!(target_endian = "little");
    match std::env::consts::ARCH
    {
        "x86_64" => "amd64",
        "x86" => "386",
        "aarch64" => "arm64",
        "loongarch64" => "loong64",
        "powerpc" => "ppc",
        "powerpc64" if little => "ppc64le",
        "powerpc64" => "ppc64",
        "mips" if little => "mipsle",
        "mips64" if little => "mips64le",
        "wasm32" => "wasm",
        other => other,
    }
}

impl BuildEnv
{
    /// Baseline from the real process environment.
    pub fn from_process(config: &Config) -> Self
    {
        Self::from_vars(|k| std::env::var(k).ok(), config)
    }

    /// Baseline from an arbitrary variable source.
    pub fn from_vars(
        var: impl Fn(&str) -> Option<String>,
        config: &Config,
    ) -> Self
    {
        let non_empty = |k: &str| var(k).filter(|v| !v.trim().is_empty());

        let goos = non_empty("GOOS").unwrap_or_else(|| host_os().to_string());
        let goarch = non_empty("GOARCH").unwrap_or_else(|| host_arch().to_string());
        let native = goos == host_os() && goarch == host_arch();

        let cgo_enabled = match non_empty("CGO_ENABLED").as_deref()
        {
            Some("1") => true,
            Some("0") => false,
            _ => native,
        };

        let gopath = non_empty("GOPATH")
            .or_else(|| non_empty("HOME").map(|h| Path::new(&h).join("go").to_string_lossy().into_owned()))
            .unwrap_or_default();

        let tool_tags = non_empty("GOEXPERIMENT")
            .map(|v| experiment_tags(&v))
            .unwrap_or_default();

        Self {
            goos,
            goarch,
            goroot: non_empty("GOROOT").unwrap_or_default(),
            gopath,
            cgo_enabled,
            build_tags: config
                .tags
                .iter()
                .cloned()
                .collect(),
            tool_tags,
            release_tags: release_tags(config.go_minor),
            compiler: "gc".to_string(),
            dir: None,
            overlay: None,
        }
    }

    pub fn with_goos(
        mut self,
        goos: impl Into<String>,
    ) -> Self
    {
        self.goos = goos.into();
        self
    }

    pub fn with_goarch(
        mut self,
        goarch: impl Into<String>,
    ) -> Self
    {
        self.goarch = goarch.into();
        self
    }

    pub fn with_cgo(
        mut self,
        enabled: bool,
    ) -> Self
    {
        self.cgo_enabled = enabled;
        self
    }

    pub fn with_build_tags(
        mut self,
        tags: TagSet,
    ) -> Self
    {
        self.build_tags = tags;
        self
    }

    pub fn with_dir(
        mut self,
        dir: impl Into<PathBuf>,
    ) -> Self
    {
        self.dir = Some(dir.into());
        self
    }

    /// Derive an environment whose file reads consult `overlay` first.
    pub fn with_overlay(
        mut self,
        overlay: Overlay,
    ) -> Self
    {
        self.overlay = Some(Arc::new(overlay));
        self
    }

    pub fn overlay(&self) -> Option<&Overlay>
    {
        self.overlay
            .as_deref()
    }

    /// Read a source file, honouring the overlay.
    pub fn read_file(
        &self,
        path: &Path,
    ) -> Result<String>
    {
        if let Some(content) = self
            .overlay
            .as_deref()
            .and_then(|o| o.lookup(path))
        {
            return Ok(content.to_string());
        }
        read_source(path).map_err(|e| Error::Read { path: path.to_path_buf(), reason: format!("{e:#}") })
    }

    /// Whether a single constraint tag holds.
    pub fn matches_tag(
        &self,
        tag: &str,
    ) -> bool
    {
        if tag == "cgo"
        {
            return self.cgo_enabled;
        }
        if tag == self.goos || tag == self.goarch || tag == self.compiler
        {
            return true;
        }
        let implied = match tag
        {
            "unix" => constraint::UNIX_OS.contains(&self.goos.as_str()),
            "linux" => self.goos == "android",
            "solaris" => self.goos == "illumos",
            "darwin" => self.goos == "ios",
            _ => false,
        };
        implied
            || self
                .build_tags
                .contains(tag)
            || self
                .tool_tags
                .contains(tag)
            || self
                .release_tags
                .iter()
                .any(|t| t == tag)
    }

    /// Whether a file with this name and header is part of the build.
    pub fn matches_file(
        &self,
        file_name: &str,
        header: &FileHeader,
    ) -> bool
    {
        let ok = |t: &str| self.matches_tag(t);
        (self.cgo_enabled || !header.imports_c)
            && constraint::name_matches(file_name, &ok)
            && header
                .constraint
                .as_ref()
                .is_none_or(|c| c.eval(&ok))
    }

    /// Find the environment under which `file` builds, with `dir` set to
    /// the file's directory. The current environment wins when it already
    /// matches; otherwise the cheapest change to GOOS, GOARCH, cgo and the
    /// tags the file mentions is chosen.
    #[instrument(level = "debug", skip(self), fields(goos = %self.goos, goarch = %self.goarch))]
    pub fn resolve_for(
        &self,
        file: &Path,
    ) -> Result<BuildEnv>
    {
        let name = file
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::Match {
                path: file.to_path_buf(),
                reason: "not a file name".to_string(),
            })?;
        let dir = file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let src = self.read_file(file)?;
        let header = scan_header(&src).map_err(|reason| Error::Match {
            path: file.to_path_buf(),
            reason: format!("invalid build constraint: {reason}"),
        })?;

        if self.matches_file(name, &header)
        {
            return Ok(self
                .clone()
                .with_dir(dir));
        }

        let found = self
            .candidates(name, &header)
            .into_iter()
            .find(|env| env.matches_file(name, &header));

        match found
        {
            Some(env) =>
            {
                debug!(goos = %env.goos, goarch = %env.goarch, tags = %env.build_tags, "matched build environment");
                Ok(env.with_dir(dir))
            }
            None => Err(Error::Match {
                path: file.to_path_buf(),
                reason: match &header.constraint
                {
                    Some(c) => format!("no build environment satisfies constraint: {c}"),
                    None if header.imports_c => "file requires cgo".to_string(),
                    None => "file name excludes every known platform".to_string(),
                },
            }),
        }
    }

    /// Candidate environments, cheapest change first.
    fn candidates(
        &self,
        name: &str,
        header: &FileHeader,
    ) -> Vec<BuildEnv>
    {
        let mut mentioned: Vec<String> = match name_constraint(name)
        {
            NameConstraint::None => Vec::new(),
            NameConstraint::Os(t) | NameConstraint::Arch(t) => vec![t.to_string()],
            NameConstraint::OsArch(os, arch) => vec![os.to_string(), arch.to_string()],
        };
        if let Some(c) = &header.constraint
        {
            for t in c.tags()
            {
                if !mentioned.contains(&t)
                {
                    mentioned.push(t);
                }
            }
        }

        let mut dims: Vec<Vec<(Choice, u32)>> = vec![
            self.os_choices(&mentioned),
            self.arch_choices(&mentioned),
        ];

        if header.imports_c
            || mentioned
                .iter()
                .any(|t| t == "cgo")
        {
            dims.push(vec![
                (Choice::Cgo(self.cgo_enabled), 0),
                (Choice::Cgo(!self.cgo_enabled), 1),
            ]);
        }

        for tag in mentioned
            .iter()
            .filter(|t| is_free_tag(t))
            .take(MAX_FREE_TAGS)
        {
            let on = self.matches_tag(tag);
            dims.push(vec![
                (Choice::Tag(tag.clone(), on), 0),
                (Choice::Tag(tag.clone(), !on), 1),
            ]);
        }

        let mut combos: Vec<(u32, Vec<Choice>)> = dims
            .into_iter()
            .map(|d| d.into_iter())
            .multi_cartesian_product()
            .map(|combo| {
                let cost: u32 = combo
                    .iter()
                    .map(|(_, c)| c)
                    .sum();
                (cost, combo.into_iter().map(|(ch, _)| ch).collect::<Vec<_>>())
            })
            .collect();
        combos.sort_by_key(|(cost, _)| *cost);

        combos
            .into_iter()
            .map(|(_, choices)| self.apply(choices))
            .collect()
    }

    fn os_choices(
        &self,
        mentioned: &[String],
    ) -> Vec<(Choice, u32)>
    {
        let mut out = vec![self.goos.clone()];
        out.extend(mentioned.iter().filter(|t| is_known_os(t)).cloned());
        if mentioned.iter().any(|t| t == "unix")
        {
            out.push("linux".to_string());
        }
        if let Some(other) = FALLBACK_OS
            .iter()
            .find(|o| !mentioned.iter().any(|m| m == *o) && **o != self.goos)
        {
            out.push(other.to_string());
        }
        dedup_with_cost(out, Choice::Goos)
    }

    fn arch_choices(
        &self,
        mentioned: &[String],
    ) -> Vec<(Choice, u32)>
    {
        let mut out = vec![self.goarch.clone()];
        out.extend(mentioned.iter().filter(|t| is_known_arch(t)).cloned());
        if let Some(other) = FALLBACK_ARCH
            .iter()
            .find(|a| !mentioned.iter().any(|m| m == *a) && **a != self.goarch)
        {
            out.push(other.to_string());
        }
        dedup_with_cost(out, Choice::Goarch)
    }

    fn apply(
        &self,
        choices: Vec<Choice>,
    ) -> BuildEnv
    {
        let mut env = self.clone();
        for choice in choices
        {
            match choice
            {
                Choice::Goos(v) => env.goos = v,
                Choice::Goarch(v) => env.goarch = v,
                Choice::Cgo(on) => env.cgo_enabled = on,
                Choice::Tag(tag, on) =>
                {
                    let set = if tag.starts_with("goexperiment.")
                    {
                        &mut env.tool_tags
                    }
                    else
                    {
                        &mut env.build_tags
                    };
                    if on
                    {
                        set.insert(tag);
                    }
                    else
                    {
                        set.remove(&tag);
                    }
                }
            }
        }
        env
    }
}

/// One decision in the environment search.
#[derive(Debug, Clone)]
enum Choice
{
    Goos(String),
    Goarch(String),
    Cgo(bool),
    Tag(String, bool),
}

/// First value is the current one (cost 0); later values cost 1.
fn dedup_with_cost(
    values: Vec<String>,
    make: impl Fn(String) -> Choice,
) -> Vec<(Choice, u32)>
{
    values
        .into_iter()
        .unique()
        .enumerate()
        .map(|(i, v)| (make(v), u32::from(i > 0)))
        .collect()
}

/// Tags the resolver may switch on or off freely.
fn is_free_tag(tag: &str) -> bool
{
    !(is_known_os(tag)
        || is_known_arch(tag)
        || is_release_tag(tag)
        || matches!(tag, "cgo" | "unix" | "gc" | "gccgo"))
}

fn is_release_tag(tag: &str) -> bool
{
    tag.strip_prefix("go1.")
        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

/// `go1.1` through `go1.<minor>`.
pub fn release_tags(minor: u32) -> Vec<String>
{
    (1..=minor)
        .map(|n| format!("go1.{n}"))
        .collect()
}

/// Tool tags for a GOEXPERIMENT value; `noX` entries disable and add nothing.
pub fn experiment_tags(value: &str) -> TagSet
{
    value
        .split(',')
        .map(str::trim)
        .filter(|e| !e.is_empty() && !e.starts_with("no"))
        .map(|e| format!("goexperiment.{e}"))
        .collect()
}

/// Fields of a [`BuildEnv`] that differ from a baseline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EnvDiff
{
    #[serde(rename = "GOARCH", skip_serializing_if = "Option::is_none")]
    pub goarch: Option<String>,
    #[serde(rename = "GOHOSTARCH", skip_serializing_if = "Option::is_none")]
    pub gohostarch: Option<String>,
    #[serde(rename = "GOOS", skip_serializing_if = "Option::is_none")]
    pub goos: Option<String>,
    #[serde(rename = "GOHOSTOS", skip_serializing_if = "Option::is_none")]
    pub gohostos: Option<String>,
    #[serde(rename = "GOROOT", skip_serializing_if = "Option::is_none")]
    pub goroot: Option<String>,
    #[serde(rename = "GOPATH", skip_serializing_if = "Option::is_none")]
    pub gopath: Option<String>,
    #[serde(rename = "CGO_ENABLED", skip_serializing_if = "Option::is_none")]
    pub cgo_enabled: Option<String>,
    #[serde(rename = "GOFLAGS", skip_serializing_if = "Option::is_none")]
    pub goflags: Option<String>,
    #[serde(rename = "GOEXPERIMENT", skip_serializing_if = "Option::is_none")]
    pub goexperiment: Option<String>,
}

impl EnvDiff
{
    /// Compare `env` against `base`. GOOS/GOARCH are also reported when
    /// they differ from the host, together with the host value.
    pub fn between(
        base: &BuildEnv,
        env: &BuildEnv,
    ) -> Self
    {
        let mut d = EnvDiff::default();

        if env.goarch != base.goarch || env.goarch != host_arch()
        {
            d.goarch = Some(env.goarch.clone());
            d.gohostarch = Some(host_arch().to_string());
        }
        if env.goos != base.goos || env.goos != host_os()
        {
            d.goos = Some(env.goos.clone());
            d.gohostos = Some(host_os().to_string());
        }
        if env.goroot != base.goroot
        {
            d.goroot = Some(env.goroot.clone());
        }
        if env.gopath != base.gopath
        {
            d.gopath = Some(env.gopath.clone());
        }
        if env.cgo_enabled != base.cgo_enabled
        {
            d.cgo_enabled = Some(env.cgo_enabled.to_string());
        }
        if env.build_tags != base.build_tags
        {
            d.goflags = Some(env.build_tags.to_string());
        }
        if env.tool_tags != base.tool_tags
        {
            d.goexperiment = Some(env.tool_tags.to_string());
        }
        d
    }

    pub fn is_empty(&self) -> bool
    {
        *self == EnvDiff::default()
    }

    /// Present fields as `(NAME, value)` in serialization order.
    pub fn entries(&self) -> Vec<(&'static str, &str)>
    {
        [
            ("GOARCH", &self.goarch),
            ("GOHOSTARCH", &self.gohostarch),
            ("GOOS", &self.goos),
            ("GOHOSTOS", &self.gohostos),
            ("GOROOT", &self.goroot),
            ("GOPATH", &self.gopath),
            ("CGO_ENABLED", &self.cgo_enabled),
            ("GOFLAGS", &self.goflags),
            ("GOEXPERIMENT", &self.goexperiment),
        ]
        .into_iter()
        .filter_map(|(k, v)| v.as_deref().map(|v| (k, v)))
        .collect()
    }
}
