//! Go build constraints.
//!
//! Covers the three ways a file opts in or out of a build:
//! `//go:build` expressions, legacy `// +build` lines, and
//! `_GOOS` / `_GOARCH` file-name suffixes.

use std::fmt;

/// Every GOOS value the toolchain knows about.
pub const KNOWN_OS: &[&str] = &[
    "aix", "android", "darwin", "dragonfly", "freebsd", "hurd", "illumos", "ios", "js", "linux",
    "nacl", "netbsd", "openbsd", "plan9", "solaris", "wasip1", "windows", "zos",
];

/// GOOS values that satisfy the `unix` tag.
pub const UNIX_OS: &[&str] = &[
    "aix", "android", "darwin", "dragonfly", "freebsd", "hurd", "illumos", "ios", "linux",
    "netbsd", "openbsd", "solaris",
];

/// Every GOARCH value the toolchain knows about.
pub const KNOWN_ARCH: &[&str] = &[
    "386", "amd64", "amd64p32", "arm", "armbe", "arm64", "arm64be", "loong64", "mips", "mipsle",
    "mips64", "mips64le", "mips64p32", "mips64p32le", "ppc", "ppc64", "ppc64le", "riscv",
    "riscv64", "s390", "s390x", "sparc", "sparc64", "wasm",
];

pub fn is_known_os(tag: &str) -> bool {
    KNOWN_OS.contains(&tag)
}

pub fn is_known_arch(tag: &str) -> bool {
    KNOWN_ARCH.contains(&tag)
}

/// Parsed constraint expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Tag(String),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Evaluate with `ok` deciding each tag.
    pub fn eval(&self, ok: &dyn Fn(&str) -> bool) -> bool {
        match self {
            Expr::Tag(t) => ok(t),
            Expr::Not(x) => !x.eval(ok),
            Expr::And(a, b) => a.eval(ok) && b.eval(ok),
            Expr::Or(a, b) => a.eval(ok) || b.eval(ok),
        }
    }

    /// Distinct tags in first-appearance order.
    pub fn tags(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_tags(&mut out);
        out
    }

    fn collect_tags(&self, out: &mut Vec<String>) {
        match self {
            Expr::Tag(t) => {
                if !out.contains(t) {
                    out.push(t.clone());
                }
            }
            Expr::Not(x) => x.collect_tags(out),
            Expr::And(a, b) | Expr::Or(a, b) => {
                a.collect_tags(out);
                b.collect_tags(out);
            }
        }
    }

    fn and(a: Expr, b: Expr) -> Expr {
        Expr::And(Box::new(a), Box::new(b))
    }

    fn or(a: Expr, b: Expr) -> Expr {
        Expr::Or(Box::new(a), Box::new(b))
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Tag(t) => write!(f, "{t}"),
            Expr::Not(x) => match **x {
                Expr::Tag(_) | Expr::Not(_) => write!(f, "!{x}"),
                _ => write!(f, "!({x})"),
            },
            Expr::And(a, b) => {
                write_operand(f, a, matches!(**a, Expr::Or(..)))?;
                write!(f, " && ")?;
                write_operand(f, b, matches!(**b, Expr::Or(..)))
            }
            Expr::Or(a, b) => write!(f, "{a} || {b}"),
        }
    }
}

fn write_operand(f: &mut fmt::Formatter<'_>, x: &Expr, paren: bool) -> fmt::Result {
    if paren { write!(f, "({x})") } else { write!(f, "{x}") }
}

/// Parse the text after `//go:build`.
pub fn parse_expr(text: &str) -> Result<Expr, String> {
    let mut p = ExprParser { s: text.as_bytes(), pos: 0 };
    let e = p.or()?;
    p.skip_space();
    if p.pos != p.s.len() {
        return Err(format!("unexpected {:?}", &text[p.pos..]));
    }
    Ok(e)
}

struct ExprParser<'a> {
    s: &'a [u8],
    pos: usize,
}

impl ExprParser<'_> {
    fn skip_space(&mut self) {
        while self.pos < self.s.len() && matches!(self.s[self.pos], b' ' | b'\t') {
            self.pos += 1;
        }
    }

    fn eat(&mut self, tok: &str) -> bool {
        self.skip_space();
        if self.s[self.pos..].starts_with(tok.as_bytes()) {
            self.pos += tok.len();
            true
        } else {
            false
        }
    }

    fn or(&mut self) -> Result<Expr, String> {
        let mut x = self.and()?;
        while self.eat("||") {
            x = Expr::or(x, self.and()?);
        }
        Ok(x)
    }

    fn and(&mut self) -> Result<Expr, String> {
        let mut x = self.not()?;
        while self.eat("&&") {
            x = Expr::and(x, self.not()?);
        }
        Ok(x)
    }

    fn not(&mut self) -> Result<Expr, String> {
        if self.eat("!") {
            return Ok(Expr::Not(Box::new(self.not()?)));
        }
        self.atom()
    }

    fn atom(&mut self) -> Result<Expr, String> {
        if self.eat("(") {
            let x = self.or()?;
            if !self.eat(")") {
                return Err("missing )".to_string());
            }
            return Ok(x);
        }

        self.skip_space();
        let start = self.pos;
        while self.pos < self.s.len() && is_tag_byte(self.s[self.pos]) {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(if self.pos == self.s.len() {
                "unexpected end of expression".to_string()
            } else {
                format!("unexpected {:?}", self.s[self.pos] as char)
            });
        }
        // Slice is ASCII by construction.
        Ok(Expr::Tag(String::from_utf8_lossy(&self.s[start..self.pos]).into_owned()))
    }
}

fn is_tag_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'.'
}

/// Convert one legacy `// +build` line body into an expression:
/// spaces separate alternatives, commas separate conjuncts.
pub fn parse_plus_build(line: &str) -> Result<Expr, String> {
    let mut alts: Option<Expr> = None;

    for clause in line.split_whitespace() {
        let mut conj: Option<Expr> = None;
        for lit in clause.split(',') {
            let (neg, tag) = match lit.strip_prefix('!') {
                Some(t) => (true, t),
                None => (false, lit),
            };
            if tag.is_empty() || tag.starts_with('!') || !tag.bytes().all(is_tag_byte) {
                return Err(format!("invalid +build term {lit:?}"));
            }
            let mut x = Expr::Tag(tag.to_string());
            if neg {
                x = Expr::Not(Box::new(x));
            }
            conj = Some(match conj {
                None => x,
                Some(c) => Expr::and(c, x),
            });
        }
        if let Some(c) = conj {
            alts = Some(match alts {
                None => c,
                Some(a) => Expr::or(a, c),
            });
        }
    }

    alts.ok_or_else(|| "empty +build line".to_string())
}

/// What the pre-package header of a Go file says.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileHeader {
    /// Effective constraint, `//go:build` preferred over `+build` lines
    pub constraint: Option<Expr>,
    /// Package clause name, if one was found
    pub package: Option<String>,
    /// First token that is neither comment nor package clause, when no
    /// package clause was found
    pub unexpected: Option<String>,
    /// File imports the pseudo-package "C"
    pub imports_c: bool,
}

/// Scan the comment header, package clause and import block.
pub fn scan_header(src: &str) -> Result<FileHeader, String> {
    let mut go_build: Option<Expr> = None;
    let mut plus_build: Option<Expr> = None;
    let mut header = FileHeader::default();
    let mut in_block = false;
    let mut lines = src.lines();

    // Comment header up to the package clause.
    for raw in lines.by_ref() {
        let mut line = raw.trim();
        if in_block {
            match line.find("*/") {
                Some(i) => {
                    in_block = false;
                    line = line[i + 2..].trim();
                }
                None => continue,
            }
        }
        if line.is_empty() {
            continue;
        }
        if let Some(rest) = line.strip_prefix("//") {
            if let Some(expr) = rest.strip_prefix("go:build") {
                if !(expr.is_empty() || expr.starts_with([' ', '\t'])) {
                    continue;
                }
                if go_build.is_some() {
                    return Err("multiple //go:build comments".to_string());
                }
                go_build = Some(parse_expr(expr.trim())?);
            } else if let Some(body) = rest.trim_start().strip_prefix("+build") {
                if body.is_empty() || body.starts_with([' ', '\t']) {
                    let x = parse_plus_build(body)?;
                    plus_build = Some(match plus_build {
                        None => x,
                        Some(prev) => Expr::and(prev, x),
                    });
                }
            }
            continue;
        }
        if let Some(rest) = line.strip_prefix("/*") {
            match rest.find("*/") {
                Some(i) if rest[i + 2..].trim().is_empty() => continue,
                Some(i) => line = rest[i + 2..].trim(),
                None => {
                    in_block = true;
                    continue;
                }
            }
        }

        match package_name(line) {
            Some(name) => header.package = Some(name),
            None => header.unexpected = Some(first_word(line)),
        }
        break;
    }

    header.constraint = go_build.or(plus_build);
    if header.package.is_some() {
        header.imports_c = scan_imports_for_c(lines);
    }
    Ok(header)
}

fn package_name(line: &str) -> Option<String> {
    let rest = line.strip_prefix("package")?;
    if !rest.starts_with([' ', '\t']) {
        return None;
    }
    let name: String = rest
        .trim_start()
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_')
        .collect();
    (!name.is_empty()).then_some(name)
}

fn first_word(line: &str) -> String {
    line.split_whitespace().next().unwrap_or_default().to_string()
}

/// Look through the import declarations that follow the package clause.
fn scan_imports_for_c<'a>(lines: impl Iterator<Item = &'a str>) -> bool {
    let mut in_group = false;
    let mut in_block = false;

    for raw in lines {
        let line = raw.trim();
        if in_block {
            if line.contains("*/") {
                in_block = false;
            }
            continue;
        }
        if line.is_empty() || line.starts_with("//") {
            continue;
        }
        if line.starts_with("/*") {
            in_block = !line.contains("*/");
            continue;
        }
        if in_group {
            if line.starts_with(')') {
                in_group = false;
                continue;
            }
            if is_c_spec(line) {
                return true;
            }
            continue;
        }
        let Some(spec) = line.strip_prefix("import") else {
            break;
        };
        let spec = spec.trim();
        if let Some(inner) = spec.strip_prefix('(') {
            let inner = inner.trim();
            if inner.starts_with(')') || inner.ends_with(')') {
                if inner.split(';').any(|s| is_c_spec(s.trim().trim_end_matches(')'))) {
                    return true;
                }
                continue;
            }
            if is_c_spec(inner) {
                return true;
            }
            in_group = true;
        } else if is_c_spec(spec) {
            return true;
        }
    }
    false
}

fn is_c_spec(spec: &str) -> bool {
    spec.split("//").next().unwrap_or_default().trim() == "\"C\""
}

/// Apply the `_GOOS` / `_GOARCH` file-name rule.
pub fn name_matches(file_name: &str, ok: &dyn Fn(&str) -> bool) -> bool {
    match name_constraint(file_name) {
        NameConstraint::None => true,
        NameConstraint::Os(os) | NameConstraint::Arch(os) => ok(os),
        NameConstraint::OsArch(os, arch) => ok(os) && ok(arch),
    }
}

/// Platform tags implied by a file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameConstraint<'a> {
    None,
    Os(&'a str),
    Arch(&'a str),
    OsArch(&'a str, &'a str),
}

pub fn name_constraint(file_name: &str) -> NameConstraint<'_> {
    let stem = file_name.split('.').next().unwrap_or_default();
    let Some(i) = stem.find('_') else {
        return NameConstraint::None;
    };
    let mut parts: Vec<&str> = stem[i..].split('_').collect();
    if parts.last() == Some(&"test") {
        parts.pop();
    }

    let n = parts.len();
    if n >= 2 && is_known_os(parts[n - 2]) && is_known_arch(parts[n - 1]) {
        return NameConstraint::OsArch(parts[n - 2], parts[n - 1]);
    }
    if n >= 1 && is_known_os(parts[n - 1]) {
        return NameConstraint::Os(parts[n - 1]);
    }
    if n >= 1 && is_known_arch(parts[n - 1]) {
        return NameConstraint::Arch(parts[n - 1]);
    }
    NameConstraint::None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(set: &'static [&'static str]) -> impl Fn(&str) -> bool {
        move |t: &str| set.contains(&t)
    }

    #[test]
    fn expression_precedence() {
        let e = parse_expr("linux && amd64 || !cgo").unwrap();
        assert_eq!(e.to_string(), "linux && amd64 || !cgo");

        assert!(e.eval(&tags(&["linux", "amd64", "cgo"])));
        assert!(e.eval(&tags(&["darwin"])));
        assert!(!e.eval(&tags(&["darwin", "cgo"])));
    }

    #[test]
    fn parentheses_and_errors() {
        let e = parse_expr("(linux || darwin) && !go1.21").unwrap();
        assert_eq!(e.tags(), vec!["linux", "darwin", "go1.21"]);
        assert_eq!(e.to_string(), "(linux || darwin) && !go1.21");

        assert!(parse_expr("linux &&").is_err());
        assert!(parse_expr("(linux").is_err());
        assert!(parse_expr("linux darwin").is_err());
        assert!(parse_expr("").is_err());
    }

    #[test]
    fn plus_build_lines() {
        let e = parse_plus_build(" linux,amd64 darwin,!cgo").unwrap();
        assert!(e.eval(&tags(&["linux", "amd64"])));
        assert!(e.eval(&tags(&["darwin"])));
        assert!(!e.eval(&tags(&["darwin", "cgo"])));
        assert!(parse_plus_build(" !!linux").is_err());
    }

    #[test]
    fn header_prefers_go_build() {
        let src = "// Copyright\n\n//go:build integration\n// +build other\n\npackage foo_test\n\nimport \"testing\"\n";
        let h = scan_header(src).unwrap();

        assert_eq!(h.constraint, Some(Expr::Tag("integration".into())));
        assert_eq!(h.package.as_deref(), Some("foo_test"));
        assert!(!h.imports_c);
    }

    #[test]
    fn header_ignores_constraints_after_package() {
        let h = scan_header("package p\n//go:build ignore\n").unwrap();
        assert_eq!(h.constraint, None);
    }

    #[test]
    fn header_skips_block_comments_and_finds_cgo() {
        let src = "/*\nlicense\n*/\npackage p\n\n// #include <stdio.h>\nimport \"C\"\n";
        let h = scan_header(src).unwrap();
        assert_eq!(h.package.as_deref(), Some("p"));
        assert!(h.imports_c);

        let grouped = "package p\n\nimport (\n\t\"fmt\"\n\t\"C\"\n)\n";
        assert!(scan_header(grouped).unwrap().imports_c);
    }

    #[test]
    fn header_without_package() {
        let h = scan_header("// just a comment\nfunc main() {}\n").unwrap();
        assert_eq!(h.package, None);
        assert_eq!(h.unexpected.as_deref(), Some("func"));
    }

    #[test]
    fn duplicate_go_build_is_an_error() {
        assert!(scan_header("//go:build a\n//go:build b\npackage p\n").is_err());
    }

    #[test]
    fn file_name_suffixes() {
        assert_eq!(name_constraint("a.go"), NameConstraint::None);
        assert_eq!(name_constraint("linux.go"), NameConstraint::None);
        assert_eq!(name_constraint("a_linux.go"), NameConstraint::Os("linux"));
        assert_eq!(name_constraint("a_arm64_test.go"), NameConstraint::Arch("arm64"));
        assert_eq!(
            name_constraint("a_windows_amd64_test.go"),
            NameConstraint::OsArch("windows", "amd64")
        );
        assert_eq!(name_constraint("a_linux_test_helper.go"), NameConstraint::None);

        assert!(name_matches("x_linux.go", &tags(&["linux"])));
        assert!(!name_matches("x_linux.go", &tags(&["darwin"])));
    }
}
