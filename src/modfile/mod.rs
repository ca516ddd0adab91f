//! go.mod syntax tree with the edits uselocal needs.
//!
//! A [`ModFile`] keeps the file as statements rather than a typed model, so
//! comments, blank lines and untouched directives survive a parse/print round
//! trip. Tokens are stored exactly as written (quotes included) and only
//! unquoted when interpreted.
//!
//! Edits follow the `go mod edit` conventions:
//!
//! - adding `replace a => b` rewrites the first existing replacement of `a`
//!   (any version) in place and marks further ones removed; otherwise the new
//!   line goes after the last `replace` statement, turning a lone line into a
//!   `replace ( ... )` block, or at the end of the file;
//! - dropping marks lines removed;
//! - [`ModFile::cleanup`] then deletes removed lines and empty blocks, and
//!   collapses one-line blocks back into a plain directive.

mod print;
mod read;

use crate::error::ManifestError;
use crate::ops::Manifest;

/// Directives accepted at the top level.
const DIRECTIVES: &[&str] = &[
    "module",
    "go",
    "toolchain",
    "godebug",
    "require",
    "exclude",
    "replace",
    "retract",
    "tool",
    "ignore",
];

/// A parsed go.mod file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModFile {
    stmts: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Stmt {
    /// Free-standing comment lines, separated from the next statement by a
    /// blank line.
    Comments(CommentBlock),
    Line(Line),
    Block(LineBlock),
}

impl Stmt {
    fn blank_before(&self) -> bool {
        match self {
            Stmt::Comments(block) => block.blank_before,
            Stmt::Line(line) => line.blank_before,
            Stmt::Block(block) => block.blank_before,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct CommentBlock {
    comments: Vec<String>,
    blank_before: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Line {
    /// Comment lines directly above.
    before: Vec<String>,
    tokens: Vec<String>,
    /// Trailing `//` comments.
    suffix: Vec<String>,
    blank_before: bool,
    removed: bool,
}

impl Line {
    fn new(tokens: Vec<String>) -> Self {
        Self {
            tokens,
            ..Self::default()
        }
    }
}

/// `verb ( ... )`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct LineBlock {
    before: Vec<String>,
    verb: String,
    /// Comment on the opening line.
    suffix: Vec<String>,
    lines: Vec<Line>,
    /// Comment lines just above the closing parenthesis.
    close_before: Vec<String>,
    close_suffix: Vec<String>,
    blank_before: bool,
}

impl LineBlock {
    /// Turns `verb args...` into a block holding `args...`. Comments above the
    /// line move to the block; the trailing comment stays with the line.
    fn from_line(mut line: Line) -> Self {
        let verb = line.tokens.remove(0);
        let before = std::mem::take(&mut line.before);
        let blank_before = std::mem::replace(&mut line.blank_before, false);
        Self {
            before,
            verb,
            lines: vec![line],
            blank_before,
            ..Self::default()
        }
    }
}

/// A module path with an optional version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleVersion {
    pub path: String,
    pub version: Option<String>,
}

/// A `replace old [v] => new [v]` directive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Replace {
    pub old: ModuleVersion,
    pub new: ModuleVersion,
}

/// Position of a directive line in the statement list.
#[derive(Debug, Clone, Copy)]
enum Loc {
    Top(usize),
    InBlock(usize, usize),
}

impl ModFile {
    /// Parses go.mod text.
    pub fn parse(data: &[u8]) -> Result<Self, ManifestError> {
        let text = std::str::from_utf8(data).map_err(|e| ManifestError::Syntax {
            line: data[..e.valid_up_to()]
                .iter()
                .filter(|&&b| b == b'\n')
                .count()
                + 1,
            message: "invalid UTF-8".to_string(),
        })?;
        read::parse(text)
    }

    /// Prints the file in canonical form.
    pub fn format(&self) -> Result<Vec<u8>, ManifestError> {
        print::print(self).map(String::into_bytes)
    }

    /// All live replace directives in file order.
    pub fn replaces(&self) -> Vec<Replace> {
        self.replace_entries().into_iter().map(|(_, r)| r).collect()
    }

    /// Adds `from => to`, replacing any existing replacement of `from`
    /// regardless of its version. Neither side carries a version.
    pub fn add_replace(&mut self, from: &str, to: &str) -> Result<(), ManifestError> {
        if from.is_empty() {
            return Err(ManifestError::Edit(
                "replace: empty module path".to_string(),
            ));
        }
        if to.is_empty() {
            return Err(ManifestError::Edit(format!(
                "replace {from}: empty replacement path"
            )));
        }

        let tokens = vec![
            "replace".to_string(),
            auto_quote(from),
            "=>".to_string(),
            auto_quote(to),
        ];

        let mut need = true;
        for (loc, replace) in self.replace_entries() {
            if replace.old.path != from {
                continue;
            }
            let line = self.line_mut(loc);
            if need {
                line.tokens = match loc {
                    Loc::Top(_) => tokens.clone(),
                    Loc::InBlock(..) => tokens[1..].to_vec(),
                };
                need = false;
            } else {
                line.removed = true;
            }
        }

        if need {
            self.add_line(tokens);
        }
        Ok(())
    }

    /// Marks every replacement of `from` removed, whatever its version.
    /// Returns whether anything matched.
    pub fn drop_replace(&mut self, from: &str) -> bool {
        let mut dropped = false;
        for (loc, replace) in self.replace_entries() {
            if replace.old.path == from {
                self.line_mut(loc).removed = true;
                dropped = true;
            }
        }
        dropped
    }

    /// Deletes removed lines and empty blocks, and collapses blocks left
    /// with a single line into a plain directive.
    pub fn cleanup(&mut self) {
        let stmts = std::mem::take(&mut self.stmts);
        for stmt in stmts {
            match stmt {
                Stmt::Line(line) if line.removed => {}
                Stmt::Block(mut block) => {
                    block.lines.retain(|line| !line.removed);
                    match block.lines.len() {
                        0 => {}
                        1 if block.close_before.is_empty() => {
                            let inner = block.lines.remove(0);
                            let mut tokens = vec![block.verb];
                            tokens.extend(inner.tokens);
                            let mut before = block.before;
                            before.extend(inner.before);
                            let mut suffix = inner.suffix;
                            suffix.extend(block.suffix);
                            suffix.extend(block.close_suffix);
                            self.stmts.push(Stmt::Line(Line {
                                before,
                                tokens,
                                suffix,
                                blank_before: block.blank_before,
                                removed: false,
                            }));
                        }
                        _ => self.stmts.push(Stmt::Block(block)),
                    }
                }
                other => self.stmts.push(other),
            }
        }
    }

    fn replace_entries(&self) -> Vec<(Loc, Replace)> {
        let mut entries = Vec::new();
        for (i, stmt) in self.stmts.iter().enumerate() {
            match stmt {
                Stmt::Line(line)
                    if !line.removed && line.tokens.first().map(String::as_str) == Some("replace") =>
                {
                    if let Ok(replace) = parse_replace(&line.tokens[1..]) {
                        entries.push((Loc::Top(i), replace));
                    }
                }
                Stmt::Block(block) if block.verb == "replace" => {
                    for (j, line) in block.lines.iter().enumerate() {
                        if line.removed {
                            continue;
                        }
                        if let Ok(replace) = parse_replace(&line.tokens) {
                            entries.push((Loc::InBlock(i, j), replace));
                        }
                    }
                }
                _ => {}
            }
        }
        entries
    }

    fn line_mut(&mut self, loc: Loc) -> &mut Line {
        match loc {
            Loc::Top(i) => match &mut self.stmts[i] {
                Stmt::Line(line) => line,
                _ => unreachable!("Loc::Top always points at a line"),
            },
            Loc::InBlock(i, j) => match &mut self.stmts[i] {
                Stmt::Block(block) => &mut block.lines[j],
                _ => unreachable!("Loc::InBlock always points into a block"),
            },
        }
    }

    /// Places a new directive after the last live statement with the same
    /// verb, or at the end of the file.
    fn add_line(&mut self, tokens: Vec<String>) {
        let verb = tokens[0].as_str();
        let hint = self.stmts.iter().rposition(|stmt| match stmt {
            Stmt::Line(line) => !line.removed && line.tokens.first().map(String::as_str) == Some(verb),
            Stmt::Block(block) => block.verb == verb,
            Stmt::Comments(_) => false,
        });

        let Some(i) = hint else {
            let mut line = Line::new(tokens);
            line.blank_before = !self.stmts.is_empty();
            self.stmts.push(Stmt::Line(line));
            return;
        };

        let stmt = &mut self.stmts[i];
        if let Stmt::Line(line) = stmt {
            *stmt = Stmt::Block(LineBlock::from_line(std::mem::take(line)));
        }
        if let Stmt::Block(block) = stmt {
            block.lines.push(Line::new(tokens[1..].to_vec()));
        }
    }
}

impl Manifest for ModFile {
    const FILE_NAME: &'static str = "go.mod";

    fn parse(data: &[u8]) -> Result<Self, ManifestError> {
        ModFile::parse(data)
    }

    fn add_replace(&mut self, from: &str, to: &str) -> Result<(), ManifestError> {
        ModFile::add_replace(self, from, to)
    }

    fn drop_replace(&mut self, from: &str) -> Result<bool, ManifestError> {
        Ok(ModFile::drop_replace(self, from))
    }

    fn cleanup(&mut self) {
        ModFile::cleanup(self)
    }

    fn format(&self) -> Result<Vec<u8>, ManifestError> {
        ModFile::format(self)
    }
}

/// Interprets the arguments of a replace directive (verb stripped).
fn parse_replace(args: &[String]) -> Result<Replace, String> {
    const USAGE: &str = "usage: replace module/path [v1.2.3] => other/module v1.4\n\t or replace module/path [v1.2.3] => ../local/directory";

    let arrow = args
        .iter()
        .position(|token| token == "=>")
        .ok_or_else(|| USAGE.to_string())?;
    if !(arrow == 1 || arrow == 2) {
        return Err(USAGE.to_string());
    }
    let new = &args[arrow + 1..];
    if new.is_empty() || new.len() > 2 {
        return Err(USAGE.to_string());
    }

    let old = ModuleVersion {
        path: unquote(&args[0]),
        version: (arrow == 2).then(|| unquote(&args[1])),
    };
    let new = ModuleVersion {
        path: unquote(&new[0]),
        version: new.get(1).map(|v| unquote(v)),
    };

    match &new.version {
        None if !is_local_path(&new.path) => {
            return Err(
                "replacement module without version must be directory path (rooted or starting with ./ or ../)"
                    .to_string(),
            );
        }
        Some(_) if is_local_path(&new.path) => {
            return Err("replacement module directory path must not have version".to_string());
        }
        _ => {}
    }

    Ok(Replace { old, new })
}

/// Whether a replacement target names a directory rather than a module.
fn is_local_path(path: &str) -> bool {
    if path == "." || path == ".." {
        return true;
    }
    if ["./", "../", "/", ".\\", "..\\", "\\"]
        .iter()
        .any(|prefix| path.starts_with(prefix))
    {
        return true;
    }
    let bytes = path.as_bytes();
    bytes.len() >= 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes[2] == b'\\' || bytes[2] == b'/')
}

/// Quotes `s` if it cannot be written as a bare token.
fn auto_quote(s: &str) -> String {
    if must_quote(s) {
        quote(s)
    } else {
        s.to_string()
    }
}

fn must_quote(s: &str) -> bool {
    if s.is_empty() || s.contains("//") || s.contains("/*") {
        return true;
    }
    s.chars().any(|c| match c {
        ' ' | '"' | '\'' | '`' => true,
        '(' | ')' | '[' | ']' | '{' | '}' | ',' => s.len() > 1,
        c => c.is_whitespace() || c.is_control(),
    })
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Strips quotes from a token. Bare tokens are returned unchanged.
fn unquote(token: &str) -> String {
    if token.len() >= 2 && token.starts_with('`') && token.ends_with('`') {
        return token[1..token.len() - 1].to_string();
    }
    if token.len() < 2 || !token.starts_with('"') || !token.ends_with('"') {
        return token.to_string();
    }

    let mut out = String::with_capacity(token.len());
    let mut chars = token[1..token.len() - 1].chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
