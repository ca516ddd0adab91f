//! go.mod lexer and parser.
//!
//! The grammar is line oriented: a directive is `verb args...` on one line,
//! or `verb (` followed by one argument list per line and a closing `)`.

use super::{
    CommentBlock, DIRECTIVES, Line, LineBlock, ModFile, Stmt, parse_replace, unquote,
};
use crate::error::ManifestError;
use regex::Regex;
use std::sync::LazyLock;

static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^v(0|[1-9][0-9]*)\.(0|[1-9][0-9]*)\.(0|[1-9][0-9]*)(-[0-9A-Za-z-]+(\.[0-9A-Za-z-]+)*)?(\+[0-9A-Za-z-]+(\.[0-9A-Za-z-]+)*)?$",
    )
    .expect("module version pattern is valid")
});

static GO_VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([1-9][0-9]*)\.(0|[1-9][0-9]*)(\.(0|[1-9][0-9]*))?([a-z]+[0-9]+)?$")
        .expect("go version pattern is valid")
});

fn syntax(line: usize, message: impl Into<String>) -> ManifestError {
    ManifestError::Syntax {
        line,
        message: message.into(),
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
struct LexedLine {
    tokens: Vec<String>,
    comment: Option<String>,
}

fn is_punct(c: char) -> bool {
    matches!(c, '(' | ')' | '[' | ']' | '{' | '}' | ',')
}

fn lex_line(text: &str, line: usize) -> Result<LexedLine, ManifestError> {
    let mut lexed = LexedLine::default();
    let mut rest = text;

    loop {
        rest = rest.trim_start();
        let Some(first) = rest.chars().next() else {
            break;
        };

        if rest.starts_with("//") {
            lexed.comment = Some(rest.trim_end().to_string());
            break;
        }
        if rest.starts_with("/*") {
            return Err(syntax(line, "block comments are not allowed"));
        }

        let end = match first {
            c if is_punct(c) => 1,
            '"' => quoted_end(rest).ok_or_else(|| syntax(line, "unterminated quoted string"))?,
            '`' => rest[1..]
                .find('`')
                .map(|i| i + 2)
                .ok_or_else(|| syntax(line, "unterminated raw string"))?,
            _ => ident_end(rest),
        };
        lexed.tokens.push(rest[..end].to_string());
        rest = &rest[end..];
    }

    Ok(lexed)
}

/// Byte offset just past the closing quote of a `"..."` token.
fn quoted_end(s: &str) -> Option<usize> {
    let mut chars = s.char_indices().skip(1);
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '"' => return Some(i + 1),
            _ => {}
        }
    }
    None
}

fn ident_end(s: &str) -> usize {
    for (i, c) in s.char_indices() {
        if c.is_whitespace() || is_punct(c) || c == '"' || c == '`' || s[i..].starts_with("//") {
            return i;
        }
    }
    s.len()
}

fn check_version(version: &str) -> Result<(), String> {
    if VERSION_RE.is_match(version) {
        Ok(())
    } else {
        Err(format!(
            "version \"{version}\" invalid: must be of the form v1.2.3"
        ))
    }
}

/// Validates the arguments of one directive.
fn check_directive(verb: &str, args: &[String]) -> Result<(), String> {
    let single = |usage: &str| {
        if args.len() == 1 {
            Ok(())
        } else {
            Err(format!("usage: {usage}"))
        }
    };

    match verb {
        "module" => single("module module/path"),
        "go" => {
            single("go 1.23")?;
            let version = unquote(&args[0]);
            if GO_VERSION_RE.is_match(&version) {
                Ok(())
            } else {
                Err(format!(
                    "invalid go version '{version}': must match format 1.23.0"
                ))
            }
        }
        "toolchain" => single("toolchain go1.23.0"),
        "godebug" => {
            single("godebug key=value")?;
            if unquote(&args[0]).contains('=') {
                Ok(())
            } else {
                Err("usage: godebug key=value".to_string())
            }
        }
        "require" | "exclude" => {
            if args.len() != 2 {
                return Err(format!("usage: {verb} module/path v1.2.3"));
            }
            check_version(&unquote(&args[1]))
        }
        "replace" => {
            let replace = parse_replace(args)?;
            if let Some(version) = &replace.old.version {
                check_version(version)?;
            }
            if let Some(version) = &replace.new.version {
                check_version(version)?;
            }
            Ok(())
        }
        "retract" => {
            if args.is_empty() {
                Err("usage: retract version or retract [low, high]".to_string())
            } else {
                Ok(())
            }
        }
        "tool" => single("tool module/path/to/tool"),
        "ignore" => single("ignore ./dir"),
        other => Err(format!("unknown directive: {other}")),
    }
}

#[derive(Debug, Default)]
struct Parser {
    stmts: Vec<Stmt>,
    /// Open block and the line it started on.
    block: Option<(usize, LineBlock)>,
    comments: Vec<String>,
    /// A blank line preceded the pending comment group.
    comments_blank: bool,
    /// A blank line was seen since the last statement or comment.
    blank: bool,
}

impl Parser {
    fn line(&mut self, line_no: usize, text: &str) -> Result<(), ManifestError> {
        let lexed = lex_line(text, line_no)?;
        if lexed.tokens.is_empty() {
            match lexed.comment {
                Some(comment) => self.comment(comment),
                None => self.blank_line(),
            }
            return Ok(());
        }

        if self.block.is_some() {
            self.block_line(line_no, lexed)
        } else {
            self.top_line(line_no, lexed)
        }
    }

    fn blank_line(&mut self) {
        if self.block.is_none() && !self.comments.is_empty() {
            self.stmts.push(Stmt::Comments(CommentBlock {
                comments: std::mem::take(&mut self.comments),
                blank_before: self.comments_blank,
            }));
        }
        self.blank = true;
    }

    fn comment(&mut self, comment: String) {
        if self.comments.is_empty() {
            self.comments_blank = self.blank;
            self.blank = false;
        }
        self.comments.push(comment);
    }

    /// Takes the comments above the current line and whether a blank line
    /// separates it from the previous statement.
    fn take_leading(&mut self) -> (Vec<String>, bool) {
        let blank = if self.comments.is_empty() {
            self.blank
        } else {
            self.comments_blank
        };
        self.blank = false;
        self.comments_blank = false;
        (std::mem::take(&mut self.comments), blank)
    }

    fn top_line(&mut self, line_no: usize, lexed: LexedLine) -> Result<(), ManifestError> {
        let LexedLine { tokens, comment } = lexed;
        let verb = tokens[0].as_str();
        if !DIRECTIVES.contains(&verb) {
            return Err(syntax(line_no, format!("unknown directive: {verb}")));
        }

        let (before, blank_before) = self.take_leading();
        let suffix: Vec<String> = comment.into_iter().collect();
        let open = tokens.len() >= 2 && tokens[1] == "(";

        if open && tokens.len() == 2 {
            let block = LineBlock {
                before,
                verb: verb.to_string(),
                suffix,
                blank_before,
                ..LineBlock::default()
            };
            self.block = Some((line_no, block));
            return Ok(());
        }

        if open && tokens.len() == 3 && tokens[2] == ")" {
            self.stmts.push(Stmt::Block(LineBlock {
                before,
                verb: verb.to_string(),
                close_suffix: suffix,
                blank_before,
                ..LineBlock::default()
            }));
            return Ok(());
        }

        if tokens.iter().any(|t| t == "(" || t == ")") {
            return Err(syntax(line_no, "unexpected parenthesis"));
        }
        check_directive(verb, &tokens[1..]).map_err(|message| syntax(line_no, message))?;

        self.stmts.push(Stmt::Line(Line {
            before,
            tokens,
            suffix,
            blank_before,
            removed: false,
        }));
        Ok(())
    }

    fn block_line(&mut self, line_no: usize, lexed: LexedLine) -> Result<(), ManifestError> {
        let LexedLine { tokens, comment } = lexed;

        if tokens.len() == 1 && tokens[0] == ")" {
            if let Some((_, mut block)) = self.block.take() {
                block.close_before = std::mem::take(&mut self.comments);
                block.close_suffix = comment.into_iter().collect();
                self.stmts.push(Stmt::Block(block));
            }
            self.blank = false;
            self.comments_blank = false;
            return Ok(());
        }

        if tokens.iter().any(|t| t == "(" || t == ")") {
            return Err(syntax(line_no, "unexpected parenthesis inside block"));
        }

        let (before, blank_before) = self.take_leading();
        if let Some((_, block)) = self.block.as_mut() {
            check_directive(&block.verb, &tokens).map_err(|message| syntax(line_no, message))?;
            block.lines.push(Line {
                before,
                tokens,
                suffix: comment.into_iter().collect(),
                blank_before,
                removed: false,
            });
        }
        Ok(())
    }

    fn finish(mut self) -> Result<ModFile, ManifestError> {
        if let Some((start, _)) = &self.block {
            return Err(syntax(*start, "unterminated block"));
        }
        if !self.comments.is_empty() {
            self.stmts.push(Stmt::Comments(CommentBlock {
                comments: std::mem::take(&mut self.comments),
                blank_before: self.comments_blank,
            }));
        }
        Ok(ModFile { stmts: self.stmts })
    }
}

pub(super) fn parse(text: &str) -> Result<ModFile, ManifestError> {
    let mut parser = Parser::default();
    for (i, raw) in text.split('\n').enumerate() {
        let line = raw.strip_suffix('\r').unwrap_or(raw);
        parser.line(i + 1, line)?;
    }
    parser.finish()
}
