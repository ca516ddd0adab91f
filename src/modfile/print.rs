//! Canonical go.mod printer.
//!
//! Tokens are separated by one space, block lines are indented with a tab,
//! and at most one blank line separates statements. Removed lines are not
//! printed.

use super::{Line, ModFile, Stmt};
use crate::error::ManifestError;

pub(super) fn print(file: &ModFile) -> Result<String, ManifestError> {
    let mut out = String::new();
    let mut first = true;

    for stmt in &file.stmts {
        if matches!(stmt, Stmt::Line(line) if line.removed) {
            continue;
        }
        if !first && stmt.blank_before() {
            out.push('\n');
        }
        first = false;

        match stmt {
            Stmt::Comments(block) => comments(&mut out, "", &block.comments),
            Stmt::Line(line) => directive(&mut out, "", line)?,
            Stmt::Block(block) => {
                comments(&mut out, "", &block.before);
                out.push_str(&block.verb);
                out.push_str(" (");
                suffix(&mut out, &block.suffix);
                out.push('\n');

                let mut first_line = true;
                for line in block.lines.iter().filter(|line| !line.removed) {
                    if !first_line && line.blank_before {
                        out.push('\n');
                    }
                    first_line = false;
                    directive(&mut out, "\t", line)?;
                }

                comments(&mut out, "\t", &block.close_before);
                out.push(')');
                suffix(&mut out, &block.close_suffix);
                out.push('\n');
            }
        }
    }

    Ok(out)
}

fn comments(out: &mut String, indent: &str, comments: &[String]) {
    for comment in comments {
        out.push_str(indent);
        out.push_str(comment);
        out.push('\n');
    }
}

fn suffix(out: &mut String, comments: &[String]) {
    for comment in comments {
        out.push(' ');
        out.push_str(comment);
    }
}

fn directive(out: &mut String, indent: &str, line: &Line) -> Result<(), ManifestError> {
    if line.tokens.is_empty() {
        return Err(ManifestError::Format(
            "directive without tokens".to_string(),
        ));
    }
    if let Some(token) = line.tokens.iter().find(|t| t.contains('\n')) {
        return Err(ManifestError::Format(format!(
            "token spans lines: {token:?}"
        )));
    }

    comments(out, indent, &line.before);
    out.push_str(indent);
    let mut prev: Option<&str> = None;
    for token in &line.tokens {
        let glued = matches!(prev, Some("[")) || token == "]" || token == ",";
        if prev.is_some() && !glued {
            out.push(' ');
        }
        out.push_str(token);
        prev = Some(token.as_str());
    }
    suffix(out, &line.suffix);
    out.push('\n');
    Ok(())
}
