//! `{{var}}` prompt templates.
//!
//! `\{{` emits a literal `{{`. Unknown variables are left in place when
//! rendering so a bad template shows up verbatim in logs rather than as
//! silently missing text; [`validate_template`] catches them at load time.

use anyhow::{bail, Result};
use std::collections::HashMap;

enum Piece<'a> {
    Text(&'a str),
    Literal(&'static str),
    Var(&'a str),
}

/// Split a template into text runs, escapes and variable references.
fn scan(template: &str) -> Result<Vec<Piece<'_>>> {
    let mut pieces = Vec::new();
    let mut rest = template;

    while !rest.is_empty() {
        let next = rest.find("{{");
        let escaped = rest.find("\\{{");

        match (escaped, next) {
            (Some(e), Some(n)) if e + 1 == n => {
                pieces.push(Piece::Text(&rest[..e]));
                pieces.push(Piece::Literal("{{"));
                rest = &rest[n + 2..];
            }
            (_, Some(n)) => {
                pieces.push(Piece::Text(&rest[..n]));
                let after = &rest[n + 2..];
                let Some(close) = after.find("}}") else {
                    bail!("Unclosed template variable near: {}", &rest[n..]);
                };
                pieces.push(Piece::Var(after[..close].trim()));
                rest = &after[close + 2..];
            }
            (_, None) => {
                pieces.push(Piece::Text(rest));
                rest = "";
            }
        }
    }

    Ok(pieces)
}

/// Fill `{{var}}` placeholders from `vars`.
pub fn render_template(template: &str, vars: &HashMap<&str, &str>) -> String {
    let pieces = match scan(template) {
        Ok(p) => p,
        // Malformed: emit as-is
        Err(_) => return template.to_string(),
    };

    let mut out = String::with_capacity(template.len());
    for piece in pieces {
        match piece {
            Piece::Text(t) => out.push_str(t),
            Piece::Literal(l) => out.push_str(l),
            Piece::Var(name) => match vars.get(name) {
                Some(value) => out.push_str(value),
                None => {
                    out.push_str("{{");
                    out.push_str(name);
                    out.push_str("}}");
                }
            },
        }
    }
    out
}

/// Ensure every placeholder is closed and in the allowed set.
pub fn validate_template(template: &str, allowed: &[&str]) -> Result<()> {
    for piece in scan(template)? {
        if let Piece::Var(name) = piece {
            if !allowed.contains(&name) {
                bail!(
                    "Unknown template variable: {{{{{}}}}}. Allowed: {:?}",
                    name,
                    allowed
                );
            }
        }
    }
    Ok(())
}
