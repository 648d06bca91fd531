// src/core/renderer.rs

use crate::{
    constants::{DISCOVER_RANDOM_PLACEHOLDER, FLOW_SEP, LIST_SEP, MAX_STACK_DEPTH},
    core::{
        args::ArgVals,
        env::Env,
        flow::{FlowRenderer, RenderError, RenderPhase, RenderedFlow},
    },
};
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use std::collections::BTreeMap;
use uuid::Uuid;

lazy_static! {
    // `[[key]]`, `[[*key]]` (list multiplication) and `[[@name]]` (macro).
    static ref MARKER_RE: Regex =
        Regex::new(r"\[\[\s*([@*]?)([^\[\]\s]+)\s*\]\]").expect("marker regex is valid");
}

/// The key that renders to a fresh random value.
const RANDOM_KEY: &str = "RANDOM";

/// Substitutes every plain `[[key]]` marker in `text` using `lookup`.
/// Unresolved markers are kept verbatim; the flag reports whether all were resolved.
pub fn render_template(text: &str, lookup: &dyn Fn(&str) -> Option<String>) -> (String, bool) {
    let mut fully = true;
    let rendered = MARKER_RE.replace_all(text, |caps: &Captures<'_>| {
        let whole = caps.get(0).map_or("", |m| m.as_str());
        let prefix = caps.get(1).map_or("", |m| m.as_str());
        let key = caps.get(2).map_or("", |m| m.as_str());
        if !prefix.is_empty() {
            fully = false;
            return whole.to_string();
        }
        match lookup(key) {
            Some(value) => value,
            None => {
                fully = false;
                whole.to_string()
            }
        }
    });
    (rendered.into_owned(), fully)
}

/// The default [`FlowRenderer`]: macros, list multiplication, then key substitution.
#[derive(Debug, Default, Clone, Copy)]
pub struct TemplateRenderer;

impl FlowRenderer for TemplateRenderer {
    fn render(
        &self,
        lines: &[String],
        argv: &ArgVals,
        env: &Env,
        macros: &BTreeMap<String, String>,
        phase: RenderPhase,
    ) -> Result<RenderedFlow, RenderError> {
        let lookup = |key: &str| -> Option<String> {
            if key == RANDOM_KEY {
                return Some(match phase {
                    RenderPhase::Discover => DISCOVER_RANDOM_PLACEHOLDER.to_string(),
                    RenderPhase::Resolve => Uuid::new_v4().simple().to_string(),
                });
            }
            argv.get(key)
                .map(|v| v.raw.clone())
                .or_else(|| env.has(key).then(|| env.get_raw(key)))
        };

        let mut fully_rendered = true;
        let mut rendered_lines = Vec::with_capacity(lines.len());
        for line in lines {
            let (expanded, macros_ok) = expand_macros(line, macros, 0)?;
            fully_rendered &= macros_ok;

            let (multiplied, multiply_ok) = multiply_line(&expanded, &lookup);
            fully_rendered &= multiply_ok;

            for one in multiplied {
                let (rendered, ok) = render_template(&one, &lookup);
                fully_rendered &= ok;
                if !rendered.trim().is_empty() {
                    rendered_lines.push(rendered);
                }
            }
        }

        let joined = rendered_lines.join(&format!(" {} ", FLOW_SEP));
        let tokens = shlex::split(&joined).ok_or_else(|| RenderError::Tokenize(joined.clone()))?;
        if !fully_rendered {
            log::debug!("Flow partially rendered: '{}'", joined);
        }
        Ok(RenderedFlow {
            tokens,
            fully_rendered,
        })
    }
}

/// Replaces `[[@name]]` with the macro's text, recursively.
fn expand_macros(
    text: &str,
    macros: &BTreeMap<String, String>,
    depth: usize,
) -> Result<(String, bool), RenderError> {
    let mut fully = true;
    let mut output = String::with_capacity(text.len());
    let mut last = 0;

    for caps in MARKER_RE.captures_iter(text) {
        let (Some(whole), Some(prefix), Some(name)) = (caps.get(0), caps.get(1), caps.get(2))
        else {
            continue;
        };
        if prefix.as_str() != "@" {
            continue;
        }
        output.push_str(text.get(last..whole.start()).unwrap_or(""));
        match macros.get(name.as_str()) {
            Some(body) => {
                if depth >= MAX_STACK_DEPTH {
                    return Err(RenderError::MacroTooDeep(name.as_str().to_string()));
                }
                let (expanded, ok) = expand_macros(body, macros, depth + 1)?;
                fully &= ok;
                output.push_str(&expanded);
            }
            None => {
                log::debug!("Unknown macro '{}'", name.as_str());
                fully = false;
                output.push_str(whole.as_str());
            }
        }
        last = whole.end();
    }
    output.push_str(text.get(last..).unwrap_or(""));
    Ok((output, fully))
}

/// Repeats `line` once per element of every `[[*key]]` list it contains
/// (the cartesian product when there are several).
///
/// Markers are collected from `line` once; substituted elements are never scanned
/// again, so an element that itself looks like a marker is kept as text.
fn multiply_line(line: &str, lookup: &dyn Fn(&str) -> Option<String>) -> (Vec<String>, bool) {
    let mut fully = true;
    // Literal text before each marker, and the elements each marker expands to.
    let mut pieces = Vec::new();
    let mut choices: Vec<Vec<String>> = Vec::new();
    let mut last = 0;

    for caps in MARKER_RE.captures_iter(line) {
        let (Some(whole), Some(prefix), Some(key)) = (caps.get(0), caps.get(1), caps.get(2))
        else {
            continue;
        };
        if prefix.as_str() != "*" {
            continue;
        }
        pieces.push(line.get(last..whole.start()).unwrap_or(""));
        let elements = match lookup(key.as_str()) {
            Some(value) => value
                .split(LIST_SEP)
                .map(str::trim)
                .filter(|e| !e.is_empty())
                .map(str::to_string)
                .collect(),
            None => {
                // Leave the marker for the parser to flag.
                fully = false;
                vec![whole.as_str().to_string()]
            }
        };
        choices.push(elements);
        last = whole.end();
    }
    if choices.is_empty() {
        return (vec![line.to_string()], true);
    }

    let mut lines = vec![String::new()];
    for (piece, elements) in pieces.iter().zip(&choices) {
        lines = lines
            .iter()
            .flat_map(|head| elements.iter().map(move |e| format!("{}{}{}", head, piece, e)))
            .collect();
    }
    let tail = line.get(last..).unwrap_or("");
    for one in &mut lines {
        one.push_str(tail);
    }
    (lines, fully)
}
