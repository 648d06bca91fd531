// src/core/flow_parser.rs

use crate::{
    constants::{FLOW_SEP, KV_SEP},
    core::{
        cmd_tree::CmdTree,
        flow::{CmdInput, FlowParser, ParseError, ParsedCmd, ParsedFlow},
    },
};

/// The default [`FlowParser`].
///
/// Grammar, with segments separated by a standalone `:` token:
///
/// ```text
/// flow    := [globals ":"] segment (":" segment)*
/// globals := (key=value)+
/// segment := cmd.path ({key=value})* (name=value)* positional*
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct SimpleFlowParser;

impl FlowParser for SimpleFlowParser {
    fn parse(&self, tokens: &[String], tree: &CmdTree) -> ParsedFlow {
        let mut flow = ParsedFlow::default();
        let segments: Vec<&[String]> = tokens
            .split(|t| t == FLOW_SEP)
            .filter(|s| !s.is_empty())
            .collect();

        for (i, segment) in segments.into_iter().enumerate() {
            if i == 0 && is_global_block(segment) {
                flow.globals = segment.iter().filter_map(|t| split_kv(t)).collect();
                continue;
            }
            flow.cmds.push(parse_segment(segment, tree));
        }
        flow
    }
}

fn split_kv(token: &str) -> Option<(String, String)> {
    let (key, value) = token.split_once(KV_SEP)?;
    let key = key.trim();
    (!key.is_empty()).then(|| (key.to_string(), value.to_string()))
}

fn is_global_block(segment: &[String]) -> bool {
    segment.iter().all(|t| split_kv(t).is_some())
}

fn segment_env_pair(token: &str) -> Option<(String, String)> {
    let inner = token.strip_prefix('{')?.strip_suffix('}')?;
    split_kv(inner)
}

fn parse_segment(segment: &[String], tree: &CmdTree) -> ParsedCmd {
    let (path, rest) = match segment.split_first() {
        Some((path, rest)) => (path.clone(), rest),
        None => (String::new(), &[][..]),
    };
    let mut parsed = ParsedCmd {
        cmd: tree.find(&path),
        path,
        segment_env: Vec::new(),
        input: CmdInput::default(),
        error: None,
    };

    let Some(cmd) = parsed.cmd.and_then(|id| tree.cmd(id)) else {
        parsed.error = Some(ParseError::UnknownCmd(parsed.path.clone()));
        return parsed;
    };

    let mut unrendered = None;
    for token in rest {
        if token.contains("[[") && unrendered.is_none() {
            unrendered = Some(token.clone());
        }
        if let Some(pair) = segment_env_pair(token) {
            parsed.segment_env.push(pair);
        } else if let Some((name, value)) = split_kv(token)
            && cmd.args().has_arg_or_abbr(&name)
        {
            parsed.input.named.push((name, value));
        } else if token.contains(KV_SEP) && !token.starts_with(KV_SEP) {
            let name = token.split(KV_SEP).next().unwrap_or_default().to_string();
            parsed.error.get_or_insert(ParseError::UnknownArg {
                cmd: parsed.path.clone(),
                arg: name,
            });
        } else {
            parsed.input.positional.push(token.clone());
        }
    }

    let max = cmd.args().len();
    let got = parsed.input.positional.len();
    if got > max {
        parsed.error.get_or_insert(ParseError::TooManyArgs {
            cmd: parsed.path.clone(),
            max,
            got,
        });
    }
    if let Some(token) = unrendered {
        parsed.error.get_or_insert(ParseError::Unrendered {
            cmd: parsed.path.clone(),
            token,
        });
    }
    parsed
}
