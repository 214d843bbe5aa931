//! Format string scanner.
//!
//! Splits a format string into constant text and verbs. A verb starts with
//! `%`, takes an optional `width.scale` precision and ends with the longest
//! registered verb name matching the remaining input (`%json` wins over a
//! hypothetical `%j`). `%%` is a literal percent sign.

use std::collections::BTreeMap;
use std::ops::Bound;

use crate::functions::sprintf::verbs::Verb;
use crate::functions::FunctionError;

/// Optional width and scale of a verb (`%8.2f`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Precision {
    pub width: Option<usize>,
    pub scale: Option<usize>,
}

impl Precision {
    pub fn is_set(&self) -> bool {
        self.width.is_some() || self.scale.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Constant(String),
    Verb { verb: Verb, precision: Precision },
}

/// Verb names, looked up by longest prefix.
#[derive(Debug, Clone)]
pub struct VerbRegistry {
    verbs: BTreeMap<&'static str, Verb>,
}

impl Default for VerbRegistry {
    fn default() -> Self {
        let mut registry = Self {
            verbs: BTreeMap::new(),
        };

        for verb in Verb::ALL {
            registry.register(verb);
        }

        registry
    }
}

impl VerbRegistry {
    pub fn register(&mut self, verb: Verb) {
        self.verbs.insert(verb.name(), verb);
    }

    /// Longest registered name that prefixes `input`.
    ///
    /// Every prefix of `input` sorts at or before it, and longer prefixes sort
    /// after shorter ones, so the first prefix found walking backwards from
    /// `input` is the longest.
    pub fn detect(&self, input: &str) -> Option<Verb> {
        self.verbs
            .range::<str, _>((Bound::Unbounded, Bound::Included(input)))
            .rev()
            .find(|(name, _)| input.starts_with(*name))
            .map(|(_, verb)| *verb)
    }

    pub fn scan(&self, format: &str) -> Result<Vec<Token>, FunctionError> {
        let mut tokens = Vec::new();
        let mut constant = String::new();
        let mut rest = format;

        while let Some(percent) = rest.find('%') {
            constant.push_str(&rest[..percent]);
            rest = &rest[percent + 1..];

            if let Some(after) = rest.strip_prefix('%') {
                constant.push('%');
                rest = after;
                continue;
            }

            let (precision, after) = scan_precision(rest)?;
            let verb = self.detect(after).ok_or_else(|| {
                FunctionError::InvalidFormat(format!(
                    "unknown verb at byte {} of '{format}'",
                    format.len() - rest.len() - 1
                ))
            })?;

            if !constant.is_empty() {
                tokens.push(Token::Constant(std::mem::take(&mut constant)));
            }

            tokens.push(Token::Verb { verb, precision });
            rest = &after[verb.name().len()..];
        }

        constant.push_str(rest);
        if !constant.is_empty() {
            tokens.push(Token::Constant(constant));
        }

        Ok(tokens)
    }
}

fn scan_precision(input: &str) -> Result<(Precision, &str), FunctionError> {
    let (width, rest) = scan_number(input)?;

    let Some(after_dot) = rest.strip_prefix('.') else {
        return Ok((Precision { width, scale: None }, rest));
    };

    let (scale, rest) = scan_number(after_dot)?;
    if scale.is_none() {
        return Err(FunctionError::InvalidFormat(
            "missing scale after '.'".to_string(),
        ));
    }

    Ok((Precision { width, scale }, rest))
}

fn scan_number(input: &str) -> Result<(Option<usize>, &str), FunctionError> {
    let digits = input.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return Ok((None, input));
    }

    let number = input[..digits]
        .parse::<usize>()
        .map_err(|e| FunctionError::InvalidFormat(e.to_string()))?;

    Ok((Some(number), &input[digits..]))
}
