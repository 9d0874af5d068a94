//! Product patterns.
//!
//! `PatternSpec` is the configuration form (deserialized from TOML);
//! `Pattern` is the compiled form with tokens normalized and regexes built.
//! Compilation is where malformed patterns are rejected.
//!
//! ```toml
//! pattern = { name_contains = ["25 KG", "SACO 25"] }
//! pattern = { all = [{ code_prefix = "MREGR" }, { name_contains = ["25 KG"] }] }
//! ```

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::error::{RuleError, RuleResult};
use crate::normalize::{contains_token, normalize_code, normalize_text};
use crate::product::NormalizedProduct;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternSpec {
    /// Name contains any of the tokens.
    NameContains(Vec<String>),
    CodeEquals(String),
    CodePrefix(String),
    CodeContains(String),
    /// Case-insensitive regex over the normalized name.
    NameRegex(String),
    All(Vec<PatternSpec>),
    Any(Vec<PatternSpec>),
    Not(Box<PatternSpec>),
}

impl PatternSpec {
    pub fn name_contains<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        PatternSpec::NameContains(tokens.into_iter().map(Into::into).collect())
    }

    pub(crate) fn compile(&self, rule_id: &str) -> RuleResult<Pattern> {
        let invalid = |reason: String| RuleError::InvalidPattern {
            rule_id: rule_id.to_string(),
            reason,
        };

        match self {
            PatternSpec::NameContains(tokens) => {
                if tokens.is_empty() {
                    return Err(invalid("name_contains has no tokens".into()));
                }
                let mut normalized = Vec::with_capacity(tokens.len());
                for token in tokens {
                    let token = normalize_text(token);
                    if token.is_empty() {
                        return Err(invalid("name_contains has a blank token".into()));
                    }
                    normalized.push(token);
                }
                Ok(Pattern::NameContains(normalized))
            }
            PatternSpec::CodeEquals(code) => {
                Ok(Pattern::CodeEquals(non_blank_code(code, "code_equals", &invalid)?))
            }
            PatternSpec::CodePrefix(code) => {
                Ok(Pattern::CodePrefix(non_blank_code(code, "code_prefix", &invalid)?))
            }
            PatternSpec::CodeContains(code) => Ok(Pattern::CodeContains(non_blank_code(
                code,
                "code_contains",
                &invalid,
            )?)),
            PatternSpec::NameRegex(source) => {
                let regex = RegexBuilder::new(source)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| invalid(e.to_string()))?;
                Ok(Pattern::NameRegex(regex))
            }
            PatternSpec::All(parts) | PatternSpec::Any(parts) => {
                if parts.is_empty() {
                    return Err(invalid("combinator has no sub-patterns".into()));
                }
                let compiled = parts
                    .iter()
                    .map(|p| p.compile(rule_id))
                    .collect::<RuleResult<Vec<_>>>()?;
                if matches!(self, PatternSpec::All(_)) {
                    Ok(Pattern::All(compiled))
                } else {
                    Ok(Pattern::Any(compiled))
                }
            }
            PatternSpec::Not(inner) => Ok(Pattern::Not(Box::new(inner.compile(rule_id)?))),
        }
    }
}

fn non_blank_code(
    code: &str,
    kind: &str,
    invalid: &dyn Fn(String) -> RuleError,
) -> RuleResult<String> {
    let code = normalize_code(code);
    if code.is_empty() {
        return Err(invalid(format!("{kind} is blank")));
    }
    Ok(code)
}

#[derive(Clone, Debug)]
pub(crate) enum Pattern {
    NameContains(Vec<String>),
    CodeEquals(String),
    CodePrefix(String),
    CodeContains(String),
    NameRegex(Regex),
    All(Vec<Pattern>),
    Any(Vec<Pattern>),
    Not(Box<Pattern>),
}

impl Pattern {
    pub fn matches(&self, product: &NormalizedProduct) -> bool {
        match self {
            Pattern::NameContains(tokens) => tokens.iter().any(|t| contains_token(&product.name, t)),
            Pattern::CodeEquals(code) => product.code == *code,
            Pattern::CodePrefix(prefix) => product.code.starts_with(prefix.as_str()),
            Pattern::CodeContains(fragment) => product.code.contains(fragment.as_str()),
            Pattern::NameRegex(regex) => regex.is_match(&product.name),
            Pattern::All(parts) => parts.iter().all(|p| p.matches(product)),
            Pattern::Any(parts) => parts.iter().any(|p| p.matches(product)),
            Pattern::Not(inner) => !inner.matches(product),
        }
    }
}
