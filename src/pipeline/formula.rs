//! Model formulas in the `response ~ a + b + a:b` notation
//!
//! Supported syntax:
//! - main effects separated by `+`
//! - interactions `a:b` (any number of factors)
//! - crossing `a*b`, expanded to `a + b + a:b`
//! - intercept control: a leading `0 +` / `1 +`, a bare `0` / `1`, or `- 1`

use std::fmt;

use super::error::{AnalysisError, Result};

/// One model term: a main effect (one factor) or an interaction (several)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Term {
    factors: Vec<String>,
}

impl Term {
    pub fn factors(&self) -> &[String] {
        &self.factors
    }

    /// Term label, e.g. `age:ypc`
    pub fn label(&self) -> String {
        self.factors.join(":")
    }

    fn same_factors(&self, other: &Term) -> bool {
        self.factors.len() == other.factors.len()
            && self.factors.iter().all(|f| other.factors.contains(f))
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A parsed model formula
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    pub response: String,
    pub terms: Vec<Term>,
    pub intercept: bool,
}

impl Formula {
    /// Build a formula from parts. Duplicate terms are collapsed.
    pub fn new(response: &str, terms: Vec<Term>, intercept: bool) -> Result<Self> {
        if response.trim().is_empty() {
            return Err(AnalysisError::config("formula has no response variable"));
        }
        let mut unique: Vec<Term> = Vec::with_capacity(terms.len());
        for term in terms {
            if !unique.iter().any(|t| t.same_factors(&term)) {
                unique.push(term);
            }
        }
        if unique.is_empty() && !intercept {
            return Err(AnalysisError::config("formula has neither terms nor an intercept"));
        }
        Ok(Self {
            response: response.trim().to_string(),
            terms: unique,
            intercept,
        })
    }

    /// Parse `response ~ rhs`.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AnalysisError::config("formula is empty"));
        }

        let (lhs, rhs) = text
            .split_once('~')
            .ok_or_else(|| AnalysisError::config(format!("formula '{}' is missing '~'", text)))?;

        let response = lhs.trim();
        if response.is_empty() {
            return Err(AnalysisError::config(format!(
                "formula '{}' has no response variable",
                text
            )));
        }
        validate_identifier(response, text)?;

        let rhs = rhs.trim();
        if rhs.is_empty() {
            return Err(AnalysisError::config(format!(
                "formula '{}' has no predictors (use '{} ~ 1' for an intercept-only model)",
                text, response
            )));
        }

        let mut intercept = true;
        let mut terms: Vec<Term> = Vec::new();

        for (negated, piece) in split_rhs(rhs) {
            let piece = piece.trim();
            if piece.is_empty() {
                return Err(AnalysisError::config(format!(
                    "formula '{}' has an empty term",
                    text
                )));
            }

            match (negated, piece) {
                (true, "1") | (false, "0") => {
                    intercept = false;
                    continue;
                }
                (false, "1") => {
                    intercept = true;
                    continue;
                }
                (true, _) => {
                    return Err(AnalysisError::config(format!(
                        "formula '{}': only '- 1' may be subtracted",
                        text
                    )))
                }
                _ => {}
            }

            terms.extend(expand_piece(piece, text)?);
        }

        Self::new(response, terms, intercept)
    }

    /// All variables referenced by the right-hand side, in first-appearance order
    pub fn predictors(&self) -> Vec<String> {
        let mut seen: Vec<String> = Vec::new();
        for term in &self.terms {
            for factor in term.factors() {
                if !seen.contains(factor) {
                    seen.push(factor.clone());
                }
            }
        }
        seen
    }

    /// Same right-hand side with a different response
    pub fn with_response(&self, response: &str) -> Self {
        Self {
            response: response.to_string(),
            terms: self.terms.clone(),
            intercept: self.intercept,
        }
    }

    /// True when `other` has the same response and intercept and every term of `self`
    pub fn is_nested_in(&self, other: &Formula) -> bool {
        self.response == other.response
            && self.intercept == other.intercept
            && self
                .terms
                .iter()
                .all(|t| other.terms.iter().any(|o| o.same_factors(t)))
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = Vec::new();
        if !self.intercept {
            parts.push("0".to_string());
        }
        parts.extend(self.terms.iter().map(Term::label));
        if parts.is_empty() {
            parts.push("1".to_string());
        }
        write!(f, "{} ~ {}", self.response, parts.join(" + "))
    }
}

/// Split the right-hand side on top-level `+`/`-`, flagging subtracted pieces
fn split_rhs(rhs: &str) -> Vec<(bool, String)> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut negated = false;

    for c in rhs.chars() {
        match c {
            '+' | '-' => {
                pieces.push((negated, std::mem::take(&mut current)));
                negated = c == '-';
            }
            _ => current.push(c),
        }
    }
    pieces.push((negated, current));
    pieces
}

/// Expand `a*b:c` style pieces into terms
fn expand_piece(piece: &str, text: &str) -> Result<Vec<Term>> {
    // Each `*`-separated group is itself an interaction of `:`-separated factors
    let mut groups: Vec<Vec<String>> = Vec::new();
    for group in piece.split('*') {
        let factors: Vec<String> = group.split(':').map(|f| f.trim().to_string()).collect();
        for factor in &factors {
            validate_identifier(factor, text)?;
        }
        groups.push(factors);
    }

    // Crossing: every non-empty subset of groups, in subset-size order
    let n = groups.len();
    let mut subsets: Vec<Vec<usize>> = (1..(1usize << n))
        .map(|mask| (0..n).filter(|i| mask & (1 << i) != 0).collect())
        .collect();
    subsets.sort_by_key(|s| s.len());

    let mut terms = Vec::with_capacity(subsets.len());
    for subset in subsets {
        let mut factors: Vec<String> = Vec::new();
        for &g in &subset {
            for factor in &groups[g] {
                if !factors.contains(factor) {
                    factors.push(factor.clone());
                }
            }
        }
        terms.push(Term { factors });
    }
    Ok(terms)
}

fn validate_identifier(name: &str, text: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '.')
        && !name.chars().next().is_some_and(|c| c.is_ascii_digit());
    if valid {
        Ok(())
    } else {
        Err(AnalysisError::config(format!(
            "formula '{}': invalid variable name '{}'",
            text, name
        )))
    }
}
