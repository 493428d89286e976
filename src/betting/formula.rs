//! Bet-slip formula grammars.
//!
//! Whitespace is ignored everywhere:
//!
//! - simple_place: `7`
//! - deux_sur_quatre_base: `14x 5-9` (base, `x`, hyphenated partners)
//! - quinte_base: `14-5-9xx` (3 or more hyphenated bankers, `xx` suffix)
//! - quinte_elargi: `1-4-7-9-12-14` (5 or more hyphenated runners)
//!
//! Parsing only checks shape and distinctness; checking the numbers
//! against a race field is the builders' job.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

use crate::types::{BetEventType, EngineError, EngineResult};

static RE_SINGLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+$").expect("static regex"));

static RE_DEUX_SUR_QUATRE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\d+)x(\d+(?:-\d+)*)$").expect("static regex")
});

static RE_QUINTE_BASE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(\d+(?:-\d+)*)xx$").expect("static regex"));

static RE_HYPHEN_LIST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(?:-\d+)*$").expect("static regex"));

pub const QUINTE_MIN_BASES: usize = 3;
pub const QUINTE_ELARGI_MIN: usize = 5;

/// `2sur4` selection: one banker plus its partners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseSelection {
    pub base: u32,
    pub associates: Vec<u32>,
}

fn compact(formula: &str) -> String {
    formula.chars().filter(|c| !c.is_whitespace()).collect()
}

fn shape_error(event_type: BetEventType, formula: &str, expected: &str) -> EngineError {
    let token = if formula.trim().is_empty() {
        "<empty>".to_string()
    } else {
        formula.trim().to_string()
    };
    EngineError::invalid_formula(event_type, token, format!("expected {expected}"))
}

fn runner_number(event_type: BetEventType, token: &str) -> EngineResult<u32> {
    match token.parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(EngineError::invalid_formula(
            event_type,
            token,
            "not a valid runner number",
        )),
    }
}

/// Parse a hyphen list, rejecting repeated numbers.
fn distinct_list(event_type: BetEventType, list: &str) -> EngineResult<Vec<u32>> {
    let mut seen = HashSet::new();
    let mut numbers = Vec::new();
    for token in list.split('-') {
        let n = runner_number(event_type, token)?;
        if !seen.insert(n) {
            return Err(EngineError::invalid_formula(
                event_type,
                token,
                "runner selected twice",
            ));
        }
        numbers.push(n);
    }
    Ok(numbers)
}

pub fn parse_simple_place(formula: &str) -> EngineResult<u32> {
    let event_type = BetEventType::SimplePlace;
    let f = compact(formula);
    if !RE_SINGLE.is_match(&f) {
        return Err(shape_error(event_type, formula, "exactly one runner number"));
    }
    runner_number(event_type, &f)
}

pub fn parse_deux_sur_quatre(formula: &str) -> EngineResult<BaseSelection> {
    let event_type = BetEventType::DeuxSurQuatreBase;
    let f = compact(formula);
    let caps = RE_DEUX_SUR_QUATRE
        .captures(&f)
        .ok_or_else(|| shape_error(event_type, formula, "'<base>x <n1>-<n2>-...'"))?;

    let base = runner_number(event_type, &caps[1])?;
    let associates = distinct_list(event_type, &caps[2])?;
    if associates.contains(&base) {
        return Err(EngineError::invalid_formula(
            event_type,
            base.to_string(),
            "base runner repeated among partners",
        ));
    }

    Ok(BaseSelection { base, associates })
}

pub fn parse_quinte_base(formula: &str) -> EngineResult<Vec<u32>> {
    let event_type = BetEventType::QuinteBase;
    let f = compact(formula);
    let caps = RE_QUINTE_BASE
        .captures(&f)
        .ok_or_else(|| shape_error(event_type, formula, "'<n1>-<n2>-<n3>xx'"))?;

    let bases = distinct_list(event_type, &caps[1])?;
    if bases.len() < QUINTE_MIN_BASES {
        return Err(EngineError::invalid_formula(
            event_type,
            &caps[1],
            format!(
                "needs at least {QUINTE_MIN_BASES} base runners, got {}",
                bases.len()
            ),
        ));
    }
    Ok(bases)
}

pub fn parse_quinte_elargi(formula: &str) -> EngineResult<Vec<u32>> {
    let event_type = BetEventType::QuinteElargi;
    let f = compact(formula);
    if !RE_HYPHEN_LIST.is_match(&f) {
        return Err(shape_error(event_type, formula, "'<n1>-<n2>-<n3>-<n4>-<n5>[-...]'"));
    }

    let runners = distinct_list(event_type, &f)?;
    if runners.len() < QUINTE_ELARGI_MIN {
        return Err(EngineError::invalid_formula(
            event_type,
            f.as_str(),
            format!("needs at least {QUINTE_ELARGI_MIN} runners, got {}", runners.len()),
        ));
    }
    Ok(runners)
}
