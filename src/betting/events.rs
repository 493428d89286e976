//! Priced bet-slip events built from a formula and a race field.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::debug;

use super::availability::{description, ensure_available, label, payout_places};
use super::formula::{
    parse_deux_sur_quatre, parse_quinte_base, parse_quinte_elargi, parse_simple_place,
};
use super::Label;
use crate::types::{BetEventType, EngineError, EngineResult, RaceField};

pub const SIMPLE_PLACE_STAKE: Decimal = dec!(1.50);
pub const DEUX_SUR_QUATRE_STAKE: Decimal = dec!(3.00);
pub const QUINTE_STAKE: Decimal = dec!(2.00);

/// Above this many combinations only the count is reported.
pub const MAX_ENUMERATED: u64 = 50;

const QUINTE_SIZE: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PmuCompliant {
    pub stake_unit: Decimal,
    pub combinations: u64,
    pub total_cost: Decimal,
}

impl PmuCompliant {
    fn new(stake_unit: Decimal, combinations: u64) -> Self {
        Self {
            stake_unit,
            combinations,
            total_cost: stake_unit * Decimal::from(combinations),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HorseSpecific {
    /// Formula as the user typed it.
    pub formula: String,
    /// Bankers (deux_sur_quatre_base, quinte_base), sorted.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub base: Vec<u32>,
    /// Partners of the banker (deux_sur_quatre_base), sorted.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub associates: Vec<u32>,
    /// Every runner on the slip, sorted.
    pub selection: Vec<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payout_places: Option<u32>,
    /// Enumerated when there are at most `MAX_ENUMERATED`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub combinations: Option<Vec<Vec<u32>>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BetEvent {
    pub id: String,
    pub race_id: String,
    pub event_type: BetEventType,
    pub label: Label,
    pub description: Label,
    pub pmu_compliant: PmuCompliant,
    pub horse_specific: HorseSpecific,
}

/// `{raceId}-{eventType}-{segments}`.
fn event_id(race: &RaceField, event_type: BetEventType, segments: &str) -> String {
    format!("{}-{}-{}", race.race_id, event_type.as_str(), segments)
}

fn joined(numbers: &[u32]) -> String {
    numbers
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join("-")
}

fn sorted(mut numbers: Vec<u32>) -> Vec<u32> {
    numbers.sort_unstable();
    numbers
}

/// Every selected runner must be a starter in the race.
fn ensure_starters(
    event_type: BetEventType,
    race: &RaceField,
    starters: &BTreeSet<u32>,
    numbers: &[u32],
) -> EngineResult<()> {
    match numbers.iter().find(|n| !starters.contains(n)) {
        Some(n) => Err(EngineError::invalid_formula(
            event_type,
            n.to_string(),
            format!("runner {n} is not a starter in {}", race.race_id),
        )),
        None => Ok(()),
    }
}

/// n choose k, saturating.
pub fn binomial(n: u64, k: u64) -> u64 {
    if k > n {
        return 0;
    }
    let k = k.min(n - k);
    (0..k).fold(1u64, |acc, i| acc.saturating_mul(n - i) / (i + 1))
}

/// All k-subsets of `items`, preserving order.
fn k_subsets(items: &[u32], k: usize) -> Vec<Vec<u32>> {
    if k == 0 {
        return vec![Vec::new()];
    }
    if items.len() < k {
        return Vec::new();
    }
    let mut out = Vec::new();
    for (i, &head) in items.iter().enumerate() {
        for mut tail in k_subsets(&items[i + 1..], k - 1) {
            tail.insert(0, head);
            out.push(tail);
        }
    }
    out
}

fn assemble(
    race: &RaceField,
    event_type: BetEventType,
    segments: String,
    pmu: PmuCompliant,
    horse: HorseSpecific,
) -> BetEvent {
    let event = BetEvent {
        id: event_id(race, event_type, &segments),
        race_id: race.race_id.clone(),
        event_type,
        label: label(event_type),
        description: description(event_type, race.total_runners),
        pmu_compliant: pmu,
        horse_specific: horse,
    };
    debug!(
        id = %event.id,
        combinations = event.pmu_compliant.combinations,
        total_cost = %event.pmu_compliant.total_cost,
        "Bet event built"
    );
    event
}

pub fn build_simple_place(race: &RaceField, formula: &str) -> EngineResult<BetEvent> {
    let event_type = BetEventType::SimplePlace;
    ensure_available(event_type, race.total_runners)?;
    let runner = parse_simple_place(formula)?;
    ensure_starters(event_type, race, &race.starter_numbers(), &[runner])?;

    Ok(assemble(
        race,
        event_type,
        runner.to_string(),
        PmuCompliant::new(SIMPLE_PLACE_STAKE, 1),
        HorseSpecific {
            formula: formula.to_string(),
            base: Vec::new(),
            associates: Vec::new(),
            selection: vec![runner],
            payout_places: Some(payout_places(race.total_runners)),
            combinations: Some(vec![vec![runner]]),
        },
    ))
}

pub fn build_deux_sur_quatre_base(race: &RaceField, formula: &str) -> EngineResult<BetEvent> {
    let event_type = BetEventType::DeuxSurQuatreBase;
    ensure_available(event_type, race.total_runners)?;
    let parsed = parse_deux_sur_quatre(formula)?;
    let starters = race.starter_numbers();
    ensure_starters(event_type, race, &starters, &[parsed.base])?;
    ensure_starters(event_type, race, &starters, &parsed.associates)?;

    let base = parsed.base;
    let associates = sorted(parsed.associates);
    let pairs: Vec<Vec<u32>> = associates.iter().map(|&a| vec![base, a]).collect();
    let count = pairs.len() as u64;

    Ok(assemble(
        race,
        event_type,
        format!("{base}x{}", joined(&associates)),
        PmuCompliant::new(DEUX_SUR_QUATRE_STAKE, count),
        HorseSpecific {
            formula: formula.to_string(),
            base: vec![base],
            selection: sorted(associates.iter().copied().chain([base]).collect()),
            associates,
            payout_places: Some(4),
            combinations: (count <= MAX_ENUMERATED).then_some(pairs),
        },
    ))
}

pub fn build_quinte_base(race: &RaceField, formula: &str) -> EngineResult<BetEvent> {
    let event_type = BetEventType::QuinteBase;
    ensure_available(event_type, race.total_runners)?;
    let bases = sorted(parse_quinte_base(formula)?);
    let starters = race.starter_numbers();
    ensure_starters(event_type, race, &starters, &bases)?;
    if bases.len() > QUINTE_SIZE {
        return Err(EngineError::invalid_formula(
            event_type,
            joined(&bases),
            format!("at most {QUINTE_SIZE} base runners, got {}", bases.len()),
        ));
    }

    let others: Vec<u32> = starters
        .iter()
        .copied()
        .filter(|n| !bases.contains(n))
        .collect();
    let open = QUINTE_SIZE - bases.len();
    let count = binomial(others.len() as u64, open as u64);
    if count == 0 {
        return Err(EngineError::invalid_formula(
            event_type,
            joined(&bases),
            format!("not enough other starters to complete {QUINTE_SIZE} places"),
        ));
    }

    let combinations = (count <= MAX_ENUMERATED).then(|| {
        k_subsets(&others, open)
            .into_iter()
            .map(|rest| sorted(bases.iter().copied().chain(rest).collect()))
            .collect::<Vec<_>>()
    });

    Ok(assemble(
        race,
        event_type,
        format!("{}xx", joined(&bases)),
        PmuCompliant::new(QUINTE_STAKE, count),
        HorseSpecific {
            formula: formula.to_string(),
            selection: bases.clone(),
            base: bases,
            associates: Vec::new(),
            payout_places: Some(QUINTE_SIZE as u32),
            combinations,
        },
    ))
}

pub fn build_quinte_elargi(race: &RaceField, formula: &str) -> EngineResult<BetEvent> {
    let event_type = BetEventType::QuinteElargi;
    ensure_available(event_type, race.total_runners)?;
    let runners = sorted(parse_quinte_elargi(formula)?);
    ensure_starters(event_type, race, &race.starter_numbers(), &runners)?;

    let count = binomial(runners.len() as u64, QUINTE_SIZE as u64);
    let combinations = (count <= MAX_ENUMERATED).then(|| k_subsets(&runners, QUINTE_SIZE));

    Ok(assemble(
        race,
        event_type,
        joined(&runners),
        PmuCompliant::new(QUINTE_STAKE, count),
        HorseSpecific {
            formula: formula.to_string(),
            base: Vec::new(),
            associates: Vec::new(),
            selection: runners,
            payout_places: Some(QUINTE_SIZE as u32),
            combinations,
        },
    ))
}

/// Build any bet type; nothing is returned unless the whole formula
/// validates against the race.
pub fn build_event(
    event_type: BetEventType,
    race: &RaceField,
    formula: &str,
) -> EngineResult<BetEvent> {
    match event_type {
        BetEventType::SimplePlace => build_simple_place(race, formula),
        BetEventType::DeuxSurQuatreBase => build_deux_sur_quatre_base(race, formula),
        BetEventType::QuinteBase => build_quinte_base(race, formula),
        BetEventType::QuinteElargi => build_quinte_elargi(race, formula),
    }
}
