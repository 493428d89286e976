//! Which bet types a race offers, given its field size.

use serde::Serialize;

use super::Label;
use crate::types::{BetEventType, EngineError, EngineResult};

/// Field size from which three places pay out in simple_place, and from
/// which the quinté bets open.
pub const QUINTE_MIN_RUNNERS: u32 = 8;
pub const DEUX_SUR_QUATRE_MIN_RUNNERS: u32 = 10;

/// One bet type as offered (or not) for a race.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventAvailability {
    pub race_id: String,
    pub event_type: BetEventType,
    pub available: bool,
    pub label: Label,
    pub description: Label,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Places paid by a simple_place bet.
pub fn payout_places(total_runners: u32) -> u32 {
    if total_runners >= QUINTE_MIN_RUNNERS {
        3
    } else {
        2
    }
}

pub fn min_runners(event_type: BetEventType) -> u32 {
    match event_type {
        BetEventType::SimplePlace => 0,
        BetEventType::DeuxSurQuatreBase => DEUX_SUR_QUATRE_MIN_RUNNERS,
        BetEventType::QuinteBase | BetEventType::QuinteElargi => QUINTE_MIN_RUNNERS,
    }
}

/// `Some(reason)` when the field is too small for the bet type.
pub fn gate_reason(event_type: BetEventType, total_runners: u32) -> Option<String> {
    let needed = min_runners(event_type);
    (total_runners < needed).then(|| {
        format!("requires at least {needed} runners, race has {total_runners}")
    })
}

/// Re-check a gate at build time.
pub fn ensure_available(event_type: BetEventType, total_runners: u32) -> EngineResult<()> {
    match gate_reason(event_type, total_runners) {
        Some(reason) => Err(EngineError::invalid_formula(
            event_type,
            total_runners.to_string(),
            reason,
        )),
        None => Ok(()),
    }
}

pub fn label(event_type: BetEventType) -> Label {
    match event_type {
        BetEventType::SimplePlace => Label::new("Simple Placé", "Place"),
        BetEventType::DeuxSurQuatreBase => Label::new("2sur4 en base", "2-in-4 with banker"),
        BetEventType::QuinteBase => Label::new("Quinté+ en base", "Quinté+ with bankers"),
        BetEventType::QuinteElargi => Label::new("Quinté+ élargi", "Quinté+ extended field"),
    }
}

pub fn description(event_type: BetEventType, total_runners: u32) -> Label {
    match event_type {
        BetEventType::SimplePlace => {
            let places = payout_places(total_runners);
            Label::new(
                format!("Votre cheval doit terminer dans les {places} premiers"),
                format!("Your horse must finish in the first {places}"),
            )
        }
        BetEventType::DeuxSurQuatreBase => Label::new(
            "Le cheval de base et un associé doivent terminer dans les 4 premiers",
            "The banker and one partner must both finish in the first 4",
        ),
        BetEventType::QuinteBase => Label::new(
            "Vos chevaux de base complétés par tous les autres partants",
            "Your bankers combined with every other starter",
        ),
        BetEventType::QuinteElargi => Label::new(
            "Toutes les combinaisons de 5 chevaux parmi votre sélection",
            "Every 5-horse combination from your selection",
        ),
    }
}

/// Availability of every bet type for a race of `total_runners` starters.
pub fn generate_horse_events(total_runners: u32, race_id: &str) -> Vec<EventAvailability> {
    BetEventType::ALL
        .iter()
        .map(|&event_type| {
            let reason = gate_reason(event_type, total_runners);
            EventAvailability {
                race_id: race_id.to_string(),
                event_type,
                available: reason.is_none(),
                label: label(event_type),
                description: description(event_type, total_runners),
                reason,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn available(events: &[EventAvailability], t: BetEventType) -> bool {
        events.iter().find(|e| e.event_type == t).unwrap().available
    }

    #[test]
    fn test_seven_runners_only_simple_place() {
        let events = generate_horse_events(7, "R1C1");
        assert_eq!(events.len(), 4);
        assert!(available(&events, BetEventType::SimplePlace));
        assert!(!available(&events, BetEventType::DeuxSurQuatreBase));
        assert!(!available(&events, BetEventType::QuinteBase));
        assert!(!available(&events, BetEventType::QuinteElargi));

        let gated = events
            .iter()
            .find(|e| e.event_type == BetEventType::QuinteBase)
            .unwrap();
        assert_eq!(
            gated.reason.as_deref(),
            Some("requires at least 8 runners, race has 7")
        );
    }

    #[test]
    fn test_ten_runners_everything_open() {
        let events = generate_horse_events(10, "R1C1");
        assert!(events.iter().all(|e| e.available && e.reason.is_none()));
    }

    #[test]
    fn test_eight_and_nine_runners() {
        for n in [8, 9] {
            let events = generate_horse_events(n, "R2C4");
            assert!(available(&events, BetEventType::QuinteBase));
            assert!(available(&events, BetEventType::QuinteElargi));
            assert!(!available(&events, BetEventType::DeuxSurQuatreBase));
        }
    }

    #[test]
    fn test_payout_places() {
        assert_eq!(payout_places(7), 2);
        assert_eq!(payout_places(8), 3);
        assert!(description(BetEventType::SimplePlace, 7).en.contains("first 2"));
        assert!(description(BetEventType::SimplePlace, 12).fr.contains("3 premiers"));
    }

    #[test]
    fn test_ensure_available() {
        assert!(ensure_available(BetEventType::SimplePlace, 0).is_ok());
        let err = ensure_available(BetEventType::DeuxSurQuatreBase, 9).unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidBetFormula { ref event_type, ref token, .. }
                if event_type == "deux_sur_quatre_base" && token == "9"
        ));
    }
}
