//! Parimutuel bet-slip construction for horse racing.
//!
//! Works straight off a race's participant list rather than the day's
//! snapshot: `availability` decides which bet types the field size
//! allows, `formula` parses user input, `events` validates it against the
//! field and prices it.

pub mod availability;
pub mod events;
pub mod formula;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::sports::HorseRacingAdapter;
use crate::types::{BetEventType, EngineResult, Participant, RaceField};

pub use availability::{generate_horse_events, EventAvailability};
pub use events::{build_event, BetEvent, HorseSpecific, PmuCompliant};

/// French/English text pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Label {
    pub fr: String,
    pub en: String,
}

impl Label {
    pub fn new(fr: impl Into<String>, en: impl Into<String>) -> Self {
        Self {
            fr: fr.into(),
            en: en.into(),
        }
    }
}

/// Anything that can produce the normalized field of a race.
#[async_trait]
pub trait ParticipantSource: Send + Sync {
    async fn race_field(&self, date: NaiveDate, race_id: &str) -> EngineResult<RaceField>;
}

#[async_trait]
impl ParticipantSource for HorseRacingAdapter {
    async fn race_field(&self, date: NaiveDate, race_id: &str) -> EngineResult<RaceField> {
        self.fetch_race_field(date, race_id).await
    }
}

/// A race's field together with the bets it offers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RaceEvents {
    pub race_id: String,
    pub date: NaiveDate,
    pub total_runners: u32,
    pub participants: Vec<Participant>,
    pub events: Vec<EventAvailability>,
}

pub struct BetEventBuilder {
    source: Arc<dyn ParticipantSource>,
}

impl BetEventBuilder {
    pub fn new(source: Arc<dyn ParticipantSource>) -> Self {
        Self { source }
    }

    /// Fetch the race field and list which bet types it allows.
    pub async fn race_events(&self, date: NaiveDate, race_id: &str) -> EngineResult<RaceEvents> {
        let field = self.source.race_field(date, race_id).await?;
        let events = generate_horse_events(field.total_runners, &field.race_id);
        Ok(RaceEvents {
            race_id: field.race_id,
            date,
            total_runners: field.total_runners,
            participants: field.participants,
            events,
        })
    }

    /// Fetch the race field and build one bet event from a formula.
    pub async fn build(
        &self,
        date: NaiveDate,
        race_id: &str,
        event_type: BetEventType,
        formula: &str,
    ) -> EngineResult<BetEvent> {
        let field = self.source.race_field(date, race_id).await?;
        let event = build_event(event_type, &field, formula)?;
        info!(
            id = %event.id,
            %date,
            total_cost = %event.pmu_compliant.total_cost,
            "Bet event created"
        );
        Ok(event)
    }
}
