use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Regular weekly collection or a special event pickup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeekType {
    Regular,
    Event,
}

impl WeekType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WeekType::Regular => "Regular",
            WeekType::Event => "Event",
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown week type: {0}")]
pub struct ParseWeekTypeError(String);

impl TryFrom<String> for WeekType {
    type Error = ParseWeekTypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "Regular" => Ok(WeekType::Regular),
            "Event" => Ok(WeekType::Event),
            _ => Err(ParseWeekTypeError(value)),
        }
    }
}

impl std::fmt::Display for WeekType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One of the four fixed times of day at which dispatch expects a status
/// update for an active assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CheckpointLabel {
    #[serde(rename = "11AM")]
    ElevenAm,
    #[serde(rename = "1PM")]
    OnePm,
    #[serde(rename = "3PM")]
    ThreePm,
    #[serde(rename = "EOD")]
    Eod,
}

impl CheckpointLabel {
    pub const ALL: [CheckpointLabel; 4] = [
        CheckpointLabel::ElevenAm,
        CheckpointLabel::OnePm,
        CheckpointLabel::ThreePm,
        CheckpointLabel::Eod,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CheckpointLabel::ElevenAm => "11AM",
            CheckpointLabel::OnePm => "1PM",
            CheckpointLabel::ThreePm => "3PM",
            CheckpointLabel::Eod => "EOD",
        }
    }
}

impl std::fmt::Display for CheckpointLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dispatcher-submitted status text per checkpoint. Every assignment
/// carries all four slots; a slot is `None` until a status is submitted
/// for it, after which it holds the operator's text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusUpdates {
    #[serde(rename = "11AM")]
    pub eleven_am: Option<String>,
    #[serde(rename = "1PM")]
    pub one_pm: Option<String>,
    #[serde(rename = "3PM")]
    pub three_pm: Option<String>,
    #[serde(rename = "EOD")]
    pub eod: Option<String>,
}

impl StatusUpdates {
    pub fn get(&self, label: CheckpointLabel) -> Option<&str> {
        match label {
            CheckpointLabel::ElevenAm => self.eleven_am.as_deref(),
            CheckpointLabel::OnePm => self.one_pm.as_deref(),
            CheckpointLabel::ThreePm => self.three_pm.as_deref(),
            CheckpointLabel::Eod => self.eod.as_deref(),
        }
    }

    pub fn set(&mut self, label: CheckpointLabel, status: impl Into<String>) {
        let slot = match label {
            CheckpointLabel::ElevenAm => &mut self.eleven_am,
            CheckpointLabel::OnePm => &mut self.one_pm,
            CheckpointLabel::ThreePm => &mut self.three_pm,
            CheckpointLabel::Eod => &mut self.eod,
        };
        *slot = Some(status.into());
    }
}

/// The work unit linking a crew, a route, a client and a zone to a
/// specific collection date (`doc`).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Assignment {
    pub id: Uuid,
    pub crew_id: Uuid,
    pub route_id: Uuid,
    pub client_id: Uuid,
    pub zone_id: Uuid,
    pub week_number: i32,
    pub doc: NaiveDate,
    pub dow: String,
    #[sqlx(try_from = "String")]
    pub week_type: WeekType,
    pub start_time: NaiveTime,
    pub end_time: Option<NaiveTime>,
    pub completion_time: f64,
    pub attendance_confirmed: bool,
    pub ppe_compliance: bool,
    #[sqlx(json)]
    pub status_updates: StatusUpdates,
}

impl Assignment {
    /// Hours between start and end measured on the collection date. Only
    /// meaningful once `end_time` is set.
    pub fn completion_hours(start: NaiveTime, end: NaiveTime) -> f64 {
        (end - start).num_seconds() as f64 / 3600.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAssignment {
    pub crew_id: Uuid,
    pub route_id: Uuid,
    pub client_id: Uuid,
    pub zone_id: Uuid,
    pub week_number: i32,
    pub doc: NaiveDate,
    pub dow: String,
    pub week_type: WeekType,
    pub start_time: NaiveTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_updates_serialize_with_all_four_keys() {
        let value = serde_json::to_value(StatusUpdates::default()).unwrap();
        let map = value.as_object().unwrap();
        assert_eq!(map.len(), 4);
        for key in ["11AM", "1PM", "3PM", "EOD"] {
            assert!(map.contains_key(key), "missing key {key}");
            assert!(map[key].is_null());
        }
    }

    #[test]
    fn status_updates_set_then_get() {
        let mut updates = StatusUpdates::default();
        assert!(updates.get(CheckpointLabel::OnePm).is_none());

        updates.set(CheckpointLabel::OnePm, "On track, 60% done");
        assert_eq!(
            updates.get(CheckpointLabel::OnePm),
            Some("On track, 60% done")
        );
        assert!(updates.get(CheckpointLabel::Eod).is_none());
    }

    #[test]
    fn checkpoint_labels_round_trip_through_serde() {
        for label in CheckpointLabel::ALL {
            let json = serde_json::to_string(&label).unwrap();
            assert_eq!(json, format!("\"{}\"", label.as_str()));
            let back: CheckpointLabel = serde_json::from_str(&json).unwrap();
            assert_eq!(back, label);
        }
    }

    #[test]
    fn completion_hours_spans_start_to_end() {
        let start = NaiveTime::from_hms_opt(6, 30, 0).unwrap();
        let end = NaiveTime::from_hms_opt(14, 0, 0).unwrap();
        assert!((Assignment::completion_hours(start, end) - 7.5).abs() < f64::EPSILON);
    }

    #[test]
    fn week_type_rejects_unknown_values() {
        assert_eq!(
            WeekType::try_from("Regular".to_string()).unwrap(),
            WeekType::Regular
        );
        assert!(WeekType::try_from("Holiday".to_string()).is_err());
    }
}
