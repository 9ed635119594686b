use chrono::{DateTime, Duration, NaiveTime, TimeZone, Timelike};
use chrono_tz::Tz;
use once_cell::sync::Lazy;

use crate::models::assignment::CheckpointLabel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointKind {
    /// The 8 AM attendance and PPE confirmation deadline.
    AttendanceGate,
    /// One of the four expected status-update slots.
    StatusGate(CheckpointLabel),
}

#[derive(Debug, Clone, Copy)]
pub struct Checkpoint {
    pub time: NaiveTime,
    pub kind: CheckpointKind,
}

fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
}

/// The fixed daily checkpoint table the monitor evaluates against.
pub static CHECKPOINTS: Lazy<[Checkpoint; 5]> = Lazy::new(|| {
    [
        Checkpoint {
            time: hm(8, 0),
            kind: CheckpointKind::AttendanceGate,
        },
        Checkpoint {
            time: hm(11, 0),
            kind: CheckpointKind::StatusGate(CheckpointLabel::ElevenAm),
        },
        Checkpoint {
            time: hm(13, 0),
            kind: CheckpointKind::StatusGate(CheckpointLabel::OnePm),
        },
        Checkpoint {
            time: hm(15, 0),
            kind: CheckpointKind::StatusGate(CheckpointLabel::ThreePm),
        },
        Checkpoint {
            time: hm(18, 0),
            kind: CheckpointKind::StatusGate(CheckpointLabel::Eod),
        },
    ]
});

/// The checkpoint whose wall-clock minute matches `t`, if any. Seconds
/// are ignored so a tick landing anywhere inside the minute still counts.
pub fn checkpoint_at(t: NaiveTime) -> Option<&'static Checkpoint> {
    CHECKPOINTS
        .iter()
        .find(|cp| cp.time.hour() == t.hour() && cp.time.minute() == t.minute())
}

/// The next instant strictly after `now` at which the monitor has work:
/// the earliest upcoming checkpoint or one of the `extra` times of day.
///
/// Computed directly rather than polled for, so the loop cannot drift
/// past a checkpoint. Local times that do not exist on a given day (DST
/// gaps) resolve to the nearest valid instant, matching how schedule
/// start times are localized elsewhere.
pub fn next_trigger_after(now: DateTime<Tz>, extra: &[NaiveTime]) -> DateTime<Tz> {
    let mut times: Vec<NaiveTime> = CHECKPOINTS
        .iter()
        .map(|cp| cp.time)
        .chain(extra.iter().copied())
        .collect();
    times.sort();
    times.dedup();

    let tz = now.timezone();
    for day_offset in 0..=2 {
        let date = now.date_naive() + Duration::days(day_offset);
        for &t in &times {
            if day_offset == 0 && t <= now.time() {
                continue;
            }
            let naive = date.and_time(t);
            let localized = tz
                .from_local_datetime(&naive)
                .earliest()
                .or_else(|| tz.from_local_datetime(&naive).latest());
            if let Some(instant) = localized {
                return instant;
            }
        }
    }

    now + Duration::days(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(hour: u32, minute: u32, second: u32) -> DateTime<Tz> {
        chrono_tz::UTC
            .with_ymd_and_hms(2025, 3, 3, hour, minute, second)
            .unwrap()
    }

    #[test]
    fn checkpoint_table_matches_on_the_minute() {
        assert!(matches!(
            checkpoint_at(hm(8, 0)).unwrap().kind,
            CheckpointKind::AttendanceGate
        ));
        assert!(matches!(
            checkpoint_at(hm(11, 0)).unwrap().kind,
            CheckpointKind::StatusGate(CheckpointLabel::ElevenAm)
        ));
        assert!(matches!(
            checkpoint_at(hm(18, 0)).unwrap().kind,
            CheckpointKind::StatusGate(CheckpointLabel::Eod)
        ));
        assert!(checkpoint_at(hm(11, 1)).is_none());
        assert!(checkpoint_at(hm(12, 0)).is_none());
    }

    #[test]
    fn checkpoint_match_ignores_seconds() {
        let late_in_minute = NaiveTime::from_hms_opt(11, 0, 42).unwrap();
        assert!(checkpoint_at(late_in_minute).is_some());
    }

    #[test]
    fn next_trigger_is_the_upcoming_checkpoint() {
        let next = next_trigger_after(at(10, 59, 0), &[]);
        assert_eq!(next, at(11, 0, 0));
    }

    #[test]
    fn next_trigger_is_strictly_after_now() {
        let next = next_trigger_after(at(11, 0, 0), &[]);
        assert_eq!(next, at(13, 0, 0));
    }

    #[test]
    fn next_trigger_rolls_over_to_the_next_day() {
        let next = next_trigger_after(at(19, 30, 0), &[]);
        let expected = chrono_tz::UTC
            .with_ymd_and_hms(2025, 3, 4, 8, 0, 0)
            .unwrap();
        assert_eq!(next, expected);
    }

    #[test]
    fn extra_times_participate_in_the_schedule() {
        let sweep = hm(7, 0);
        let next = next_trigger_after(at(6, 15, 0), &[sweep]);
        assert_eq!(next, at(7, 0, 0));

        let next = next_trigger_after(at(19, 30, 0), &[sweep]);
        let expected = chrono_tz::UTC
            .with_ymd_and_hms(2025, 3, 4, 7, 0, 0)
            .unwrap();
        assert_eq!(next, expected);
    }
}
