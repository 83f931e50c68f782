use crate::hours::{format_hhmm, HourTable};
use chrono::{Datelike, NaiveDateTime, Timelike, Weekday};
use serde::{Deserialize, Deserializer, Serialize};

pub const MINUTES_PER_DAY: i64 = 1440;
const DAYS_PER_WEEK: i64 = 7;

/// Teaching days. Sunday has no classes and therefore no variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Day {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl Day {
    pub const ALL: [Day; 6] = [
        Day::Monday,
        Day::Tuesday,
        Day::Wednesday,
        Day::Thursday,
        Day::Friday,
        Day::Saturday,
    ];

    /// 0 for Monday .. 5 for Saturday.
    pub fn index(self) -> i64 {
        self as i64
    }

    pub fn from_weekday(w: Weekday) -> Option<Day> {
        Day::ALL.get(w.num_days_from_monday() as usize).copied()
    }

    /// Accepts English and Spanish names or their three-letter prefixes, any case.
    pub fn parse(raw: &str) -> Option<Day> {
        let t = raw.trim().to_lowercase();
        let key: String = t.chars().take(3).collect();
        if key.chars().count() < 2 {
            return None;
        }
        match key.as_str() {
            "mon" | "lun" | "lu" => Some(Day::Monday),
            "tue" | "mar" | "ma" => Some(Day::Tuesday),
            "wed" | "mie" | "mié" | "mi" => Some(Day::Wednesday),
            "thu" | "jue" | "ju" => Some(Day::Thursday),
            "fri" | "vie" | "vi" => Some(Day::Friday),
            "sat" | "sab" | "sáb" | "sa" => Some(Day::Saturday),
            _ => None,
        }
    }
}

fn de_day<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Day>, D::Error> {
    let v = serde_json::Value::deserialize(d)?;
    Ok(v.as_str().and_then(Day::parse))
}

/// Something that can be shown by name when embedded in a block or section.
pub trait Labelled {
    fn label(&self) -> String;
}

/// A room/teacher reference: either an opaque id or the full record inline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Linked<T> {
    Ref { id: String },
    Embedded { record: T },
}

impl<T: Labelled> Linked<T> {
    pub fn label(&self) -> String {
        match self {
            Linked::Ref { id } => id.clone(),
            Linked::Embedded { record } => record.label(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub building: Option<String>,
}

impl Labelled for Room {
    fn label(&self) -> String {
        match &self.building {
            Some(b) if !b.trim().is_empty() => format!("{}-{}", b.trim(), self.name),
            _ => self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleBlock {
    #[serde(deserialize_with = "de_day", default)]
    pub day: Option<Day>,
    pub start_hour: u32,
    pub duration: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<Linked<Room>>,
}

impl ScheduleBlock {
    pub fn new(day: Day, start_hour: u32, duration: u32) -> Self {
        Self {
            day: Some(day),
            start_hour,
            duration,
            room: None,
        }
    }

    pub fn end_hour(&self) -> Option<u32> {
        if self.duration == 0 {
            return None;
        }
        self.start_hour.checked_add(self.duration - 1)
    }

    pub fn room_label(&self) -> Option<String> {
        self.room.as_ref().map(|r| r.label())
    }
}

/// A block tagged with the course/section that owns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledBlock {
    #[serde(default)]
    pub course_id: String,
    #[serde(default)]
    pub section_id: String,
    #[serde(flatten)]
    pub block: ScheduleBlock,
}

pub type WeeklySchedule = Vec<ScheduledBlock>;

/// Wall-clock occupation of a block: `end` is the exclusive end minute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockWindow {
    pub day: Day,
    pub start: i64,
    pub end: i64,
}

pub fn block_window(table: &HourTable, block: &ScheduleBlock) -> Option<BlockWindow> {
    let day = block.day?;
    let end_hour = block.end_hour()?;
    let (start, _) = table.minutes(block.start_hour)?;
    let (_, end) = table.minutes(end_hour)?;
    Some(BlockWindow { day, start, end })
}

/// Closed minute range `[first, last]` actually occupied by the block.
pub fn block_minutes(table: &HourTable, block: &ScheduleBlock) -> Option<(i64, i64)> {
    block_window(table, block).map(|w| (w.start, w.end - 1))
}

pub fn time_range(table: &HourTable, start_index: u32, end_index: u32) -> Option<String> {
    if end_index < start_index {
        return None;
    }
    let start = table.resolve(start_index)?;
    let end = table.resolve(end_index)?;
    Some(format!("{}–{}", format_hhmm(start.start), format_hhmm(end.end)))
}

pub fn block_time_range(table: &HourTable, block: &ScheduleBlock) -> Option<String> {
    time_range(table, block.start_hour, block.end_hour()?)
}

pub fn overlaps(table: &HourTable, a: &ScheduleBlock, b: &ScheduleBlock) -> bool {
    let (Some(day_a), Some(day_b)) = (a.day, b.day) else {
        return false;
    };
    if day_a != day_b {
        return false;
    }
    let (Some((s_a, e_a)), Some((s_b, e_b))) = (block_minutes(table, a), block_minutes(table, b))
    else {
        return false;
    };
    !(e_a < s_b || s_a > e_b)
}

/// Every overlapping `(i, j)` pair with `i < j` inside one schedule.
pub fn schedule_conflicts(table: &HourTable, schedule: &[ScheduledBlock]) -> Vec<(usize, usize)> {
    let mut out = Vec::new();
    for i in 0..schedule.len() {
        for j in (i + 1)..schedule.len() {
            if overlaps(table, &schedule[i].block, &schedule[j].block) {
                out.push((i, j));
            }
        }
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ClassStatus {
    Current,
    Next,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Upcoming<'a> {
    pub index: usize,
    pub block: &'a ScheduledBlock,
    pub status: ClassStatus,
    /// `-1` for a running class, otherwise minutes until it starts.
    pub distance_minutes: i64,
}

pub fn current_or_next<'a>(
    table: &HourTable,
    schedule: &'a [ScheduledBlock],
    now: NaiveDateTime,
) -> Option<Upcoming<'a>> {
    scan(table, schedule, now, 0)
}

/// Block currently in session, widening its window by `grace_minutes` on both sides.
/// Grace is clamped to `0..=MINUTES_PER_DAY`.
pub fn active_context_with_grace<'a>(
    table: &HourTable,
    schedule: &'a [ScheduledBlock],
    now: NaiveDateTime,
    grace_minutes: i64,
) -> Option<Upcoming<'a>> {
    scan(table, schedule, now, grace_minutes.clamp(0, MINUTES_PER_DAY))
        .filter(|u| u.status == ClassStatus::Current)
}

fn scan<'a>(
    table: &HourTable,
    schedule: &'a [ScheduledBlock],
    now: NaiveDateTime,
    grace: i64,
) -> Option<Upcoming<'a>> {
    let today = now.weekday().num_days_from_monday() as i64;
    let now_minutes = (now.hour() * 60 + now.minute()) as i64;

    let mut best: Option<Upcoming<'a>> = None;
    for (index, sb) in schedule.iter().enumerate() {
        let Some(w) = block_window(table, &sb.block) else {
            continue;
        };
        let day_delta = (w.day.index() - today).rem_euclid(DAYS_PER_WEEK);

        let distance = if day_delta == 0 {
            if now_minutes >= w.start - grace && now_minutes < w.end + grace {
                return Some(Upcoming {
                    index,
                    block: sb,
                    status: ClassStatus::Current,
                    distance_minutes: -1,
                });
            }
            if now_minutes < w.start {
                w.start - now_minutes
            } else {
                DAYS_PER_WEEK * MINUTES_PER_DAY + (w.start - now_minutes)
            }
        } else {
            day_delta * MINUTES_PER_DAY + (w.start - now_minutes)
        };

        if best
            .as_ref()
            .map(|b| distance < b.distance_minutes)
            .unwrap_or(true)
        {
            best = Some(Upcoming {
                index,
                block: sb,
                status: ClassStatus::Next,
                distance_minutes: distance,
            });
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, hh: u32, mm: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .and_then(|x| x.and_hms_opt(hh, mm, 0))
            .expect("valid datetime")
    }

    fn sb(day: Day, start: u32, dur: u32) -> ScheduledBlock {
        ScheduledBlock {
            course_id: "MA101".into(),
            section_id: "A".into(),
            block: ScheduleBlock::new(day, start, dur),
        }
    }

    // 2026-10-19 is a Monday.
    const MON: (i32, u32, u32) = (2026, 10, 19);

    #[test]
    fn time_range_formats_and_rejects_bad_indices() {
        let t = HourTable::standard();
        assert_eq!(time_range(t, 3, 4).as_deref(), Some("08:50–10:30"));
        assert_eq!(time_range(t, 4, 3), None);
        assert_eq!(time_range(t, 3, 99), None);
        assert_eq!(time_range(t, 0, 1), None);
    }

    #[test]
    fn touching_blocks_do_not_overlap() {
        let t = HourTable::standard();
        let a = ScheduleBlock::new(Day::Monday, 1, 2);
        let b = ScheduleBlock::new(Day::Monday, 3, 2);
        assert!(!overlaps(t, &a, &b));
        assert!(!overlaps(t, &b, &a));

        let c = ScheduleBlock::new(Day::Monday, 2, 2);
        assert!(overlaps(t, &a, &c));
        assert!(overlaps(t, &c, &b));
    }

    #[test]
    fn different_days_or_unknown_day_never_overlap() {
        let t = HourTable::standard();
        let a = ScheduleBlock::new(Day::Monday, 1, 3);
        let b = ScheduleBlock::new(Day::Tuesday, 1, 3);
        assert!(!overlaps(t, &a, &b));
        let mut unknown = a.clone();
        unknown.day = None;
        assert!(!overlaps(t, &a, &unknown));
        let mut past_table = a.clone();
        past_table.start_hour = 17;
        assert!(!overlaps(t, &past_table, &ScheduleBlock::new(Day::Monday, 17, 1)));
    }

    #[test]
    fn day_parse_is_lenient_and_never_fails_hard() {
        assert_eq!(Day::parse("Monday"), Some(Day::Monday));
        assert_eq!(Day::parse("LUNES"), Some(Day::Monday));
        assert_eq!(Day::parse("sáb"), Some(Day::Saturday));
        assert_eq!(Day::parse("sunday"), None);
        assert_eq!(Day::parse(""), None);
        let b: ScheduleBlock =
            serde_json::from_value(serde_json::json!({"day": "funday", "startHour": 1, "duration": 1}))
                .expect("decode");
        assert_eq!(b.day, None);
    }

    #[test]
    fn current_when_inside_block_window() {
        let t = HourTable::standard();
        let s = vec![sb(Day::Monday, 3, 1)];
        let u = current_or_next(t, &s, at(MON.0, MON.1, MON.2, 9, 0)).expect("some");
        assert_eq!(u.status, ClassStatus::Current);
        assert_eq!(u.distance_minutes, -1);
    }

    #[test]
    fn next_later_today_and_next_week() {
        let t = HourTable::standard();
        let s = vec![sb(Day::Monday, 3, 1)];
        let early = current_or_next(t, &s, at(MON.0, MON.1, MON.2, 7, 0)).expect("some");
        assert_eq!(early.status, ClassStatus::Next);
        assert_eq!(early.distance_minutes, 110);

        // Window fully elapsed today -> same slot next week.
        let late = current_or_next(t, &s, at(MON.0, MON.1, MON.2, 12, 0)).expect("some");
        assert_eq!(late.status, ClassStatus::Next);
        assert_eq!(late.distance_minutes, 7 * 1440 + (530 - 720));

        let tue = current_or_next(t, &s, at(MON.0, MON.1, MON.2 + 1, 9, 0)).expect("some");
        assert_eq!(tue.status, ClassStatus::Next);
        assert_eq!(tue.distance_minutes, 6 * 1440 - 10);
    }

    #[test]
    fn picks_nearest_and_skips_unresolvable_blocks() {
        let t = HourTable::standard();
        let s = vec![
            sb(Day::Friday, 1, 2),
            sb(Day::Wednesday, 40, 1),
            sb(Day::Wednesday, 5, 2),
        ];
        let u = current_or_next(t, &s, at(MON.0, MON.1, MON.2, 10, 0)).expect("some");
        assert_eq!(u.index, 2);
        assert!(current_or_next(t, &[], at(MON.0, MON.1, MON.2, 10, 0)).is_none());
        assert!(current_or_next(t, &s[1..2], at(MON.0, MON.1, MON.2, 10, 0)).is_none());
    }

    #[test]
    fn simultaneous_current_blocks_resolve_to_first() {
        let t = HourTable::standard();
        let s = vec![sb(Day::Monday, 2, 3), sb(Day::Monday, 3, 1)];
        let u = current_or_next(t, &s, at(MON.0, MON.1, MON.2, 9, 0)).expect("some");
        assert_eq!(u.index, 0);
    }

    #[test]
    fn sunday_looks_ahead_to_monday() {
        let t = HourTable::standard();
        let s = vec![sb(Day::Monday, 1, 1)];
        let u = current_or_next(t, &s, at(2026, 10, 18, 20, 0)).expect("some");
        assert_eq!(u.status, ClassStatus::Next);
        assert_eq!(u.distance_minutes, 1440 + 430 - 1200);
    }

    #[test]
    fn grace_widens_current_window() {
        let t = HourTable::standard();
        let s = vec![sb(Day::Monday, 3, 1)];
        let early = at(MON.0, MON.1, MON.2, 8, 42);
        assert!(active_context_with_grace(t, &s, early, 0).is_none());
        assert!(active_context_with_grace(t, &s, early, 10).is_some());
        let late = at(MON.0, MON.1, MON.2, 9, 49);
        assert!(active_context_with_grace(t, &s, late, 10).is_some());
        let too_late = at(MON.0, MON.1, MON.2, 9, 50);
        assert!(active_context_with_grace(t, &s, too_late, 10).is_none());
    }

    #[test]
    fn huge_grace_is_capped_at_one_day() {
        let t = HourTable::standard();
        let s = vec![sb(Day::Monday, 3, 1)];
        let nine = at(MON.0, MON.1, MON.2, 9, 0);
        let u = active_context_with_grace(t, &s, nine, i64::MAX).expect("current");
        assert_eq!(u.status, ClassStatus::Current);
        assert!(active_context_with_grace(t, &s, nine, i64::MIN).is_some());
        // Other weekdays are never current, however wide the grace.
        let tue = at(MON.0, MON.1, MON.2 + 1, 9, 0);
        assert!(active_context_with_grace(t, &s, tue, i64::MAX).is_none());
    }

    #[test]
    fn conflicts_lists_pairs_in_order() {
        let t = HourTable::standard();
        let s = vec![
            sb(Day::Monday, 1, 2),
            sb(Day::Monday, 2, 1),
            sb(Day::Monday, 3, 1),
            sb(Day::Tuesday, 1, 2),
        ];
        assert_eq!(schedule_conflicts(t, &s), vec![(0, 1)]);
    }

    #[test]
    fn linked_room_labels() {
        let r: Linked<Room> = serde_json::from_value(serde_json::json!({
            "kind": "embedded",
            "record": {"id": "r1", "name": "204", "building": "B"}
        }))
        .expect("decode");
        assert_eq!(r.label(), "B-204");
        let r: Linked<Room> =
            serde_json::from_value(serde_json::json!({"kind": "ref", "id": "r9"})).expect("decode");
        assert_eq!(r.label(), "r9");
    }
}
