use chrono::{NaiveTime, Timelike};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Wall-clock window of one academic hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcademicHourSlot {
    pub index: u32,
    #[serde(serialize_with = "ser_hhmm")]
    pub start: NaiveTime,
    #[serde(serialize_with = "ser_hhmm")]
    pub end: NaiveTime,
}

impl AcademicHourSlot {
    pub fn start_minutes(&self) -> i64 {
        minutes_of(self.start)
    }

    pub fn end_minutes(&self) -> i64 {
        minutes_of(self.end)
    }
}

/// Slot definition as it appears in configuration files: `{"start": "07:10", "end": "08:00"}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SlotDef {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HourTableError {
    #[error("hour table is empty")]
    Empty,
    #[error("slot {index}: cannot parse time {value:?}")]
    BadTime { index: u32, value: String },
    #[error("slot {index}: start must be before end")]
    EmptyWindow { index: u32 },
    #[error("slot {index} starts before slot {prev} ends")]
    Overlapping { index: u32, prev: u32 },
}

/// Ordinal hour index -> wall-clock window. Indices start at 1 and are contiguous,
/// so lookup is a bounds check plus a vector index.
#[derive(Debug, Clone, PartialEq)]
pub struct HourTable {
    slots: Vec<AcademicHourSlot>,
}

const DEFAULT_SLOTS: [(&str, &str); 17] = [
    ("07:10", "08:00"),
    ("08:00", "08:50"),
    ("08:50", "09:40"),
    ("09:40", "10:30"),
    ("10:40", "11:30"),
    ("11:30", "12:20"),
    ("12:20", "13:10"),
    ("13:10", "14:00"),
    ("14:00", "14:50"),
    ("14:50", "15:40"),
    ("15:50", "16:40"),
    ("16:40", "17:30"),
    ("17:40", "18:30"),
    ("18:30", "19:20"),
    ("19:20", "20:10"),
    ("20:10", "21:00"),
    ("21:00", "21:50"),
];

static DEFAULT_TABLE: Lazy<HourTable> = Lazy::new(|| {
    let defs: Vec<SlotDef> = DEFAULT_SLOTS
        .iter()
        .map(|(s, e)| SlotDef {
            start: (*s).to_string(),
            end: (*e).to_string(),
        })
        .collect();
    HourTable::from_defs(&defs).unwrap_or_else(|_| HourTable { slots: Vec::new() })
});

impl HourTable {
    /// Campus timetable used when no configuration overrides it.
    pub fn standard() -> &'static HourTable {
        &DEFAULT_TABLE
    }

    pub fn from_defs(defs: &[SlotDef]) -> Result<Self, HourTableError> {
        if defs.is_empty() {
            return Err(HourTableError::Empty);
        }
        let mut slots: Vec<AcademicHourSlot> = Vec::with_capacity(defs.len());
        for (i, d) in defs.iter().enumerate() {
            let index = (i + 1) as u32;
            let start = parse_hhmm(&d.start).ok_or_else(|| HourTableError::BadTime {
                index,
                value: d.start.clone(),
            })?;
            let end = parse_hhmm(&d.end).ok_or_else(|| HourTableError::BadTime {
                index,
                value: d.end.clone(),
            })?;
            if start >= end {
                return Err(HourTableError::EmptyWindow { index });
            }
            if let Some(prev) = slots.last() {
                if prev.end > start {
                    return Err(HourTableError::Overlapping {
                        index,
                        prev: prev.index,
                    });
                }
            }
            slots.push(AcademicHourSlot { index, start, end });
        }
        Ok(Self { slots })
    }

    pub fn resolve(&self, index: u32) -> Option<&AcademicHourSlot> {
        if index == 0 {
            return None;
        }
        self.slots.get((index - 1) as usize)
    }

    /// `(start, end)` in minutes since midnight.
    pub fn minutes(&self, index: u32) -> Option<(i64, i64)> {
        self.resolve(index)
            .map(|s| (s.start_minutes(), s.end_minutes()))
    }

    pub fn slots(&self) -> impl Iterator<Item = &AcademicHourSlot> {
        self.slots.iter()
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }
}

impl Default for HourTable {
    fn default() -> Self {
        HourTable::standard().clone()
    }
}

pub fn minutes_of(t: NaiveTime) -> i64 {
    (t.hour() * 60 + t.minute()) as i64
}

pub fn parse_hhmm(raw: &str) -> Option<NaiveTime> {
    let t = raw.trim();
    NaiveTime::parse_from_str(t, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(t, "%H:%M:%S"))
        .ok()
}

pub fn format_hhmm(t: NaiveTime) -> String {
    t.format("%H:%M").to_string()
}

fn ser_hhmm<S: serde::Serializer>(t: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&format_hhmm(*t))
}
