use crate::hours::HourTable;
use crate::schedule::{overlaps, Labelled, Linked, ScheduledBlock};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentPhase {
    #[default]
    NotStarted,
    Open,
    Processed,
}

impl EnrollmentPhase {
    pub fn advance(self) -> Option<EnrollmentPhase> {
        match self {
            EnrollmentPhase::NotStarted => Some(EnrollmentPhase::Open),
            EnrollmentPhase::Open => Some(EnrollmentPhase::Processed),
            EnrollmentPhase::Processed => None,
        }
    }

    /// One step forward at a time; staying put is allowed.
    pub fn can_transition_to(self, next: EnrollmentPhase) -> bool {
        next == self || self.advance() == Some(next)
    }

    pub fn accepts_preferences(self) -> bool {
        self == EnrollmentPhase::Open
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instructor {
    pub id: String,
    pub name: String,
}

impl Labelled for Instructor {
    fn label(&self) -> String {
        self.name.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabSection {
    pub id: String,
    pub capacity: u32,
    #[serde(default)]
    pub enrolled_count: u32,
    #[serde(default)]
    pub schedule: Vec<ScheduledBlock>,
    #[serde(default)]
    pub teacher: Option<Linked<Instructor>>,
}

impl LabSection {
    pub fn is_full(&self) -> bool {
        self.enrolled_count >= self.capacity
    }
}

/// Ranked section ids, index 0 first. Ids are opaque and never checked against a catalog.
pub type PreferenceList = Vec<String>;

/// Adds `section_id` at the end or removes it. Returns the list unchanged while the
/// phase is not `open` or once a lab has been assigned.
pub fn toggle(
    preferences: &[String],
    section_id: &str,
    phase: EnrollmentPhase,
    assigned_lab_section_id: Option<&str>,
) -> PreferenceList {
    if !phase.accepts_preferences() || assigned_lab_section_id.is_some() {
        return preferences.to_vec();
    }
    if preferences.iter().any(|p| p == section_id) {
        preferences
            .iter()
            .filter(|p| p.as_str() != section_id)
            .cloned()
            .collect()
    } else {
        let mut next = preferences.to_vec();
        next.push(section_id.to_string());
        next
    }
}

pub fn has_conflict(table: &HourTable, lab: &LabSection, fixed: &[ScheduledBlock]) -> bool {
    lab.schedule
        .iter()
        .any(|l| fixed.iter().any(|f| overlaps(table, &l.block, &f.block)))
}

/// 1-based rank of `section_id`.
pub fn preference_order(preferences: &[String], section_id: &str) -> Option<usize> {
    preferences
        .iter()
        .position(|p| p == section_id)
        .map(|i| i + 1)
}

pub fn has_duplicates(preferences: &[String]) -> bool {
    let mut seen = HashSet::new();
    preferences.iter().any(|p| !seen.insert(p.as_str()))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabOption {
    pub section_id: String,
    pub teacher_label: Option<String>,
    pub conflict: bool,
    pub full: bool,
    pub selectable: bool,
    pub rank: Option<usize>,
}

/// Every catalog section, flagged for display. Conflicting sections stay listed
/// but are not selectable; already-ranked ones can always be toggled off.
pub fn lab_options(
    table: &HourTable,
    catalog: &[LabSection],
    fixed: &[ScheduledBlock],
    preferences: &[String],
) -> Vec<LabOption> {
    catalog
        .iter()
        .map(|lab| {
            let conflict = has_conflict(table, lab, fixed);
            let rank = preference_order(preferences, &lab.id);
            LabOption {
                section_id: lab.id.clone(),
                teacher_label: lab.teacher.as_ref().map(|t| t.label()),
                conflict,
                full: lab.is_full(),
                selectable: rank.is_some() || !conflict,
                rank,
            }
        })
        .collect()
}
