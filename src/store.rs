use crate::grades::{apply_mutation, GradeMutation, GradeRecord};
use crate::hours::HourTable;
use crate::labs::{self, EnrollmentPhase, LabSection, PreferenceList};
use crate::schedule::{active_context_with_grace, ScheduledBlock};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TermKey {
    pub course_id: String,
    pub semester_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionKey {
    pub course_id: String,
    pub section_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabEnrollment {
    pub preferences: PreferenceList,
    pub assigned_lab_section_id: Option<String>,
    /// Sequence number of the last accepted submission.
    pub submitted_seq: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceMark {
    Present,
    Late,
    Absent,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceSession {
    pub id: u64,
    pub course_id: String,
    pub section_id: String,
    pub opened_at: NaiveDateTime,
    pub closed_at: Option<NaiveDateTime>,
    pub marks: BTreeMap<String, AttendanceMark>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("enrollment phase cannot move from {from:?} to {to:?}")]
    PhaseBackwards {
        from: EnrollmentPhase,
        to: EnrollmentPhase,
    },
    #[error("enrollment phase cannot skip from {from:?} to {to:?}")]
    PhaseSkipped {
        from: EnrollmentPhase,
        to: EnrollmentPhase,
    },
    #[error("operation needs phase {expected:?}, current phase is {actual:?}")]
    WrongPhase {
        expected: EnrollmentPhase,
        actual: EnrollmentPhase,
    },
    #[error("lab section {0} is already assigned")]
    AlreadyAssigned(String),
    #[error("section {0} conflicts with the student's schedule")]
    Conflict(String),
    #[error("duplicate section id in preferences: {0}")]
    DuplicatePreference(String),
    #[error("no class of this section is in session")]
    NotInSession,
    #[error("attendance session {0} is already open for this section")]
    SessionOpen(u64),
    #[error("attendance session {0} not found")]
    SessionNotFound(u64),
    #[error("attendance session {0} is closed")]
    SessionClosed(u64),
}

impl StoreError {
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::PhaseBackwards { .. }
            | StoreError::PhaseSkipped { .. }
            | StoreError::WrongPhase { .. } => "phase_closed",
            StoreError::AlreadyAssigned(_) => "phase_closed",
            StoreError::Conflict(_) => "conflict",
            StoreError::DuplicatePreference(_) => "bad_params",
            StoreError::NotInSession => "not_in_session",
            StoreError::SessionOpen(_) => "session_open",
            StoreError::SessionNotFound(_) => "not_found",
            StoreError::SessionClosed(_) => "session_closed",
        }
    }
}

/// Host-side state the pure engine functions read from and write back to.
/// Single writer: the sidecar processes one request at a time.
#[derive(Debug, Default)]
pub struct TermStore {
    phases: HashMap<TermKey, EnrollmentPhase>,
    enrollments: HashMap<(TermKey, String), LabEnrollment>,
    grades: HashMap<(SectionKey, String), GradeRecord>,
    sessions: BTreeMap<u64, AttendanceSession>,
    open_sessions: HashMap<SectionKey, u64>,
    next_seq: u64,
}

impl TermStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    pub fn phase(&self, key: &TermKey) -> EnrollmentPhase {
        self.phases.get(key).copied().unwrap_or_default()
    }

    pub fn set_phase(
        &mut self,
        key: &TermKey,
        next: EnrollmentPhase,
    ) -> Result<EnrollmentPhase, StoreError> {
        let current = self.phase(key);
        if !current.can_transition_to(next) {
            let err = if next < current {
                StoreError::PhaseBackwards {
                    from: current,
                    to: next,
                }
            } else {
                StoreError::PhaseSkipped {
                    from: current,
                    to: next,
                }
            };
            return Err(err);
        }
        if current != next {
            tracing::info!(course = %key.course_id, semester = %key.semester_id, ?current, ?next, "lab enrollment phase changed");
        }
        self.phases.insert(key.clone(), next);
        Ok(next)
    }

    pub fn enrollment(&self, key: &TermKey, student_id: &str) -> LabEnrollment {
        self.enrollments
            .get(&(key.clone(), student_id.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    fn check_editable(&self, key: &TermKey, current: &LabEnrollment) -> Result<(), StoreError> {
        let phase = self.phase(key);
        if !phase.accepts_preferences() {
            return Err(StoreError::WrongPhase {
                expected: EnrollmentPhase::Open,
                actual: phase,
            });
        }
        if let Some(assigned) = &current.assigned_lab_section_id {
            return Err(StoreError::AlreadyAssigned(assigned.clone()));
        }
        Ok(())
    }

    /// Gatekeeper around `labs::toggle`: adding a section that clashes with
    /// `fixed` is refused. Removal is always allowed while editable.
    pub fn toggle_preference(
        &mut self,
        table: &HourTable,
        key: &TermKey,
        student_id: &str,
        section_id: &str,
        section: Option<&LabSection>,
        fixed: &[ScheduledBlock],
    ) -> Result<PreferenceList, StoreError> {
        let mut current = self.enrollment(key, student_id);
        self.check_editable(key, &current)?;

        let adding = labs::preference_order(&current.preferences, section_id).is_none();
        if adding {
            if let Some(lab) = section {
                if labs::has_conflict(table, lab, fixed) {
                    tracing::warn!(student = student_id, section = section_id, "refused conflicting lab preference");
                    return Err(StoreError::Conflict(section_id.to_string()));
                }
            }
        }

        current.preferences = labs::toggle(
            &current.preferences,
            section_id,
            self.phase(key),
            current.assigned_lab_section_id.as_deref(),
        );
        let out = current.preferences.clone();
        self.enrollments
            .insert((key.clone(), student_id.to_string()), current);
        Ok(out)
    }

    /// Replaces the whole list. Ids found in `catalog` must not clash with `fixed`;
    /// ids missing from it are taken as-is.
    pub fn submit_preferences(
        &mut self,
        table: &HourTable,
        key: &TermKey,
        student_id: &str,
        preferences: PreferenceList,
        catalog: &[LabSection],
        fixed: &[ScheduledBlock],
    ) -> Result<u64, StoreError> {
        let mut current = self.enrollment(key, student_id);
        self.check_editable(key, &current)?;
        if let Some(lab) = catalog
            .iter()
            .find(|lab| preferences.contains(&lab.id) && labs::has_conflict(table, lab, fixed))
        {
            tracing::warn!(student = student_id, section = %lab.id, "refused submission with conflicting lab");
            return Err(StoreError::Conflict(lab.id.clone()));
        }
        if labs::has_duplicates(&preferences) {
            let mut seen = std::collections::HashSet::new();
            let dup = preferences
                .iter()
                .find(|p| !seen.insert(p.as_str()))
                .cloned()
                .unwrap_or_default();
            return Err(StoreError::DuplicatePreference(dup));
        }
        let seq = self.next_id();
        current.preferences = preferences;
        current.submitted_seq = Some(seq);
        self.enrollments
            .insert((key.clone(), student_id.to_string()), current);
        Ok(seq)
    }

    /// Records the outcome of the external allocation pass.
    pub fn assign_lab(
        &mut self,
        key: &TermKey,
        student_id: &str,
        section_id: &str,
    ) -> Result<LabEnrollment, StoreError> {
        let phase = self.phase(key);
        if phase != EnrollmentPhase::Processed {
            return Err(StoreError::WrongPhase {
                expected: EnrollmentPhase::Processed,
                actual: phase,
            });
        }
        let entry = self
            .enrollments
            .entry((key.clone(), student_id.to_string()))
            .or_default();
        entry.assigned_lab_section_id = Some(section_id.to_string());
        Ok(entry.clone())
    }

    pub fn grade(&self, key: &SectionKey, student_id: &str) -> GradeRecord {
        self.grades
            .get(&(key.clone(), student_id.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    pub fn update_grade(
        &mut self,
        key: &SectionKey,
        student_id: &str,
        mutation: &GradeMutation,
    ) -> GradeRecord {
        let next = apply_mutation(&self.grade(key, student_id), mutation);
        self.grades
            .insert((key.clone(), student_id.to_string()), next.clone());
        next
    }

    /// Grade records of one section ordered by student id.
    pub fn section_grades(&self, key: &SectionKey) -> Vec<(String, GradeRecord)> {
        let mut out: Vec<(String, GradeRecord)> = self
            .grades
            .iter()
            .filter(|((k, _), _)| k == key)
            .map(|((_, student), r)| (student.clone(), r.clone()))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    /// Only blocks tagged with exactly this course and section can open it.
    pub fn open_attendance(
        &mut self,
        table: &HourTable,
        key: &SectionKey,
        schedule: &[ScheduledBlock],
        now: NaiveDateTime,
        grace_minutes: i64,
    ) -> Result<AttendanceSession, StoreError> {
        if let Some(id) = self.open_sessions.get(key) {
            return Err(StoreError::SessionOpen(*id));
        }
        let own: Vec<ScheduledBlock> = schedule
            .iter()
            .filter(|b| b.course_id == key.course_id && b.section_id == key.section_id)
            .cloned()
            .collect();
        if active_context_with_grace(table, &own, now, grace_minutes).is_none() {
            return Err(StoreError::NotInSession);
        }
        let id = self.next_id();
        let session = AttendanceSession {
            id,
            course_id: key.course_id.clone(),
            section_id: key.section_id.clone(),
            opened_at: now,
            closed_at: None,
            marks: BTreeMap::new(),
        };
        self.sessions.insert(id, session.clone());
        self.open_sessions.insert(key.clone(), id);
        tracing::info!(session = id, course = %key.course_id, section = %key.section_id, "attendance session opened");
        Ok(session)
    }

    fn open_session_mut(&mut self, id: u64) -> Result<&mut AttendanceSession, StoreError> {
        let session = self
            .sessions
            .get_mut(&id)
            .ok_or(StoreError::SessionNotFound(id))?;
        if session.closed_at.is_some() {
            return Err(StoreError::SessionClosed(id));
        }
        Ok(session)
    }

    pub fn mark_attendance(
        &mut self,
        id: u64,
        student_id: &str,
        mark: AttendanceMark,
    ) -> Result<AttendanceSession, StoreError> {
        let session = self.open_session_mut(id)?;
        session.marks.insert(student_id.to_string(), mark);
        Ok(session.clone())
    }

    pub fn close_attendance(
        &mut self,
        id: u64,
        now: NaiveDateTime,
    ) -> Result<AttendanceSession, StoreError> {
        let session = self.open_session_mut(id)?;
        session.closed_at = Some(now);
        let key = SectionKey {
            course_id: session.course_id.clone(),
            section_id: session.section_id.clone(),
        };
        let out = session.clone();
        self.open_sessions.remove(&key);
        tracing::info!(session = id, "attendance session closed");
        Ok(out)
    }

    /// Sessions of one section in opening order.
    pub fn sessions(&self, key: &SectionKey) -> Vec<&AttendanceSession> {
        self.sessions
            .values()
            .filter(|s| s.course_id == key.course_id && s.section_id == key.section_id)
            .collect()
    }
}
