use serde::{Deserialize, Serialize};

pub const SCORE_MIN: f64 = 0.0;
pub const SCORE_MAX: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Partial {
    P1,
    P2,
    P3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreKind {
    Continuous,
    Exam,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PartialWeights {
    pub continuous: f64,
    pub exam: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FinalWeights {
    #[serde(rename = "P1")]
    pub p1: f64,
    #[serde(rename = "P2")]
    pub p2: f64,
    #[serde(rename = "P3")]
    pub p3: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubstitutiveRule {
    #[serde(rename = "minExamOfP1P2")]
    MinExamOfP1P2,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationScheme {
    #[serde(rename = "P1")]
    pub p1: PartialWeights,
    #[serde(rename = "P2")]
    pub p2: PartialWeights,
    #[serde(rename = "P3")]
    pub p3: PartialWeights,
    pub final_weights: FinalWeights,
    #[serde(default)]
    pub substitutive_replaces: Option<SubstitutiveRule>,
}

impl EvaluationScheme {
    pub fn weights(&self, p: Partial) -> PartialWeights {
        match p {
            Partial::P1 => self.p1,
            Partial::P2 => self.p2,
            Partial::P3 => self.p3,
        }
    }
}

/// `None` means "not entered yet": zero for arithmetic, `null` on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialScore {
    #[serde(default)]
    pub continuous: Option<f64>,
    #[serde(default)]
    pub exam: Option<f64>,
}

impl PartialScore {
    fn is_empty(&self) -> bool {
        self.continuous.is_none() && self.exam.is_none()
    }

    fn set(&mut self, kind: ScoreKind, value: Option<f64>) {
        match kind {
            ScoreKind::Continuous => self.continuous = value,
            ScoreKind::Exam => self.exam = value,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GradeRecord {
    #[serde(rename = "P1", default)]
    pub p1: PartialScore,
    #[serde(rename = "P2", default)]
    pub p2: PartialScore,
    #[serde(rename = "P3", default)]
    pub p3: PartialScore,
    #[serde(default)]
    pub substitutive: Option<f64>,
}

impl GradeRecord {
    pub fn partial(&self, p: Partial) -> &PartialScore {
        match p {
            Partial::P1 => &self.p1,
            Partial::P2 => &self.p2,
            Partial::P3 => &self.p3,
        }
    }

    fn partial_mut(&mut self, p: Partial) -> &mut PartialScore {
        match p {
            Partial::P1 => &mut self.p1,
            Partial::P2 => &mut self.p2,
            Partial::P3 => &mut self.p3,
        }
    }

    /// True once any component has been entered.
    pub fn has_entries(&self) -> bool {
        !(self.p1.is_empty() && self.p2.is_empty() && self.p3.is_empty())
            || self.substitutive.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalGrade {
    #[serde(rename = "P1")]
    pub p1: f64,
    #[serde(rename = "P2")]
    pub p2: f64,
    #[serde(rename = "P3")]
    pub p3: f64,
    pub final_score: f64,
    /// Partial whose exam was replaced by the substitutive score, if any.
    pub substituted: Option<Partial>,
}

pub fn compute_partial_score(partial: &PartialScore, weights: PartialWeights) -> f64 {
    partial.continuous.unwrap_or(0.0) * weights.continuous + partial.exam.unwrap_or(0.0) * weights.exam
}

pub fn compute_final(
    record: Option<&GradeRecord>,
    scheme: Option<&EvaluationScheme>,
) -> Option<FinalGrade> {
    let record = record?;
    let scheme = scheme?;

    let mut p1 = compute_partial_score(&record.p1, scheme.p1);
    let mut p2 = compute_partial_score(&record.p2, scheme.p2);
    let p3 = compute_partial_score(&record.p3, scheme.p3);
    let mut substituted = None;

    if let (Some(SubstitutiveRule::MinExamOfP1P2), Some(sub)) =
        (scheme.substitutive_replaces, record.substitutive)
    {
        let exam1 = record.p1.exam.unwrap_or(0.0);
        let exam2 = record.p2.exam.unwrap_or(0.0);
        if sub > exam1.min(exam2) {
            // Ties replace P1.
            if exam1 <= exam2 {
                let replaced = PartialScore {
                    exam: Some(sub),
                    ..record.p1
                };
                p1 = compute_partial_score(&replaced, scheme.p1);
                substituted = Some(Partial::P1);
            } else {
                let replaced = PartialScore {
                    exam: Some(sub),
                    ..record.p2
                };
                p2 = compute_partial_score(&replaced, scheme.p2);
                substituted = Some(Partial::P2);
            }
        }
    }

    let fw = scheme.final_weights;
    Some(FinalGrade {
        p1,
        p2,
        p3,
        final_score: p1 * fw.p1 + p2 * fw.p2 + p3 * fw.p3,
        substituted,
    })
}

/// Same rounding the registrar prints: `floor(10*x + 0.5) / 10`.
pub fn round_off_1_decimal(x: f64) -> f64 {
    ((10.0 * x) + 0.5).floor() / 10.0
}

pub fn clamp_score(x: f64) -> Option<f64> {
    if x.is_nan() {
        return None;
    }
    Some(x.clamp(SCORE_MIN, SCORE_MAX))
}

/// Normalizes user input for a score cell. Empty or non-numeric input unsets the
/// cell rather than zeroing it.
pub fn normalize_score_input(raw: &serde_json::Value) -> Option<f64> {
    match raw {
        serde_json::Value::Number(n) => n.as_f64().and_then(clamp_score),
        serde_json::Value::String(s) => {
            let t = s.trim();
            if t.is_empty() {
                return None;
            }
            t.parse::<f64>().ok().and_then(clamp_score)
        }
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum GradeMutation {
    Component {
        partial: Partial,
        kind: ScoreKind,
        #[serde(default)]
        value: serde_json::Value,
    },
    Substitutive {
        substitutive: serde_json::Value,
    },
}

/// Returns the amended record; the input is left untouched.
pub fn apply_mutation(record: &GradeRecord, mutation: &GradeMutation) -> GradeRecord {
    let mut next = record.clone();
    match mutation {
        GradeMutation::Component {
            partial,
            kind,
            value,
        } => next.partial_mut(*partial).set(*kind, normalize_score_input(value)),
        GradeMutation::Substitutive { substitutive } => {
            next.substitutive = normalize_score_input(substitutive);
        }
    }
    next
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassGradeSummary {
    pub student_count: usize,
    pub graded_count: usize,
    pub mean_final: f64,
    pub passing_count: usize,
}

/// Records with no entries at all are left out of the mean, like unmarked work.
pub fn class_summary<'a, I>(records: I, scheme: &EvaluationScheme, pass_mark: f64) -> ClassGradeSummary
where
    I: IntoIterator<Item = &'a GradeRecord>,
{
    let mut student_count = 0;
    let mut graded_count = 0;
    let mut passing_count = 0;
    let mut sum = 0.0;
    for r in records {
        student_count += 1;
        if !r.has_entries() {
            continue;
        }
        let Some(f) = compute_final(Some(r), Some(scheme)) else {
            continue;
        };
        graded_count += 1;
        sum += f.final_score;
        if round_off_1_decimal(f.final_score) >= pass_mark {
            passing_count += 1;
        }
    }
    ClassGradeSummary {
        student_count,
        graded_count,
        mean_final: if graded_count > 0 {
            sum / graded_count as f64
        } else {
            0.0
        },
        passing_count,
    }
}
