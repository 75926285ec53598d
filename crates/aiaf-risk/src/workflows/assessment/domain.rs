use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Opaque identifier shared by tags, risks and focus questions.
///
/// Spreadsheet cells hand these over as text, numbers or floats depending on how the
/// sheet was edited, so the value is normalized once on construction: surrounding
/// whitespace trimmed, ASCII letters upper-cased, and a trailing `.0` dropped from an
/// all-digit value. Two identifiers are equal when their normalized forms are.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RiskKey(String);

impl RiskKey {
    /// Returns `None` for blank input; absence is never an identifier.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }

        let integral = trimmed
            .strip_suffix(".0")
            .filter(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
            .unwrap_or(trimmed);

        Some(Self(integral.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RiskKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for RiskKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for RiskKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        RiskKey::parse(&raw).ok_or_else(|| serde::de::Error::custom("identifier must not be blank"))
    }
}

/// Tags link responses and focus questions to the treatment directory.
pub type TagId = RiskKey;
pub type RiskId = RiskKey;
pub type FocusQuestionId = RiskKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionId(pub i64);

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Q{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResponseId(pub i64);

/// One selectable answer to a context question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub response_id: ResponseId,
    pub title: String,
    pub description: String,
    pub modifiers: Vec<f64>,
    pub tag_id: TagId,
}

impl Response {
    /// Contribution to the risk score; zero when the sheet left the cell blank.
    pub fn modifier(&self) -> f64 {
        self.modifiers.iter().sum()
    }
}

/// Context question with its ordered responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub question_id: QuestionId,
    pub text: String,
    pub responses: Vec<Response>,
}

impl Question {
    pub fn response(&self, response_id: ResponseId) -> Option<&Response> {
        self.responses
            .iter()
            .find(|response| response.response_id == response_id)
    }
}

/// Optional yes/no follow-up drawn after scoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusQuestion {
    pub focus_question_id: FocusQuestionId,
    pub text: String,
    pub risk_id: Option<RiskId>,
    pub tag_id: Option<TagId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreatmentEntry {
    pub risk_id: RiskId,
    pub risk_description: String,
    pub tag_id: TagId,
    pub treatment_suggestion: String,
}

/// Taxonomy row giving a tag a readable label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagDefinition {
    pub tag_id: TagId,
    pub label: String,
    pub description: String,
}

/// The response a user picked for one context question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub question_id: QuestionId,
    pub response_id: ResponseId,
    pub modifier: f64,
    pub tag_id: TagId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Answer {
    #[serde(alias = "Yes", alias = "YES")]
    Yes,
    #[serde(alias = "No", alias = "NO")]
    No,
}

impl Answer {
    pub const fn label(self) -> &'static str {
        match self {
            Answer::Yes => "Yes",
            Answer::No => "No",
        }
    }

    /// Accepts the spellings a form or JSON payload is likely to use.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "yes" | "y" | "true" => Some(Answer::Yes),
            "no" | "n" | "false" => Some(Answer::No),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusAnswer {
    pub focus_question_id: FocusQuestionId,
    pub answer: Answer,
    pub risk_id: Option<RiskId>,
    pub tag_id: Option<TagId>,
}

impl FocusAnswer {
    pub fn is_failed(&self) -> bool {
        self.answer == Answer::No
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    Low,
    Medium,
    High,
    VeryHigh,
}

impl RiskTier {
    pub const fn label(self) -> &'static str {
        match self {
            RiskTier::Low => "Low",
            RiskTier::Medium => "Medium",
            RiskTier::High => "High",
            RiskTier::VeryHigh => "Very High",
        }
    }
}

/// Depth of follow-up questioning a tier calls for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FocusCategory {
    Baseline,
    Additional,
    Sme,
}

impl FocusCategory {
    pub const fn label(self) -> &'static str {
        match self {
            FocusCategory::Baseline => "Baseline",
            FocusCategory::Additional => "Additional",
            FocusCategory::Sme => "SME",
        }
    }
}

/// Workflow stages in their only permitted order.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentStage {
    #[default]
    Intake,
    ContextQuestionsOpen,
    ResponsesSubmitted,
    FocusQuestionsGenerated,
    FocusQuestionsAnswered,
}

impl AssessmentStage {
    pub const fn label(self) -> &'static str {
        match self {
            AssessmentStage::Intake => "intake",
            AssessmentStage::ContextQuestionsOpen => "context_questions_open",
            AssessmentStage::ResponsesSubmitted => "responses_submitted",
            AssessmentStage::FocusQuestionsGenerated => "focus_questions_generated",
            AssessmentStage::FocusQuestionsAnswered => "focus_questions_answered",
        }
    }
}

impl fmt::Display for AssessmentStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
