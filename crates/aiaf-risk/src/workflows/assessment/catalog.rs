use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::domain::{
    FocusQuestion, FocusQuestionId, Question, QuestionId, Response, RiskId, TagDefinition,
    TagId, TreatmentEntry,
};

/// Raised when a source sheet cannot be turned into the typed model.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MalformedDataError {
    #[error("{sheet}: line {line} is missing required field '{field}'")]
    MissingField {
        sheet: &'static str,
        line: u64,
        field: &'static str,
    },
    #[error("{sheet}: line {line} field '{field}' must be an integer (found '{value}')")]
    InvalidInteger {
        sheet: &'static str,
        line: u64,
        field: &'static str,
        value: String,
    },
    #[error("{sheet}: line {line} field '{field}' must be a number (found '{value}')")]
    InvalidNumber {
        sheet: &'static str,
        line: u64,
        field: &'static str,
        value: String,
    },
    #[error("{sheet}: header row is missing column '{column}'")]
    MissingColumn {
        sheet: &'static str,
        column: &'static str,
    },
    #[error("{sheet}: no data rows")]
    EmptySheet { sheet: &'static str },
    #[error("question {question_id} has conflicting text on line {line}")]
    ConflictingQuestionText { question_id: QuestionId, line: u64 },
    #[error("question {question_id} lists response {response_id} twice (line {line})")]
    DuplicateResponse {
        question_id: QuestionId,
        response_id: i64,
        line: u64,
    },
    #[error("{sheet}: identifier {id} appears more than once (line {line})")]
    DuplicateIdentifier {
        sheet: &'static str,
        id: String,
        line: u64,
    },
}

/// One typed system-context row after merged cells have been forward-filled.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextRow {
    pub line: u64,
    pub question_id: QuestionId,
    pub question_text: String,
    pub response: Response,
}

/// Context questions grouped once at load time, keyed for direct lookup.
#[derive(Debug, Clone, Default)]
pub struct QuestionCatalog {
    questions: BTreeMap<QuestionId, Question>,
}

impl QuestionCatalog {
    pub fn from_rows<I>(rows: I) -> Result<Self, MalformedDataError>
    where
        I: IntoIterator<Item = ContextRow>,
    {
        let mut questions: BTreeMap<QuestionId, Question> = BTreeMap::new();

        for row in rows {
            let question = questions.entry(row.question_id).or_insert_with(|| Question {
                question_id: row.question_id,
                text: row.question_text.clone(),
                responses: Vec::new(),
            });

            if question.text != row.question_text {
                return Err(MalformedDataError::ConflictingQuestionText {
                    question_id: row.question_id,
                    line: row.line,
                });
            }

            if question.response(row.response.response_id).is_some() {
                return Err(MalformedDataError::DuplicateResponse {
                    question_id: row.question_id,
                    response_id: row.response.response_id.0,
                    line: row.line,
                });
            }

            question.responses.push(row.response);
        }

        if questions.is_empty() {
            return Err(MalformedDataError::EmptySheet {
                sheet: "System Context Assessment",
            });
        }

        Ok(Self { questions })
    }

    /// Every question, ascending by id, responses in sheet order.
    pub fn questions_in_ascending_id_order(&self) -> impl Iterator<Item = &Question> {
        self.questions.values()
    }

    pub fn question(&self, question_id: QuestionId) -> Option<&Question> {
        self.questions.get(&question_id)
    }

    pub fn question_ids(&self) -> impl Iterator<Item = QuestionId> + '_ {
        self.questions.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

/// Flat pool of follow-up questions, held in identifier order.
#[derive(Debug, Clone, Default)]
pub struct FocusQuestionPool {
    questions: Vec<FocusQuestion>,
}

impl FocusQuestionPool {
    /// Rejects duplicate identifiers. Each item pairs a question with its sheet line.
    pub fn from_questions<I>(rows: I) -> Result<Self, MalformedDataError>
    where
        I: IntoIterator<Item = (u64, FocusQuestion)>,
    {
        let mut seen: BTreeSet<FocusQuestionId> = BTreeSet::new();
        let mut questions = Vec::new();

        for (line, question) in rows {
            if !seen.insert(question.focus_question_id.clone()) {
                return Err(MalformedDataError::DuplicateIdentifier {
                    sheet: "Focus Question",
                    id: question.focus_question_id.to_string(),
                    line,
                });
            }
            questions.push(question);
        }

        questions.sort_by(|a, b| a.focus_question_id.cmp(&b.focus_question_id));
        Ok(Self { questions })
    }

    pub fn questions(&self) -> &[FocusQuestion] {
        &self.questions
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

/// Risk descriptions and suggested treatments, in directory order.
#[derive(Debug, Clone, Default)]
pub struct TreatmentDirectory {
    entries: Vec<TreatmentEntry>,
}

impl TreatmentDirectory {
    pub fn new(entries: Vec<TreatmentEntry>) -> Self {
        Self { entries }
    }

    /// Sample directory used when the workbook has no treatment sheet.
    pub fn builtin() -> Self {
        const ROWS: &[(&str, &str, &str, &str)] = &[
            (
                "R001",
                "Data is not encrypted",
                "T001",
                "Implement encryption-at-rest and in-transit",
            ),
            (
                "R002",
                "Facial recognition used without consent",
                "T002",
                "Apply biometric data handling policy & obtain user consent",
            ),
            (
                "R003",
                "No human review of AI outputs",
                "T003",
                "Introduce manual review checkpoint",
            ),
            (
                "R005",
                "Public results not validated",
                "T005",
                "Set up pre-release validation/testing steps",
            ),
        ];

        let entries = ROWS
            .iter()
            .filter_map(|(risk, description, tag, suggestion)| {
                Some(TreatmentEntry {
                    risk_id: RiskId::parse(risk)?,
                    risk_description: (*description).to_string(),
                    tag_id: TagId::parse(tag)?,
                    treatment_suggestion: (*suggestion).to_string(),
                })
            })
            .collect();

        Self { entries }
    }

    pub fn entries(&self) -> &[TreatmentEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct TagTaxonomy {
    tags: HashMap<TagId, TagDefinition>,
}

impl TagTaxonomy {
    pub fn new<I>(definitions: I) -> Self
    where
        I: IntoIterator<Item = TagDefinition>,
    {
        let tags = definitions
            .into_iter()
            .map(|definition| (definition.tag_id.clone(), definition))
            .collect();
        Self { tags }
    }

    pub fn get(&self, tag_id: &TagId) -> Option<&TagDefinition> {
        self.tags.get(tag_id)
    }

    /// Taxonomy label when known, otherwise the raw identifier.
    pub fn label_for(&self, tag_id: &TagId) -> String {
        self.get(tag_id)
            .map(|definition| definition.label.clone())
            .unwrap_or_else(|| tag_id.to_string())
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

/// Everything loaded from the workbook. Immutable after load and shared across sessions.
#[derive(Debug, Clone, Default)]
pub struct AssessmentDataset {
    pub catalog: QuestionCatalog,
    pub focus_pool: FocusQuestionPool,
    pub treatments: TreatmentDirectory,
    pub tags: TagTaxonomy,
}
