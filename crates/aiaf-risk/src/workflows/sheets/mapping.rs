use super::normalizer::normalize_header;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Workbook sheets the importer understands, one CSV export each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SheetKind {
    SystemContext,
    FocusQuestion,
    Treatment,
    Tags,
}

impl SheetKind {
    pub const fn label(self) -> &'static str {
        match self {
            SheetKind::SystemContext => "System Context Assessment",
            SheetKind::FocusQuestion => "Focus Question",
            SheetKind::Treatment => "Treatment",
            SheetKind::Tags => "Tags Taxonomy",
        }
    }

    pub const fn file_name(self) -> &'static str {
        match self {
            SheetKind::SystemContext => "system_context.csv",
            SheetKind::FocusQuestion => "focus_questions.csv",
            SheetKind::Treatment => "treatments.csv",
            SheetKind::Tags => "tags.csv",
        }
    }

    /// Title rows sitting above the header row.
    pub const fn header_offset(self) -> usize {
        match self {
            SheetKind::SystemContext => 1,
            SheetKind::FocusQuestion | SheetKind::Treatment | SheetKind::Tags => 2,
        }
    }

    /// Whether loading fails when the export is absent.
    pub const fn required(self) -> bool {
        matches!(self, SheetKind::SystemContext | SheetKind::FocusQuestion)
    }

    /// Canonical columns that must appear in the header row.
    pub const fn required_columns(self) -> &'static [&'static str] {
        match self {
            SheetKind::SystemContext => &[
                "question_id",
                "question",
                "response_id",
                "response_title",
                "tag_id",
            ],
            SheetKind::FocusQuestion => &["focus_question_id", "question_text"],
            SheetKind::Treatment => &[
                "risk_id",
                "risk_description",
                "tag_id",
                "treatment_suggestion",
            ],
            SheetKind::Tags => &["tag_id", "tag"],
        }
    }
}

static COLUMN_MAP: OnceLock<HashMap<(SheetKind, String), &'static str>> = OnceLock::new();

/// Canonical name for a header cell, or the normalized header when the column is not
/// one the importer reads.
pub(crate) fn canonical_column(kind: SheetKind, header: &str) -> String {
    let normalized = normalize_header(header);
    column_map()
        .get(&(kind, normalized.clone()))
        .map(|canonical| (*canonical).to_string())
        .unwrap_or(normalized)
}

fn column_map() -> &'static HashMap<(SheetKind, String), &'static str> {
    COLUMN_MAP.get_or_init(|| {
        const COLUMNS: &[(SheetKind, &str, &str)] = &[
            (SheetKind::SystemContext, "QuestionID", "question_id"),
            (SheetKind::SystemContext, "Question", "question"),
            (SheetKind::SystemContext, "ResponseID", "response_id"),
            (SheetKind::SystemContext, "ResponseTitle", "response_title"),
            (SheetKind::SystemContext, "ResponseDescription", "response_description"),
            (SheetKind::SystemContext, "Modifiers", "modifiers"),
            (SheetKind::SystemContext, "Modifier", "modifiers"),
            (SheetKind::SystemContext, "TagID", "tag_id"),
            (SheetKind::FocusQuestion, "FocusQuestionID", "focus_question_id"),
            (SheetKind::FocusQuestion, "QuestionText", "question_text"),
            (SheetKind::FocusQuestion, "Question", "question_text"),
            (SheetKind::FocusQuestion, "RiskID", "risk_id"),
            (SheetKind::FocusQuestion, "TagID", "tag_id"),
            (SheetKind::Treatment, "RiskID", "risk_id"),
            (SheetKind::Treatment, "Risk Description", "risk_description"),
            (SheetKind::Treatment, "TagID", "tag_id"),
            (SheetKind::Treatment, "Treatment Suggestion", "treatment_suggestion"),
            (SheetKind::Tags, "TagID", "tag_id"),
            (SheetKind::Tags, "Tag", "tag"),
            (SheetKind::Tags, "Title", "tag"),
            (SheetKind::Tags, "Description", "description"),
        ];

        let mut map = HashMap::with_capacity(COLUMNS.len());
        for (kind, header, canonical) in COLUMNS {
            map.insert((*kind, normalize_header(header)), *canonical);
        }
        map
    })
}
