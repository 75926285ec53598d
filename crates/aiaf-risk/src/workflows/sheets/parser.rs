use super::mapping::{canonical_column, SheetKind};
use super::normalizer::clean_cell;
use super::LoadError;
use crate::workflows::assessment::{
    ContextRow, FocusQuestion, MalformedDataError, QuestionId, Response, ResponseId, RiskKey,
    TagDefinition, TreatmentEntry,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use std::io::Read;
use tracing::debug;

/// Reads one sheet export: skips the title rows, canonicalizes the header row and
/// deserializes every non-blank data row, keeping its line number.
fn read_rows<T, R>(reader: R, kind: SheetKind) -> Result<Vec<(u64, T)>, LoadError>
where
    T: DeserializeOwned,
    R: Read,
{
    let csv_error = |source: csv::Error| LoadError::Csv {
        sheet: kind.label(),
        source,
    };

    let mut records = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader)
        .into_records();

    let mut header = None;
    for _ in 0..=kind.header_offset() {
        header = match records.next() {
            Some(record) => Some(record.map_err(csv_error)?),
            None => None,
        };
    }
    let header = header.ok_or(MalformedDataError::EmptySheet {
        sheet: kind.label(),
    })?;

    let headers: csv::StringRecord = header
        .iter()
        .map(|cell| canonical_column(kind, cell))
        .collect();
    if let Some(column) = kind
        .required_columns()
        .iter()
        .copied()
        .find(|column| !headers.iter().any(|header| header == *column))
    {
        return Err(MalformedDataError::MissingColumn {
            sheet: kind.label(),
            column,
        }
        .into());
    }

    let mut rows = Vec::new();
    for record in records {
        let record = record.map_err(csv_error)?;
        let line = record.position().map(|position| position.line()).unwrap_or_default();

        if record.iter().all(|cell| cell.trim().is_empty()) {
            debug!(sheet = kind.label(), line, "skipping blank row");
            continue;
        }

        let row = record.deserialize::<T>(Some(&headers)).map_err(csv_error)?;
        rows.push((line, row));
    }

    Ok(rows)
}

#[derive(Debug, Deserialize)]
struct ContextSheetRow {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    question_id: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    question: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    response_id: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    response_title: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    response_description: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    modifiers: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    tag_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FocusSheetRow {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    focus_question_id: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    question_text: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    risk_id: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    tag_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TreatmentSheetRow {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    risk_id: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    risk_description: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    tag_id: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    treatment_suggestion: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TagSheetRow {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    tag_id: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    tag: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    description: Option<String>,
}

/// System-context rows with merged `QuestionID`/`Question` cells filled down.
pub(crate) fn parse_context_rows<R: Read>(reader: R) -> Result<Vec<ContextRow>, LoadError> {
    let kind = SheetKind::SystemContext;
    let mut last_question_id: Option<String> = None;
    let mut last_question: Option<String> = None;
    let mut rows = Vec::new();

    for (line, row) in read_rows::<ContextSheetRow, _>(reader, kind)? {
        if row.question_id.is_some() {
            last_question_id = row.question_id;
        }
        if row.question.is_some() {
            last_question = row.question;
        }

        let question_id = required(kind, line, "QuestionID", last_question_id.as_deref())?;
        let question_text = required(kind, line, "Question", last_question.as_deref())?;
        let response_id = required(kind, line, "ResponseID", row.response_id.as_deref())?;
        let title = required(kind, line, "ResponseTitle", row.response_title.as_deref())?;
        let tag_id = required_key(kind, line, "TagID", row.tag_id.as_deref())?;

        let modifiers = match row.modifiers.as_deref() {
            Some(raw) => vec![parse_number(kind, line, "Modifiers", raw)?],
            None => Vec::new(),
        };

        rows.push(ContextRow {
            line,
            question_id: QuestionId(parse_integer(kind, line, "QuestionID", question_id)?),
            question_text: question_text.to_string(),
            response: Response {
                response_id: ResponseId(parse_integer(kind, line, "ResponseID", response_id)?),
                title: title.to_string(),
                description: row.response_description.unwrap_or_default(),
                modifiers,
                tag_id,
            },
        });
    }

    Ok(rows)
}

pub(crate) fn parse_focus_questions<R: Read>(
    reader: R,
) -> Result<Vec<(u64, FocusQuestion)>, LoadError> {
    let kind = SheetKind::FocusQuestion;
    read_rows::<FocusSheetRow, _>(reader, kind)?
        .into_iter()
        .map(|(line, row)| -> Result<_, LoadError> {
            let question = FocusQuestion {
                focus_question_id: required_key(
                    kind,
                    line,
                    "FocusQuestionID",
                    row.focus_question_id.as_deref(),
                )?,
                text: required(kind, line, "QuestionText", row.question_text.as_deref())?
                    .to_string(),
                risk_id: row.risk_id.as_deref().and_then(RiskKey::parse),
                tag_id: row.tag_id.as_deref().and_then(RiskKey::parse),
            };
            Ok((line, question))
        })
        .collect()
}

pub(crate) fn parse_treatments<R: Read>(reader: R) -> Result<Vec<TreatmentEntry>, LoadError> {
    let kind = SheetKind::Treatment;
    read_rows::<TreatmentSheetRow, _>(reader, kind)?
        .into_iter()
        .map(|(line, row)| -> Result<_, LoadError> {
            Ok(TreatmentEntry {
                risk_id: required_key(kind, line, "RiskID", row.risk_id.as_deref())?,
                risk_description: row.risk_description.unwrap_or_default(),
                tag_id: required_key(kind, line, "TagID", row.tag_id.as_deref())?,
                treatment_suggestion: required(
                    kind,
                    line,
                    "Treatment Suggestion",
                    row.treatment_suggestion.as_deref(),
                )?
                .to_string(),
            })
        })
        .collect()
}

pub(crate) fn parse_tags<R: Read>(reader: R) -> Result<Vec<TagDefinition>, LoadError> {
    let kind = SheetKind::Tags;
    read_rows::<TagSheetRow, _>(reader, kind)?
        .into_iter()
        .map(|(line, row)| -> Result<_, LoadError> {
            Ok(TagDefinition {
                tag_id: required_key(kind, line, "TagID", row.tag_id.as_deref())?,
                label: required(kind, line, "Tag", row.tag.as_deref())?.to_string(),
                description: row.description.unwrap_or_default(),
            })
        })
        .collect()
}

fn required<'a>(
    kind: SheetKind,
    line: u64,
    field: &'static str,
    value: Option<&'a str>,
) -> Result<&'a str, MalformedDataError> {
    value.ok_or(MalformedDataError::MissingField {
        sheet: kind.label(),
        line,
        field,
    })
}

fn required_key(
    kind: SheetKind,
    line: u64,
    field: &'static str,
    value: Option<&str>,
) -> Result<RiskKey, MalformedDataError> {
    value
        .and_then(RiskKey::parse)
        .ok_or(MalformedDataError::MissingField {
            sheet: kind.label(),
            line,
            field,
        })
}

/// Accepts `3` as well as the `3.0` spreadsheets emit for numeric cells.
fn parse_integer(
    kind: SheetKind,
    line: u64,
    field: &'static str,
    raw: &str,
) -> Result<i64, MalformedDataError> {
    if let Ok(value) = raw.parse::<i64>() {
        return Ok(value);
    }

    match raw.parse::<f64>() {
        Ok(value)
            if value.is_finite()
                && value.fract() == 0.0
                && value >= i64::MIN as f64
                && value < i64::MAX as f64 =>
        {
            Ok(value as i64)
        }
        _ => Err(MalformedDataError::InvalidInteger {
            sheet: kind.label(),
            line,
            field,
            value: raw.to_string(),
        }),
    }
}

fn parse_number(
    kind: SheetKind,
    line: u64,
    field: &'static str,
    raw: &str,
) -> Result<f64, MalformedDataError> {
    raw.parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| MalformedDataError::InvalidNumber {
            sheet: kind.label(),
            line,
            field,
            value: raw.to_string(),
        })
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt
        .map(|value| clean_cell(&value))
        .filter(|value| !value.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const CONTEXT: &str = "\
System Context Assessment,,,,,,
QuestionID,Question,ResponseID,ResponseTitle,ResponseDescription,Modifiers,TagID
1.0,Does the system process biometric data?,1,Yes,Face templates are stored,1.5,T002
,,2,No,,,t001
,,,,,,
2,Is output reviewed by a person?,1.0,Never,,2,T003
";

    #[test]
    fn context_rows_are_forward_filled_and_coerced() {
        let rows = parse_context_rows(Cursor::new(CONTEXT)).expect("rows parse");

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1].question_id, QuestionId(1));
        assert_eq!(rows[1].question_text, "Does the system process biometric data?");
        assert!(rows[1].response.modifiers.is_empty());
        assert_eq!(rows[1].response.tag_id.as_str(), "T001");
        assert_eq!(rows[0].response.modifiers, vec![1.5]);
        assert_eq!(rows[2].response.response_id, ResponseId(1));
        assert_eq!(rows[2].line, 6);
    }

    #[test]
    fn first_row_without_question_id_is_malformed() {
        let csv = "Title\nQuestionID,Question,ResponseID,ResponseTitle,TagID\n,What data?,1,Yes,T001\n";
        match parse_context_rows(Cursor::new(csv)) {
            Err(LoadError::Malformed(MalformedDataError::MissingField { field, line, .. })) => {
                assert_eq!(field, "QuestionID");
                assert_eq!(line, 3);
            }
            other => panic!("expected missing field, got {other:?}"),
        }
    }

    #[test]
    fn non_integral_response_id_is_rejected() {
        let csv = "Title\nQuestionID,Question,ResponseID,ResponseTitle,TagID\n1,What data?,1.5,Yes,T001\n";
        match parse_context_rows(Cursor::new(csv)) {
            Err(LoadError::Malformed(MalformedDataError::InvalidInteger { value, .. })) => {
                assert_eq!(value, "1.5")
            }
            other => panic!("expected invalid integer, got {other:?}"),
        }
    }

    #[test]
    fn integral_floats_beyond_i64_are_rejected() {
        let csv = "Title\nQuestionID,Question,ResponseID,ResponseTitle,TagID\n1e20,What data?,1,Yes,T001\n";
        match parse_context_rows(Cursor::new(csv)) {
            Err(LoadError::Malformed(MalformedDataError::InvalidInteger { field, value, .. })) => {
                assert_eq!(field, "QuestionID");
                assert_eq!(value, "1e20");
            }
            other => panic!("expected invalid integer, got {other:?}"),
        }
    }

    #[test]
    fn non_numeric_modifier_is_rejected() {
        let csv = "Title\nQuestionID,Question,ResponseID,ResponseTitle,Modifiers,TagID\n1,What data?,1,Yes,high,T001\n";
        assert!(matches!(
            parse_context_rows(Cursor::new(csv)),
            Err(LoadError::Malformed(MalformedDataError::InvalidNumber { .. }))
        ));
    }

    #[test]
    fn missing_required_column_is_reported() {
        let csv = "Title\nQuestionID,Question,ResponseID,TagID\n1,What data?,1,T001\n";
        match parse_context_rows(Cursor::new(csv)) {
            Err(LoadError::Malformed(MalformedDataError::MissingColumn { column, .. })) => {
                assert_eq!(column, "response_title")
            }
            other => panic!("expected missing column, got {other:?}"),
        }
    }

    #[test]
    fn sheet_without_header_is_empty() {
        assert!(matches!(
            parse_focus_questions(Cursor::new("Focus Question\n")),
            Err(LoadError::Malformed(MalformedDataError::EmptySheet { .. }))
        ));
    }

    #[test]
    fn focus_questions_accept_question_alias_and_optional_keys() {
        let csv = "Focus Question\nAnswer Yes or No\nFocus_Question_ID,Question,Risk ID,TagID\nFQ01,Is data encrypted?,R001,\nfq02,Is consent captured?,,T002\n";
        let questions = parse_focus_questions(Cursor::new(csv)).expect("rows parse");

        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].1.risk_id, RiskKey::parse("R001"));
        assert!(questions[0].1.tag_id.is_none());
        assert_eq!(questions[1].1.focus_question_id.as_str(), "FQ02");
        assert!(questions[1].1.risk_id.is_none());
    }

    #[test]
    fn treatments_and_tags_parse_after_two_title_rows() {
        let treatments = "Treatment\n\u{feff}Suggested controls\nRiskID,Risk Description,TagID,Treatment Suggestion\nR009,Model drift,T009,Monitor drift monthly\n";
        let entries = parse_treatments(Cursor::new(treatments)).expect("treatments parse");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].treatment_suggestion, "Monitor drift monthly");

        let tags = "Tags\nTaxonomy\nTagID,Title,Description\nT009,Robustness,Model stays accurate\n";
        let definitions = parse_tags(Cursor::new(tags)).expect("tags parse");
        assert_eq!(definitions[0].label, "Robustness");
    }
}
