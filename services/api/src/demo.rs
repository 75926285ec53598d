use crate::infra::{build_service, InMemorySessionRepository};
use aiaf_risk::config::AppConfig;
use aiaf_risk::error::AppError;
use aiaf_risk::telemetry::{self, LogSink};
use aiaf_risk::workflows::assessment::{
    Answer, AssessmentReport, AssessmentService, FocusOutcome, FocusQuestionId, Question,
    QuestionId, ResponseId, SessionId,
};
use clap::Args;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Args, Debug, Default)]
pub(crate) struct QuestionsArgs {
    /// Directory holding the workbook sheet exports
    #[arg(long)]
    pub(crate) data_dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct AssessArgs {
    /// JSON answer sheet: {"use_case", "selections": {qid: rid}, "focus_answers": {id: "yes"|"no"}}
    #[arg(long)]
    pub(crate) answers: PathBuf,
    /// Directory holding the workbook sheet exports
    #[arg(long)]
    pub(crate) data_dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Directory holding the workbook sheet exports
    #[arg(long)]
    pub(crate) data_dir: Option<PathBuf>,
    /// Use case recorded at intake
    #[arg(long, default_value = "Facial recognition kiosk")]
    pub(crate) use_case: String,
}

/// Answers for a non-interactive run.
#[derive(Debug, Deserialize)]
pub(crate) struct AnswerSheet {
    pub(crate) use_case: String,
    pub(crate) selections: BTreeMap<i64, i64>,
    #[serde(default)]
    pub(crate) focus_answers: BTreeMap<FocusQuestionId, Answer>,
}

type Service = AssessmentService<InMemorySessionRepository>;

fn prepare(data_dir: Option<PathBuf>) -> Result<Service, AppError> {
    let mut config = AppConfig::load()?;
    if let Some(data_dir) = data_dir {
        config.assessment.data_dir = data_dir;
    }

    telemetry::init_with_sink(&config.telemetry, LogSink::Stderr)?;
    build_service(&config.assessment)
}

pub(crate) fn run_questions(args: QuestionsArgs) -> Result<(), AppError> {
    let service = prepare(args.data_dir)?;
    for question in service.questions() {
        println!("{}", render_question(&question).join("\n"));
    }
    Ok(())
}

pub(crate) fn run_assess(args: AssessArgs) -> Result<(), AppError> {
    let raw = std::fs::read_to_string(&args.answers)?;
    let sheet: AnswerSheet = serde_json::from_str(&raw)?;
    let service = prepare(args.data_dir)?;

    let report = execute_answer_sheet(&service, &sheet)?;
    println!("{}", render_report(&report).join("\n"));

    if report.focus_outcome == FocusOutcome::Pending {
        println!("\nAdd these to \"focus_answers\" to finish the assessment:");
        for question in &report.focus_questions {
            println!("  {}: {}", question.focus_question_id, question.text);
        }
    }
    Ok(())
}

/// Drives one session through every stage the sheet has answers for. The session is
/// ended whether or not the run succeeds.
pub(crate) fn execute_answer_sheet(
    service: &Service,
    sheet: &AnswerSheet,
) -> Result<AssessmentReport, AppError> {
    let id = service.start(&sheet.use_case)?.session_id;
    let outcome = answer_and_report(service, &id, sheet);
    let ended = service.end(&id);

    let report = outcome?;
    ended?;
    Ok(report)
}

fn answer_and_report(
    service: &Service,
    id: &SessionId,
    sheet: &AnswerSheet,
) -> Result<AssessmentReport, AppError> {
    for (question_id, response_id) in &sheet.selections {
        service.select(id, QuestionId(*question_id), ResponseId(*response_id))?;
    }
    service.submit(id)?;
    service.generate_focus_questions(id)?;

    if !sheet.focus_answers.is_empty() {
        service.answer_focus_questions(id, &sheet.focus_answers)?;
    }

    Ok(service.report(id)?)
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let service = prepare(args.data_dir)?;

    println!("AI assurance risk assessment demo");
    let id = service.start(&args.use_case)?.session_id;
    println!("Session {id} for \"{}\"", args.use_case.trim());

    println!("\nContext questions (first response chosen)");
    for question in service.questions() {
        let Some(response) = question.responses.first() else {
            continue;
        };
        let selection = service.select(&id, question.question_id, response.response_id)?;
        println!(
            "  {} {}\n      -> {} (modifier {:+.1})",
            question.question_id, question.text, response.title, selection.modifier
        );
    }

    let summary = service.submit(&id)?;
    println!(
        "\nRisk score {:.2}, tier {}",
        summary.score,
        summary.tier.label()
    );

    let questions = service.generate_focus_questions(&id)?;
    println!("\nFocus questions");
    let answers: BTreeMap<FocusQuestionId, Answer> = questions
        .iter()
        .enumerate()
        .map(|(index, question)| {
            let answer = if index == 0 { Answer::No } else { Answer::Yes };
            println!(
                "  {} {} -> {}",
                question.focus_question_id,
                question.text,
                answer.label()
            );
            (question.focus_question_id.clone(), answer)
        })
        .collect();

    service.answer_focus_questions(&id, &answers)?;
    let report = service.report(&id)?;
    println!("\n{}", render_report(&report).join("\n"));

    service.end(&id)?;
    Ok(())
}

fn render_question(question: &Question) -> Vec<String> {
    let mut lines = vec![format!("{} {}", question.question_id, question.text)];
    for response in &question.responses {
        let modifier = if response.modifiers.is_empty() {
            "no modifier".to_string()
        } else {
            format!("modifier {:+.1}", response.modifier())
        };
        lines.push(format!(
            "  [{}] {} ({}, tag {})",
            response.response_id.0, response.title, modifier, response.tag_id
        ));
    }
    lines
}

pub(crate) fn render_report(report: &AssessmentReport) -> Vec<String> {
    let mut lines = vec![
        format!("Assessment {}", report.session_id),
        format!("Use case: {}", report.use_case),
        format!("Stage: {}", report.stage),
    ];

    if let (Some(score), Some(label)) = (report.risk_score, report.risk_tier_label) {
        lines.push(format!("Risk score: {score:.2} ({label})"));
    }
    if !report.focus_categories.is_empty() {
        let categories: Vec<&str> = report
            .focus_categories
            .iter()
            .map(|category| category.label())
            .collect();
        lines.push(format!("Focus categories: {}", categories.join(", ")));
    }

    if !report.selected_responses.is_empty() {
        lines.push("Selected responses:".to_string());
        for view in &report.selected_responses {
            lines.push(format!(
                "  {} {} -> {} [{}]",
                view.question_id, view.question_text, view.response_title, view.tag_label
            ));
        }
    }

    if !report.treatments.is_empty() {
        lines.push("Suggested treatments:".to_string());
        for entry in &report.treatments {
            lines.push(format!(
                "  {} {}: {}",
                entry.risk_id, entry.risk_description, entry.treatment_suggestion
            ));
        }
    }

    lines.push(format!("Outcome: {}", report.focus_outcome.summary()));
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use aiaf_risk::config::{AssessmentSettings, BUNDLED_DATA_DIR};
    use aiaf_risk::workflows::assessment::{AssessmentStage, SamplerConfig, ScoringConfig};
    use aiaf_risk::workflows::sheets::SheetImporter;
    use std::sync::Arc;

    fn service() -> Service {
        build_service(&AssessmentSettings::default()).expect("service builds")
    }

    fn sheet(json: &str) -> AnswerSheet {
        serde_json::from_str(json).expect("answer sheet parses")
    }

    #[test]
    fn answer_sheet_accepts_string_keys_and_capitalized_answers() {
        let sheet = sheet(
            r#"{"use_case": "Chatbot", "selections": {"1": 2}, "focus_answers": {"fq01": "Yes"}}"#,
        );
        assert_eq!(sheet.selections.get(&1), Some(&2));
        assert_eq!(sheet.focus_answers.values().next(), Some(&Answer::Yes));
    }

    #[test]
    fn sheet_without_focus_answers_stops_after_sampling() {
        let service = service();
        let sheet = sheet(
            r#"{"use_case": "Chatbot",
                "selections": {"1": 3, "2": 3, "3": 2, "4": 2, "5": 2, "6": 2}}"#,
        );

        let report = execute_answer_sheet(&service, &sheet).expect("session runs");
        assert_eq!(report.stage, AssessmentStage::FocusQuestionsGenerated);
        assert_eq!(report.focus_outcome, FocusOutcome::Pending);
        assert_eq!(report.focus_questions.len(), 3);

        let rendered = render_report(&report).join("\n");
        assert!(rendered.contains("Use case: Chatbot"));
        assert!(rendered.contains("not answered yet"));
    }

    #[test]
    fn incomplete_selections_fail_the_run_and_end_the_session() {
        let repository = InMemorySessionRepository::default();
        let dataset = SheetImporter::from_dir(BUNDLED_DATA_DIR).expect("bundled data loads");
        let service = AssessmentService::new(
            Arc::new(dataset),
            Arc::new(repository.clone()),
            ScoringConfig::default(),
            SamplerConfig::default(),
        );
        let sheet = sheet(r#"{"use_case": "Chatbot", "selections": {"1": 1}}"#);

        assert!(matches!(
            execute_answer_sheet(&service, &sheet),
            Err(AppError::Assessment(_))
        ));
        assert_eq!(repository.len(), 0);
    }

    #[test]
    fn questions_render_with_modifiers() {
        let service = service();
        let questions = service.questions();
        let lines = render_question(&questions[0]);

        assert!(lines[0].starts_with("Q1 "));
        assert!(lines.iter().any(|line| line.contains("modifier +1.5")));
        assert!(lines.iter().any(|line| line.contains("no modifier")));
    }
}
