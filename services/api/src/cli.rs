use crate::demo::{run_assess, run_demo, run_questions, AssessArgs, DemoArgs, QuestionsArgs};
use crate::server;
use aiaf_risk::error::AppError;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "aiaf-risk",
    about = "Score AI systems against the assurance framework and suggest risk treatments",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Print the context questions in ascending ID order
    Questions(QuestionsArgs),
    /// Run a complete assessment from a JSON answer sheet
    Assess(AssessArgs),
    /// Walk through a scripted assessment and print every stage
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Directory holding the workbook sheet exports
    #[arg(long)]
    pub(crate) data_dir: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Questions(args) => run_questions(args),
        Command::Assess(args) => run_assess(args),
        Command::Demo(args) => run_demo(args),
    }
}
