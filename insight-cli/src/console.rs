//! Interactive console session.
//!
//! The console keeps three URL slots, mirroring the web form. Lines starting
//! with `:` are commands; anything else is asked as a question.

use insight_rag::{AnswerResult, InsightPipeline, MAX_URL_FIELDS, ProcessReport};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

const HELP: &str = "\
Commands:
  :url <n> <url>   set URL slot n (1-3); omit <url> to clear it
  :urls            show the URL slots
  :process         fetch the URLs and rebuild the index
  :clear           clear all URL slots
  :help            show this help
  :quit            leave the console
Any other line is asked as a question.";

/// A parsed console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    SetUrl { slot: usize, url: String },
    ShowUrls,
    Process,
    Clear,
    Help,
    Quit,
    Ask(String),
    Empty,
}

/// Parse one line of console input.
pub fn parse_line(line: &str) -> Result<ConsoleCommand, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(ConsoleCommand::Empty);
    }
    let Some(command) = line.strip_prefix(':') else {
        return Ok(ConsoleCommand::Ask(line.to_string()));
    };

    let mut parts = command.splitn(3, char::is_whitespace);
    match parts.next().unwrap_or_default() {
        "url" => {
            let slot = parts
                .next()
                .and_then(|n| n.parse::<usize>().ok())
                .filter(|n| (1..=MAX_URL_FIELDS).contains(n))
                .ok_or_else(|| format!("usage: :url <1-{MAX_URL_FIELDS}> <url>"))?;
            let url = parts.next().unwrap_or_default().trim().to_string();
            Ok(ConsoleCommand::SetUrl { slot, url })
        }
        "urls" => Ok(ConsoleCommand::ShowUrls),
        "process" => Ok(ConsoleCommand::Process),
        "clear" => Ok(ConsoleCommand::Clear),
        "help" | "h" | "?" => Ok(ConsoleCommand::Help),
        "quit" | "q" | "exit" => Ok(ConsoleCommand::Quit),
        other => Err(format!("unknown command ':{other}', try :help")),
    }
}

/// Run the console until `:quit`, Ctrl-C or Ctrl-D.
///
/// Errors from processing or asking are printed and the session continues.
pub async fn run_console(pipeline: &InsightPipeline) -> anyhow::Result<()> {
    let mut editor = DefaultEditor::new()?;
    let mut slots: [String; MAX_URL_FIELDS] = Default::default();

    println!("InsightOwl console. Type :help for commands.");
    if pipeline.store().exists().await {
        println!("Using existing index at {}", pipeline.store().path().display());
    }

    loop {
        let line = match editor.readline("insight> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        let command = match parse_line(&line) {
            Ok(command) => command,
            Err(message) => {
                eprintln!("{message}");
                continue;
            }
        };
        if command != ConsoleCommand::Empty {
            let _ = editor.add_history_entry(line.trim());
        }

        match command {
            ConsoleCommand::Empty => {}
            ConsoleCommand::SetUrl { slot, url } => slots[slot - 1] = url,
            ConsoleCommand::ShowUrls => print_slots(&slots),
            ConsoleCommand::Clear => slots = Default::default(),
            ConsoleCommand::Help => println!("{HELP}"),
            ConsoleCommand::Quit => break,
            ConsoleCommand::Process => {
                let result = pipeline
                    .process_urls_with_progress(&slots, |stage| println!("{stage}..."))
                    .await;
                match result {
                    Ok(report) => print_report(&report),
                    Err(e) => eprintln!("Error: {e}"),
                }
            }
            ConsoleCommand::Ask(question) => match pipeline.ask(&question).await {
                Ok(answer) => print_answer(&answer),
                Err(e) => eprintln!("Error: {e}"),
            },
        }
    }
    Ok(())
}

fn print_slots(slots: &[String]) {
    for (i, url) in slots.iter().enumerate() {
        let shown = if url.is_empty() { "(empty)" } else { url.as_str() };
        println!("  URL {}: {shown}", i + 1);
    }
}

pub(crate) fn print_report(report: &ProcessReport) {
    println!(
        "Indexed {} chunks from {} article(s) into {}",
        report.chunks,
        report.documents.len(),
        report.index_path.display()
    );
}

pub(crate) fn print_answer(answer: &AnswerResult) {
    println!("Answer\n{}", answer.answer);
    if !answer.sources.is_empty() {
        println!("\nSources:\n{}", answer.sources_text());
    }
}
