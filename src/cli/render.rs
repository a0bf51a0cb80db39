use colored::{ColoredString, Colorize};
use serde::Serialize;

use super::args::OutputFormat;
use crate::agents::{AgentAction, FoundApi, PlanFailure, PlanReport, StepOutcome, StepStatus};
use crate::github::{RepoSnapshot, RepoSummary};
use crate::http::{ResponseRecord, StatusClass};
use crate::models::ChatMessage;
use crate::utils::ErrorRecord;

fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!("{{\"message\": \"Failed to serialize output: {}\"}}", e))
}

fn status_label(record: &ResponseRecord) -> ColoredString {
    let label = format!("{} {}", record.status, record.status_text).bold();
    match record.status_class() {
        StatusClass::Success => label.green(),
        StatusClass::Redirect => label.cyan(),
        StatusClass::ClientError => label.yellow(),
        StatusClass::ServerError => label.red(),
        StatusClass::Informational => label.normal(),
    }
}

pub fn render_response(record: &ResponseRecord, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => to_json(record),
        OutputFormat::Text => {
            let mut output = format!(
                "{}  {}\n",
                status_label(record),
                format!("{} ms", record.elapsed_ms).dimmed()
            );
            for (name, value) in &record.headers {
                output.push_str(&format!("{}: {}\n", name.cyan(), value));
            }
            if !record.body.is_empty() {
                output.push('\n');
                output.push_str(&record.body.to_display_string());
                output.push('\n');
            }
            output
        }
    }
}

pub fn render_error(error: &ErrorRecord, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => to_json(error),
        OutputFormat::Text => format!("{} {}", "Error:".red().bold(), error.message),
    }
}

pub fn render_found_apis(apis: &[FoundApi], format: OutputFormat) -> String {
    if format == OutputFormat::Json {
        return to_json(apis);
    }
    if apis.is_empty() {
        return "No suitable APIs were found. Try rephrasing the query.".to_string();
    }

    let mut output = String::new();
    for (i, api) in apis.iter().enumerate() {
        output.push_str(&format!(
            "{}. {}\n   {} {}\n   {}\n   {} {}\n   {} {}\n",
            i + 1,
            api.name.bold(),
            api.method.as_str().green(),
            api.url,
            api.description,
            "How to use:".dimmed(),
            api.usage_explanation,
            "Try it:".dimmed(),
            api.test_in_app_example
        ));
    }
    output
}

pub fn render_plan(plan: &[AgentAction]) -> String {
    let mut output = format!("{}\n", "Proposed plan:".bold());
    for (i, action) in plan.iter().enumerate() {
        let label = if action.is_supported() {
            action.action_type().yellow()
        } else {
            action.action_type().red()
        };
        output.push_str(&format!(
            "  {}. {} {}\n     {}\n",
            i + 1,
            label,
            action.target(),
            action.explanation().dimmed()
        ));
    }
    output
}

fn render_steps(steps: &[StepOutcome]) -> String {
    let mut output = String::new();
    for outcome in steps {
        let mark = match outcome.status {
            StepStatus::Applied => "[OK]".green(),
            StepStatus::Skipped => "[SKIP]".yellow(),
        };
        output.push_str(&format!("{} {}. {}\n", mark, outcome.step, outcome.detail));
    }
    output
}

pub fn render_report(report: &PlanReport, format: OutputFormat) -> String {
    if format == OutputFormat::Json {
        return to_json(report);
    }
    let mut output = render_steps(&report.steps);
    output.push_str(&format!("{}", "Plan executed.".green().bold()));
    output
}

pub fn render_failure(failure: &PlanFailure, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => to_json(&serde_json::json!({
            "message": failure.to_record().message,
            "step": failure.step,
            "completed": failure.completed,
        })),
        OutputFormat::Text => {
            let mut output = render_steps(&failure.completed);
            output.push_str(&render_error(&failure.to_record(), format));
            output
        }
    }
}

pub fn render_repositories(repos: &[RepoSummary]) -> String {
    repos
        .iter()
        .map(|repo| {
            let visibility = if repo.private { " (private)".dimmed().to_string() } else { String::new() };
            match &repo.description {
                Some(description) if !description.is_empty() => format!(
                    "{}{}\n   {}",
                    repo.full_name.bold(),
                    visibility,
                    description
                ),
                _ => format!("{}{}", repo.full_name.bold(), visibility),
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_snapshot(snapshot: &RepoSnapshot) -> String {
    let mut output = format!(
        "{} @ {} ({} files)\n",
        snapshot.info.path.bold(),
        snapshot.info.default_branch,
        snapshot.files.len()
    );
    for file in snapshot.files.iter() {
        let short: String = file.revision.chars().take(7).collect();
        output.push_str(&format!("  {}  {}\n", file.path, short.dimmed()));
    }
    if snapshot.truncated {
        output.push_str(&format!(
            "{}\n",
            "The repository is large; this list may be incomplete.".yellow()
        ));
    }
    output
}

pub fn render_message(message: &ChatMessage) -> String {
    let mut output = message.content.clone();
    if !message.citations.is_empty() {
        output.push_str(&format!("\n\n{}\n", "Sources:".dimmed()));
        for citation in &message.citations {
            output.push_str(&format!("  - {} ({})\n", citation.title, citation.uri.cyan()));
        }
    }
    output
}
