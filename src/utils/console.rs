use crate::event::{Event, EventEnvelope};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

/// Spinner shown while the workflow runs
pub fn init_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.enable_steady_tick(std::time::Duration::from_millis(120));
    if let Ok(style) = ProgressStyle::default_spinner()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
        .template("{spinner} [{elapsed_precise}] {msg}")
    {
        spinner.set_style(style);
    }
    spinner
}

pub fn display_welcome_message() {
    println!("{}", "\n🎨 Welcome to promptsmith!".bold().cyan());
    println!("{}", "Describe the image you would like to create.".yellow());
}

/// Human readable rendering of one event, `None` for events with nothing to show
pub fn format_event(envelope: &EventEnvelope) -> Option<String> {
    match &envelope.event {
        Event::Connection(data) => Some(format!("{} {}", "session".dimmed(), data.session_id.dimmed())),
        Event::ThoughtLog(data) => Some(format!(
            "{} {}",
            format!("[{}]", data.stage).blue().bold(),
            data.message
        )),
        Event::EnhancedPrompt(data) => {
            let mut lines = vec![format!("{} {}", "✨ prompt:".green().bold(), data.final_prompt)];
            for retrieved in &data.retrieved {
                lines.push(format!(
                    "   {} {} ({:.2})",
                    "↳".dimmed(),
                    retrieved.style.cyan(),
                    retrieved.similarity
                ));
            }
            Some(lines.join("\n"))
        }
        Event::GenUiComponent(data) => match data.widget_type.as_str() {
            "ImageView" => data.props["url"]
                .as_str()
                .map(|url| format!("{} {}", "🖼  artifact:".green().bold(), url.underline())),
            "StatusMessage" => data.props["message"].as_str().map(|m| m.green().to_string()),
            _ => None,
        },
        Event::Error(data) => Some(format!(
            "{} {} ({})",
            "❌".red(),
            data.message.red().bold(),
            data.code
        )),
        Event::StreamEnd(data) => Some(format!(
            "{} {}",
            "🏁 finished:".bold(),
            data.summary["outcome"].as_str().unwrap_or("unknown")
        )),
    }
}
