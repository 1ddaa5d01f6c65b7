use anyhow::Result;

use crate::cli::OutputFormat;
use crate::server::ResponseEnvelope;
use crate::utils::format_timestamp;

/// Render an envelope in the requested format
pub fn render(envelope: &ResponseEnvelope, format: &OutputFormat) -> Result<String> {
    let content = match format {
        OutputFormat::Json => serde_json::to_string_pretty(envelope)?,
        OutputFormat::Text => format_as_text(envelope),
    };

    Ok(content)
}

/// Print an envelope to stdout
pub fn print_to_console(envelope: &ResponseEnvelope, format: &OutputFormat) -> Result<()> {
    println!("{}", render(envelope, format)?);
    Ok(())
}

fn format_as_text(envelope: &ResponseEnvelope) -> String {
    match envelope {
        ResponseEnvelope::Transcript { transcript, .. } => transcript
            .iter()
            .map(|segment| format!("[{}] {}", format_timestamp(segment.start), segment.text))
            .collect::<Vec<_>>()
            .join("\n"),
        ResponseEnvelope::PlainText { transcript, .. } => transcript.clone(),
        ResponseEnvelope::AvailableLanguages {
            available_transcripts,
            ..
        } => available_transcripts
            .iter()
            .map(|lang| {
                format!(
                    "{:<8} {} ({}{})",
                    lang.language_code,
                    lang.language,
                    if lang.is_generated { "generated" } else { "manual" },
                    if lang.is_translatable { ", translatable" } else { "" }
                )
            })
            .collect::<Vec<_>>()
            .join("\n"),
    }
}
