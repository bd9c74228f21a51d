//! Prompt construction.
//!
//! Section order is fixed: style notes, glossary, context summary, previous
//! tail, preamble, stage instructions, delimited text, closing directive.
//! Empty sections render as `(none)` so the layout never shifts.

use scrivener_core::{Memory, StageConfig};
use std::fmt::Write;

/// Opens the text under edit.
pub const TEXT_OPEN: &str = "<<<\n";
/// Closes the text under edit.
pub const TEXT_CLOSE: &str = "\n>>>";

const EMPTY_SECTION: &str = "(none)";
const CLOSING_DIRECTIVE: &str = "Return only the edited text, with no commentary.";

/// Render the prompt for one stage over one piece of text.
pub fn build_prompt(memory: &Memory, stage: &StageConfig, text: &str) -> String {
    let mut prompt = String::with_capacity(text.len() + stage.prompt_template.len() + 1024);

    section(&mut prompt, "STYLE NOTES", &memory.style_profile.notes);
    section(&mut prompt, "GLOSSARY", &render_glossary(memory));
    section(&mut prompt, "CONTEXT SUMMARY", &memory.context_summary.short);
    section(&mut prompt, "PREVIOUS EDITED TAIL", memory.tail());

    let _ = writeln!(
        prompt,
        "You are performing the \"{}\" editing stage on one part of a longer document.\n\
         Rules:\n\
         - Preserve the meaning of the text.\n\
         - Do not invent facts.\n\
         - Keep the author's tone.\n\
         - Keep glossary terms exactly as listed.\n",
        stage.name
    );

    section(&mut prompt, "STAGE INSTRUCTIONS", &stage.prompt_template);

    prompt.push_str("TEXT:\n");
    prompt.push_str(TEXT_OPEN);
    prompt.push_str(text);
    prompt.push_str(TEXT_CLOSE);
    prompt.push_str("\n\n");
    prompt.push_str(CLOSING_DIRECTIVE);

    prompt
}

/// `term = rendering` lines in key order.
fn render_glossary(memory: &Memory) -> String {
    memory
        .glossary
        .term_map
        .iter()
        .map(|(term, rendering)| format!("{term} = {rendering}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn section(prompt: &mut String, title: &str, body: &str) {
    let body = body.trim();
    let body = if body.is_empty() { EMPTY_SECTION } else { body };
    let _ = write!(prompt, "{title}:\n{body}\n\n");
}
