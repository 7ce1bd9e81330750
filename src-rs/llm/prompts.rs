//! Fixed instruction templates wrapped around `send`, and the parsing of
//! their replies.

use regex::Regex;
use std::sync::LazyLock;

use crate::llm::models::provider_base::CodeAnalysis;

pub const DEFAULT_LANGUAGE: &str = "generic";

static SECTION_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:#+\s*)?\**\s*(suggestions|issues)\s*\**\s*(?::\s*\**\s*(.*?))?\s*$")
        .expect("valid heading regex")
});

static BULLET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:[-*•]|\d+[.)])\s+(.+)$").expect("valid bullet regex")
});

static OTHER_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*#+\s+\S").expect("valid heading regex"));

static FENCED_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```[^\n]*\n(.*?)```").expect("valid fence regex"));

pub fn analysis_prompt(code: &str, language: Option<&str>) -> String {
    let language = language.map(str::trim).filter(|l| !l.is_empty());
    let subject = match language {
        Some(l) => format!("the following {} code", l),
        None => "the following code".to_string(),
    };
    format!(
        "Analyze {subject}.\n\
         Start with a short overall assessment. Then list improvement ideas under a line \
         \"Suggestions:\" and concrete problems under a line \"Issues:\", one \"- \" bullet per item. \
         Write \"None\" under a heading when there is nothing to report.\n\n\
         ```{fence}\n{code}\n```",
        subject = subject,
        fence = language.unwrap_or(""),
        code = code,
    )
}

pub fn generation_prompt(prompt: &str, language: &str) -> String {
    format!(
        "Generate {} code for: {}\nReply with a single fenced code block.",
        language, prompt
    )
}

#[derive(Clone, Copy, PartialEq)]
enum Section {
    Preamble,
    Suggestions,
    Issues,
}

/// Splits an analysis reply into its bullet sections. The full reply is
/// kept as `analysis`; missing sections simply come back empty.
pub fn parse_analysis(reply: &str) -> CodeAnalysis {
    let mut suggestions = Vec::new();
    let mut issues = Vec::new();
    let mut section = Section::Preamble;

    for line in reply.lines() {
        if let Some(caps) = SECTION_HEADING.captures(line) {
            section = if caps[1].eq_ignore_ascii_case("issues") {
                Section::Issues
            } else {
                Section::Suggestions
            };
            // "Issues: none" or "Issues: the loop never ends"
            let inline = caps.get(2).map_or("", |m| m.as_str()).trim_matches('*').trim();
            push_item(section, inline, &mut suggestions, &mut issues);
            continue;
        }
        if OTHER_HEADING.is_match(line) {
            section = Section::Preamble;
            continue;
        }
        if let Some(caps) = BULLET.captures(line) {
            push_item(section, caps[1].trim(), &mut suggestions, &mut issues);
        }
    }

    CodeAnalysis {
        analysis: reply.trim().to_string(),
        suggestions,
        issues,
    }
}

fn push_item(section: Section, item: &str, suggestions: &mut Vec<String>, issues: &mut Vec<String>) {
    let item = item.trim();
    if item.is_empty() || is_none_marker(item) {
        return;
    }
    match section {
        Section::Suggestions => suggestions.push(item.to_string()),
        Section::Issues => issues.push(item.to_string()),
        Section::Preamble => {}
    }
}

fn is_none_marker(item: &str) -> bool {
    let normalized = item.trim_end_matches('.').to_ascii_lowercase();
    matches!(normalized.as_str(), "none" | "n/a" | "no issues" | "no suggestions")
}

/// Body of the first fenced code block, if the reply has one.
pub fn extract_code_block(reply: &str) -> Option<String> {
    FENCED_BLOCK
        .captures(reply)
        .map(|caps| caps[1].trim_end_matches(['\n', '\r']).to_string())
}
