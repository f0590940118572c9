//! Turns raw model text into a structured turn for the reasoning loop.
//!
//! Models wrap their JSON replies in code fences, prepend chain-of-thought
//! blocks, leave trailing commas, and forget to escape quotes and newlines
//! inside string values. The pipeline here recovers the action envelope from
//! all of those shapes before giving up and reporting the turn as malformed.

use regex::Regex;

use crate::models::envelope::ActionEnvelope;

/// One parsed model turn, as dispatched on by the reasoning loop.
#[derive(Debug, Clone, PartialEq)]
pub enum LlmTurn {
    /// A parsed envelope that is not a terminal answer. The action name may
    /// be empty or unknown; the loop answers those with a tool-unavailable
    /// observation rather than an error.
    ToolCall(ActionEnvelope),
    /// A non-empty, non-placeholder final answer.
    FinalAnswer { text: String, thought: String },
    /// Nothing recoverable; the loop falls back to the summarization path.
    Malformed { raw: String },
}

/// Substrings that mark a final answer as an echoed template rather than a
/// real reply.
const PLACEHOLDER_MARKERS: &[&str] = &[
    "<最终答案",
    "<final_answer",
    "<Final answer",
    "<最终回答",
    "<回答",
    "<答案",
    "使用 Markdown 格式",
    "使用Markdown格式",
    "换行符用 \\n 表示",
    "换行符用\\n表示",
];

/// Parse raw model output into a turn.
pub fn normalize(raw: &str) -> LlmTurn {
    match parse_envelope(raw) {
        Some(envelope) => classify(envelope),
        None => LlmTurn::Malformed {
            raw: raw.to_string(),
        },
    }
}

fn classify(envelope: ActionEnvelope) -> LlmTurn {
    if !envelope.final_answer.is_empty() && !is_placeholder(&envelope.final_answer) {
        LlmTurn::FinalAnswer {
            text: envelope.final_answer,
            thought: envelope.thought,
        }
    } else {
        LlmTurn::ToolCall(envelope)
    }
}

/// Best-effort extraction of the action envelope from raw model text.
pub fn parse_envelope(raw: &str) -> Option<ActionEnvelope> {
    let stripped = strip_think_block(strip_code_fences(raw.trim()));

    if let Some(candidate) = extract_json_object(stripped) {
        if let Ok(envelope) = serde_json::from_str::<ActionEnvelope>(candidate) {
            return Some(envelope);
        }
        let cleaned = clean_json(candidate);
        if let Ok(envelope) = serde_json::from_str::<ActionEnvelope>(&cleaned) {
            return Some(envelope);
        }
    }

    // Field-level salvage: the reply was not an object we could repair, but
    // it may still carry a usable final answer.
    extract_field(stripped, "final_answer")
        .filter(|value| !value.is_empty())
        .map(|final_answer| ActionEnvelope {
            final_answer,
            ..Default::default()
        })
}

/// True when a final answer is a schema annotation or template the model
/// echoed without filling in.
pub fn is_placeholder(value: &str) -> bool {
    if value.len() < 10 {
        return true;
    }
    if PLACEHOLDER_MARKERS.iter().any(|m| value.contains(m)) {
        return true;
    }
    value.contains('<') && value.contains('>')
}

fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    if !trimmed.starts_with("```") {
        return trimmed;
    }
    // Drop the opening fence line, including any language tag.
    let body = match trimmed.find('\n') {
        Some(idx) => &trimmed[idx + 1..],
        None => return trimmed,
    };
    let body = body.trim_end();
    body.strip_suffix("```").unwrap_or(body).trim()
}

fn strip_think_block(text: &str) -> &str {
    let trimmed = text.trim_start();
    if let Some(rest) = trimmed.strip_prefix("<think>") {
        if let Some(end) = rest.find("</think>") {
            return rest[end + "</think>".len()..].trim_start();
        }
    }
    trimmed
}

/// Locate the outermost object: first `{` through last `}`.
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

/// Repair the common model JSON mistakes. Each step is idempotent.
fn clean_json(json: &str) -> String {
    let repaired = escape_newlines_in_strings(json);
    let repaired = escape_inner_quotes(&repaired);
    strip_trailing_commas(&repaired)
}

fn escape_newlines_in_strings(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    let mut in_string = false;
    let mut escaped = false;

    for ch in json.chars() {
        if escaped {
            out.push(ch);
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_string => {
                escaped = true;
                out.push(ch);
            }
            '"' => {
                in_string = !in_string;
                out.push(ch);
            }
            '\n' if in_string => out.push_str("\\n"),
            '\r' if in_string => out.push_str("\\r"),
            _ => out.push(ch),
        }
    }
    out
}

/// Escape quotes inside string values. A quote only closes a string when the
/// next non-whitespace character is structural (`:`, `,`, `}`, `]` or end of
/// input); anything else means the model forgot to escape it.
fn escape_inner_quotes(json: &str) -> String {
    let chars: Vec<char> = json.chars().collect();
    let mut out = String::with_capacity(json.len());
    let mut in_string = false;
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        if in_string && ch == '\\' && i + 1 < chars.len() {
            out.push(ch);
            out.push(chars[i + 1]);
            i += 2;
            continue;
        }
        if ch == '"' {
            if !in_string {
                in_string = true;
                out.push(ch);
            } else {
                let mut j = i + 1;
                while j < chars.len() && chars[j].is_whitespace() {
                    j += 1;
                }
                let closes = j >= chars.len() || matches!(chars[j], ':' | ',' | '}' | ']');
                if closes {
                    in_string = false;
                    out.push(ch);
                } else {
                    out.push_str("\\\"");
                }
            }
        } else {
            out.push(ch);
        }
        i += 1;
    }
    out
}

fn strip_trailing_commas(json: &str) -> String {
    let re = Regex::new(r",\s*([}\]])").unwrap();
    re.replace_all(json, "$1").to_string()
}

/// Extract a named string field from possibly malformed JSON, falling back
/// to a regex scan with standard escape handling.
pub fn extract_field(text: &str, field: &str) -> Option<String> {
    if let Some(candidate) = extract_json_object(text) {
        let value: Option<serde_json::Value> = serde_json::from_str(candidate)
            .ok()
            .or_else(|| serde_json::from_str(&clean_json(candidate)).ok());
        if let Some(value) = value {
            match value.get(field) {
                Some(serde_json::Value::String(s)) => return Some(s.clone()),
                Some(other) if !other.is_null() => return Some(other.to_string()),
                _ => {}
            }
        }
    }

    let pattern = format!(
        r#""{}"\s*:\s*"((?:[^"\\]|\\.)*)""#,
        regex::escape(field)
    );
    let re = Regex::new(&pattern).unwrap();
    let caps = re.captures(text)?;
    Some(unescape_json_string(caps.get(1)?.as_str()))
}

fn unescape_json_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
