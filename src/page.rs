use regex::Regex;
use std::sync::OnceLock;

use crate::models::{ServiceStatus, ServiceType};

/// Keyword matching ignores blocks shorter than this; navigation crumbs
/// and menu entries on the provider page are short and noisy.
const MIN_BLOCK_LEN: usize = 10;

/// Interruption detail excerpts are truncated to this many characters.
const DETAIL_MAX_LEN: usize = 200;

pub const UNKNOWN_PERIOD: &str = "Unknown period";

/// Textual patterns for the announced interruption window, tried in
/// order; the first match wins. Best effort only, the page wording
/// changes without notice.
fn period_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            // 12.03.2025, 12/03/2025, 12-03-2025
            r"\d{1,2}\s*[\./-]\s*\d{1,2}\s*[\./-]\s*\d{4}",
            // 12 martie 2025
            r"\d{1,2}\s*[a-zA-Z]+\s*\d{4}",
            // 12-14 martie
            r"\d{1,2}\s*[-–]\s*\d{1,2}\s*[a-zA-Z]+",
            // 10:00-14:00
            r"[0-9]{1,2}:[0-9]{2}\s*[-–]\s*[0-9]{1,2}:[0-9]{2}",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("period pattern"))
        .collect()
    })
}

/// Outcome of one polling cycle for one service of one location.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceOutcome {
    pub status: ServiceStatus,
    pub period: Option<String>,
    pub detail: Option<String>,
}

impl ServiceOutcome {
    pub fn normal() -> Self {
        Self {
            status: ServiceStatus::Normal,
            period: None,
            detail: None,
        }
    }

    pub fn failed(status: ServiceStatus) -> Self {
        Self {
            status,
            period: None,
            detail: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageAssessment {
    pub water: ServiceOutcome,
    pub heat: ServiceOutcome,
}

impl PageAssessment {
    pub fn all_normal() -> Self {
        Self {
            water: ServiceOutcome::normal(),
            heat: ServiceOutcome::normal(),
        }
    }

    pub fn all_failed(status: ServiceStatus) -> Self {
        Self {
            water: ServiceOutcome::failed(status),
            heat: ServiceOutcome::failed(status),
        }
    }

    pub fn outcome(&self, service: ServiceType) -> &ServiceOutcome {
        match service {
            ServiceType::Water => &self.water,
            ServiceType::Heat => &self.heat,
        }
    }
}

/// Checks the fetched page text for one configured street: street absent
/// means both services run normally; street present means each service is
/// interrupted exactly when one of its keywords shares a text block with
/// the street name.
pub fn assess(html: &str, street: &str) -> PageAssessment {
    let blocks = visible_text_blocks(html);
    let street_lower = street.trim().to_lowercase();

    let matching: Vec<&str> = blocks
        .iter()
        .map(String::as_str)
        .filter(|b| b.chars().count() > MIN_BLOCK_LEN && b.to_lowercase().contains(&street_lower))
        .collect();

    if matching.is_empty() {
        return PageAssessment::all_normal();
    }

    PageAssessment {
        water: assess_service(&matching, ServiceType::Water),
        heat: assess_service(&matching, ServiceType::Heat),
    }
}

fn assess_service(blocks: &[&str], service: ServiceType) -> ServiceOutcome {
    for block in blocks {
        let lower = block.to_lowercase();
        if service.keywords().iter().any(|k| lower.contains(k)) {
            return ServiceOutcome {
                status: ServiceStatus::Interrupted,
                period: Some(
                    extract_period(block).unwrap_or_else(|| UNKNOWN_PERIOD.to_string()),
                ),
                detail: Some(truncate(block, DETAIL_MAX_LEN)),
            };
        }
    }
    ServiceOutcome::normal()
}

/// First matching period pattern, or None.
pub fn extract_period(text: &str) -> Option<String> {
    period_patterns()
        .iter()
        .find_map(|p| p.find(text))
        .map(|m| m.as_str().to_string())
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Strips the page down to its visible text, one string per block-level
/// element. Script and style contents are dropped, common entities
/// decoded, whitespace collapsed.
pub fn visible_text_blocks(html: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current = String::new();
    let mut rest = html;

    while let Some(open) = rest.find('<') {
        push_text(&mut current, &rest[..open]);
        rest = &rest[open..];

        let Some(close) = rest.find('>') else { break };
        let tag = &rest[1..close];
        let name = tag_name(tag).to_ascii_lowercase();
        rest = &rest[close + 1..];

        if name == "script" || name == "style" {
            rest = skip_to_closing(rest, &name);
        } else if is_block_tag(&name) {
            flush_block(&mut blocks, &mut current);
        } else {
            // Inline tag boundary still separates words.
            if !current.ends_with(' ') && !current.is_empty() {
                current.push(' ');
            }
        }
    }
    push_text(&mut current, rest);
    flush_block(&mut blocks, &mut current);
    blocks
}

fn tag_name(tag: &str) -> &str {
    let tag = tag.strip_prefix('/').unwrap_or(tag);
    let end = tag
        .find(|c: char| c.is_whitespace() || c == '/' || c == '>')
        .unwrap_or(tag.len());
    &tag[..end]
}

fn is_block_tag(name: &str) -> bool {
    matches!(
        name,
        "p" | "div"
            | "br"
            | "li"
            | "ul"
            | "ol"
            | "tr"
            | "td"
            | "th"
            | "table"
            | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "section"
            | "article"
            | "header"
            | "footer"
    )
}

fn skip_to_closing<'a>(rest: &'a str, name: &str) -> &'a str {
    let lower = rest.to_ascii_lowercase();
    let closing = format!("</{name}");
    match lower.find(&closing) {
        Some(pos) => {
            let after = &rest[pos..];
            match after.find('>') {
                Some(end) => &after[end + 1..],
                None => "",
            }
        }
        None => "",
    }
}

fn push_text(current: &mut String, raw: &str) {
    for word in decode_entities(raw).split_whitespace() {
        if !current.is_empty() && !current.ends_with(' ') {
            current.push(' ');
        }
        current.push_str(word);
    }
}

fn flush_block(blocks: &mut Vec<String>, current: &mut String) {
    let block = std::mem::take(current);
    let trimmed = block.trim_end();
    if !trimmed.is_empty() {
        blocks.push(trimmed.to_string());
    }
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let semi = match rest.find(';') {
            Some(semi) if semi <= 10 => semi,
            _ => {
                out.push('&');
                rest = &rest[1..];
                continue;
            }
        };
        let entity = &rest[1..semi];
        match entity {
            "nbsp" => out.push(' '),
            "amp" => out.push('&'),
            "lt" => out.push('<'),
            "gt" => out.push('>'),
            "quot" => out.push('"'),
            "#39" | "apos" => out.push('\''),
            _ => {
                let decoded = entity
                    .strip_prefix('#')
                    .and_then(|n| n.parse::<u32>().ok())
                    .and_then(char::from_u32);
                match decoded {
                    Some(c) => out.push(c),
                    None => {
                        out.push('&');
                        rest = &rest[1..];
                        continue;
                    }
                }
            }
        }
        rest = &rest[semi + 1..];
    }
    out.push_str(rest);
    out
}
