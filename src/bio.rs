// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Profile bio renderer.
//!
//! Renders a small markdown-like subset to HTML:
//!
//! - `#`, `##`, `###` headings
//! - `>` quotes
//! - `-` / `*` bullet lists and `1.` numbered lists
//! - paragraphs separated by blank lines, single newlines kept as `<br>`
//! - `**bold**`, `*italic*` and `[label](url)` inline
//!
//! All text is escaped. Links are only emitted for http, https and mailto
//! targets; anything else renders as its label.

use html_escape::{encode_double_quoted_attribute, encode_text};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    Paragraph,
    Quote,
    Bullets,
    Numbered,
}

#[derive(Debug)]
struct Block {
    kind: BlockKind,
    lines: Vec<String>,
}

impl Block {
    fn finish(self) -> String {
        match self.kind {
            BlockKind::Paragraph => format!("<p>{}</p>", self.lines.join("<br>")),
            BlockKind::Quote => format!("<blockquote>{}</blockquote>", self.lines.join("<br>")),
            BlockKind::Bullets => format!("<ul>{}</ul>", list_items(&self.lines)),
            BlockKind::Numbered => format!("<ol>{}</ol>", list_items(&self.lines)),
        }
    }
}

fn list_items(items: &[String]) -> String {
    items.iter().map(|item| format!("<li>{item}</li>")).collect()
}

/// Render `text` to HTML. Never fails.
pub fn render(text: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut current: Option<Block> = None;

    for line in text.lines() {
        let line = line.trim_end();

        if line.trim().is_empty() {
            if let Some(block) = current.take() {
                out.push(block.finish());
            }
            continue;
        }

        if let Some((level, heading)) = heading(line) {
            if let Some(block) = current.take() {
                out.push(block.finish());
            }
            out.push(format!("<h{level}>{}</h{level}>", render_inline(heading)));
            continue;
        }

        let (kind, content) = classify(line);
        let rendered = render_inline(content);
        match current.as_mut() {
            Some(block) if block.kind == kind => block.lines.push(rendered),
            _ => {
                if let Some(block) = current.take() {
                    out.push(block.finish());
                }
                current = Some(Block {
                    kind,
                    lines: vec![rendered],
                });
            }
        }
    }

    if let Some(block) = current {
        out.push(block.finish());
    }
    out.join("\n")
}

fn heading(line: &str) -> Option<(usize, &str)> {
    let trimmed = line.trim_start();
    let level = trimmed.chars().take_while(|c| *c == '#').count();
    if !(1..=3).contains(&level) {
        return None;
    }
    let rest = trimmed[level..].strip_prefix(' ')?;
    Some((level, rest.trim()))
}

fn classify(line: &str) -> (BlockKind, &str) {
    let trimmed = line.trim_start();

    if let Some(rest) = trimmed.strip_prefix('>') {
        return (BlockKind::Quote, rest.trim());
    }
    if let Some(rest) = trimmed
        .strip_prefix("- ")
        .or_else(|| trimmed.strip_prefix("* "))
    {
        return (BlockKind::Bullets, rest.trim());
    }
    let digits = trimmed.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        if let Some(rest) = trimmed[digits..].strip_prefix(". ") {
            return (BlockKind::Numbered, rest.trim());
        }
    }
    (BlockKind::Paragraph, trimmed)
}

fn render_inline(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix("**") {
            if let Some(end) = after.find("**").filter(|end| *end > 0) {
                out.push_str("<strong>");
                out.push_str(&render_inline(&after[..end]));
                out.push_str("</strong>");
                rest = &after[end + 2..];
                continue;
            }
        } else if let Some(after) = rest.strip_prefix('*') {
            if let Some(end) = after.find('*').filter(|end| *end > 0) {
                out.push_str("<em>");
                out.push_str(&render_inline(&after[..end]));
                out.push_str("</em>");
                rest = &after[end + 1..];
                continue;
            }
        } else if rest.starts_with('[') {
            if let Some(link) = parse_link(rest) {
                out.push_str(&link.html);
                rest = &rest[link.consumed..];
                continue;
            }
        }

        let plain = rest
            .char_indices()
            .skip(1)
            .find(|(_, c)| *c == '*' || *c == '[')
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        out.push_str(&encode_text(&rest[..plain]));
        rest = &rest[plain..];
    }
    out
}

struct Link {
    html: String,
    consumed: usize,
}

fn parse_link(text: &str) -> Option<Link> {
    let label_end = text.find("](")?;
    let label = &text[1..label_end];
    if label.is_empty() || label.contains('[') {
        return None;
    }
    let after = &text[label_end + 2..];
    let target_end = after.find(')')?;
    let target = after[..target_end].trim();
    let consumed = label_end + 2 + target_end + 1;

    let label_html = render_inline(label);
    let html = if is_safe_target(target) {
        format!(
            "<a href=\"{}\" rel=\"nofollow noopener noreferrer\" target=\"_blank\">{}</a>",
            encode_double_quoted_attribute(target),
            label_html
        )
    } else {
        label_html
    };
    Some(Link { html, consumed })
}

fn is_safe_target(target: &str) -> bool {
    let lower = target.to_ascii_lowercase();
    if let Some(address) = lower.strip_prefix("mailto:") {
        return address.contains('@') && !address.contains(char::is_whitespace);
    }
    crate::embed::parse_strict(target).is_some()
}
