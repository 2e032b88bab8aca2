//! Player name sanitization.
//!
//! Names are free text but must never carry active markup into storage.
//! The input is parsed as an HTML fragment and only its text content is
//! kept; script-like elements are dropped together with their contents.

use scraper::{ElementRef, Html};

/// Elements whose contents are discarded entirely.
const SKIP_TAGS: &[&str] = &[
    "script", "style", "noscript", "svg", "iframe", "object", "embed", "template",
];

/// Upper bound on strip passes; each pass decodes one layer of entity encoding.
const MAX_PASSES: usize = 8;

/// Strip markup from a player name and collapse whitespace.
///
/// Entity references are decoded by the parser (`&amp;` becomes `&`), so
/// stripping repeats until the text stops changing: `&lt;b&gt;` decodes to
/// `<b>` and is stripped on the next pass. Any `<` or `>` still present
/// afterwards is removed.
/// Returns an empty string when nothing but markup was given.
pub fn sanitize_name(raw: &str) -> String {
    let mut current = collapse_whitespace(raw);
    for _ in 0..MAX_PASSES {
        let next = strip_markup(&current);
        if next == current {
            break;
        }
        current = next;
    }

    collapse_whitespace(&current.replace(|c: char| c == '<' || c == '>', " "))
}

/// One pass: parse as an HTML fragment and keep the text content.
fn strip_markup(input: &str) -> String {
    if !input.contains(|c: char| c == '<' || c == '&') {
        return input.to_string();
    }

    let fragment = Html::parse_fragment(input);
    let mut text = String::with_capacity(input.len());
    extract_text_recursive(&fragment.root_element(), &mut text);
    collapse_whitespace(&text)
}

fn extract_text_recursive(element: &ElementRef, text: &mut String) {
    for child in element.children() {
        match child.value() {
            scraper::node::Node::Text(t) => text.push_str(&t.text),
            scraper::node::Node::Element(el) => {
                if SKIP_TAGS.contains(&el.name()) {
                    continue;
                }
                if el.name() == "br" {
                    text.push(' ');
                }
                if let Some(child_ref) = ElementRef::wrap(child) {
                    extract_text_recursive(&child_ref, text);
                }
            }
            _ => {}
        }
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
