//! Text and JSON rendering of command output.

use clap::ValueEnum;
use serde::Serialize;
use vocabuloid_core::model::Tenses;
use vocabuloid_core::{AuthorizationState, Flashcards, ListKind, Messages, VocabularyList};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Serialize)]
struct ListRow<'a> {
    id: u64,
    name: Option<&'a str>,
    kind: Option<ListKind>,
    size: Option<u64>,
}

#[derive(Debug, Serialize)]
struct TenseRow<'a> {
    id: u64,
    name: &'a str,
}

#[derive(Debug, Serialize)]
struct Status {
    state: AuthorizationState,
    online: bool,
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
}

fn kind_label(kind: Option<ListKind>) -> &'static str {
    match kind {
        Some(ListKind::PlainList) => "vocabulary",
        Some(ListKind::VerbList) => "verbs",
        None => "unknown",
    }
}

pub fn lists(lists: &[VocabularyList], format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => {
            let rows: Vec<ListRow<'_>> = lists
                .iter()
                .map(|list| ListRow {
                    id: list.id(),
                    name: list.name(),
                    kind: list.kind(),
                    size: list.size(),
                })
                .collect();
            to_json(&rows)
        }
        OutputFormat::Text => lists
            .iter()
            .map(|list| {
                let size = list.size().map(|s| format!(" ({} words)", s)).unwrap_or_default();
                format!(
                    "{:>6}  {:<10} {}{}",
                    list.id(),
                    kind_label(list.kind()),
                    list.name().unwrap_or("-"),
                    size
                )
            })
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

pub fn tenses(tenses: &Tenses, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => {
            let rows: Vec<TenseRow<'_>> = tenses
                .iter()
                .map(|(id, name)| TenseRow { id: *id, name })
                .collect();
            to_json(&rows)
        }
        OutputFormat::Text => tenses
            .iter()
            .map(|(id, name)| format!("{:>4}  {}", id, name))
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

pub fn flashcards(cards: &Flashcards, messages: &Messages, format: OutputFormat) -> String {
    if format == OutputFormat::Json {
        return to_json(cards);
    }

    let mut out = format!("{} | {}\n", cards.heading_from, cards.heading_to);
    if cards.is_empty() {
        out.push_str(&messages.no_vocabularies);
        return out;
    }

    let blocks: Vec<String> = cards
        .cards
        .iter()
        .map(|card| {
            let back = card.back.lines().collect::<Vec<_>>().join("\n    ");
            format!("{}\n    {}", card.front, back)
        })
        .collect();
    out.push_str(&blocks.join("\n\n"));
    out
}

pub fn status(state: AuthorizationState, online: bool, messages: &Messages, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => to_json(&Status { state, online }),
        OutputFormat::Text => {
            let network = if online { "online" } else { messages.offline.as_str() };
            format!("{}\n{}", state, network)
        }
    }
}
