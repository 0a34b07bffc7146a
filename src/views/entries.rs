use askama::Template;
use serde_json::Value;

use crate::models::Submission;

pub const NO_ENTRIES_HTML: &str = "<p>No entries found.</p>";
pub const ENTRIES_ERROR_HTML: &str = "<p>Error loading entries.</p>";

/// The fields shown on one entry card.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryCard {
    pub name: String,
    pub age: String,
    pub profession: String,
    pub experience: String,
}

impl EntryCard {
    /// Build a card from a record as returned by `/list`. Missing fields render empty.
    pub fn from_json(entry: &Value) -> Self {
        let text = |field: &str| match entry.get(field) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };

        Self {
            name: text("name"),
            age: text("age"),
            profession: text("profession"),
            experience: text("experience"),
        }
    }
}

impl From<&Submission> for EntryCard {
    fn from(s: &Submission) -> Self {
        Self {
            name: s.name.clone(),
            age: s.age.clone(),
            profession: s.profession.clone(),
            experience: s.experience.clone(),
        }
    }
}

/// What the entries list area shows.
#[derive(Debug, Clone, PartialEq)]
pub enum EntriesView {
    Entries(Vec<EntryCard>),
    Empty,
    Error,
}

#[derive(Template)]
#[template(path = "entries.html")]
struct EntriesTemplate<'a> {
    cards: &'a [EntryCard],
}

impl EntriesView {
    pub fn from_cards(cards: Vec<EntryCard>) -> Self {
        if cards.is_empty() {
            EntriesView::Empty
        } else {
            EntriesView::Entries(cards)
        }
    }

    /// HTML fragment for the entries container. Field values are escaped.
    pub fn render(&self) -> String {
        match self {
            EntriesView::Empty => NO_ENTRIES_HTML.to_string(),
            EntriesView::Error => ENTRIES_ERROR_HTML.to_string(),
            EntriesView::Entries(cards) => EntriesTemplate { cards }
                .render()
                .unwrap_or_else(|e| {
                    tracing::error!("Failed to render entries: {e}");
                    ENTRIES_ERROR_HTML.to_string()
                }),
        }
    }
}
