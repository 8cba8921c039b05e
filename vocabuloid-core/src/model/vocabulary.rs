//! Vocabulary items and their translations.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use super::format::format_list;
use super::payload::{opt_array_field, opt_object_field, opt_str_field, str_field, u64_field};
use super::resolve::{ListKind, Selector, unwrap_if_wrapped};
use super::slot::LazySlot;
use super::{Language, ModelError, paths};
use crate::config::Messages;
use crate::transport::{JsonObject, Transport};

/// Gender value the service uses for "no grammatical gender".
const NO_GENDER: &str = "N/A";

fn display_with_gender(gender: Option<&str>, word: &str) -> String {
    match gender {
        Some(gender) if !gender.is_empty() && gender != NO_GENDER => {
            format!("{} {}", gender, word)
        }
        _ => word.to_string(),
    }
}

fn gender_of(payload: &JsonObject) -> Option<String> {
    opt_str_field(payload, "gender").map(str::to_string)
}

/// A translation of a vocabulary item. Always delivered whole by its parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Translation {
    pub id: u64,
    pub word: String,
    pub gender: Option<String>,
    pub language: Option<Language>,
}

impl Translation {
    pub(crate) fn from_value(value: &Value) -> Result<Self, ModelError> {
        let payload = unwrap_if_wrapped(value, "word")?;
        Ok(Self {
            id: u64_field(payload, "id")?,
            word: str_field(payload, "word")?.to_string(),
            gender: gender_of(payload),
            language: opt_object_field(payload, "language")
                .map(Language::from_payload)
                .transpose()?,
        })
    }

    pub fn display_word(&self) -> String {
        display_with_gender(self.gender.as_deref(), &self.word)
    }
}

/// Parse one conjugation line.
///
/// Elements are either preformatted strings or `{person, verb}` objects, in
/// which case only the part of `person` before the first `/` is kept.
fn conjugation_line(value: &Value) -> Result<String, ModelError> {
    if let Some(line) = value.as_str() {
        return Ok(line.to_string());
    }

    let payload = unwrap_if_wrapped(value, "verb")?;
    let person = str_field(payload, "person")?;
    let person = person.split('/').next().unwrap_or(person);
    Ok(format!("{} - {}", person, str_field(payload, "verb")?))
}

fn parse_all<T>(
    items: &[Value],
    parse: impl Fn(&Value) -> Result<T, ModelError>,
) -> Result<Vec<T>, ModelError> {
    items.iter().map(parse).collect()
}

/// One word in a vocabulary list.
///
/// Plain-list items carry translations; verb-list items carry conjugations.
/// Either collection is loaded at most once. When the list body delivered it
/// inline the slot starts out loaded; otherwise the first read fetches it.
pub struct Vocabulary {
    id: u64,
    word: String,
    gender: Option<String>,
    type_name: Option<String>,
    language: Language,
    kind: ListKind,
    translations: LazySlot<Vec<Translation>>,
    conjugations: LazySlot<Vec<String>>,
    transport: Arc<dyn Transport>,
}

impl Vocabulary {
    /// Build an item from an element of a list body's `vocabularies` array.
    pub(crate) fn from_list_item(
        value: &Value,
        kind: ListKind,
        language: &Language,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, ModelError> {
        let payload = unwrap_if_wrapped(value, "word")?;

        let mut translations = LazySlot::new();
        let mut conjugations = LazySlot::new();
        match kind {
            ListKind::PlainList => {
                if let Some(items) = opt_array_field(payload, "translation")? {
                    translations = LazySlot::loaded(parse_all(items, Translation::from_value)?);
                }
            }
            ListKind::VerbList => {
                if let Some(items) = opt_array_field(payload, "conjugations")? {
                    conjugations = LazySlot::loaded(parse_all(items, conjugation_line)?);
                }
            }
        }

        Ok(Self {
            id: u64_field(payload, "id")?,
            word: str_field(payload, "word")?.to_string(),
            gender: gender_of(payload),
            type_name: opt_str_field(payload, "type").map(str::to_string),
            language: language.clone(),
            kind,
            translations,
            conjugations,
            transport,
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn word(&self) -> &str {
        &self.word
    }

    pub fn gender(&self) -> Option<&str> {
        self.gender.as_deref()
    }

    pub fn type_name(&self) -> Option<&str> {
        self.type_name.as_deref()
    }

    pub fn language(&self) -> &Language {
        &self.language
    }

    /// Kind of the list this item belongs to.
    pub fn kind(&self) -> ListKind {
        self.kind
    }

    /// The word prefixed with its gender, unless the gender is absent or `N/A`.
    pub fn display_word(&self) -> String {
        display_with_gender(self.gender(), &self.word)
    }

    /// Translations into `language_id`.
    ///
    /// The language only matters for the first read; later reads return the
    /// cached translations whatever language they ask for.
    pub async fn translations(&self, language_id: u64) -> Result<Option<&[Translation]>, ModelError> {
        if self.kind != ListKind::PlainList {
            return Err(ModelError::KindMismatch {
                expected: ListKind::PlainList,
            });
        }

        let loaded = self
            .translations
            .get_or_load(|| async {
                let path = paths::translations(self.id, language_id);
                tracing::debug!("Fetching translations for vocabulary {}", self.id);
                match self.transport.fetch_collection(&path).await? {
                    Some(items) => parse_all(&items, Translation::from_value).map(Some),
                    None => Ok(None),
                }
            })
            .await?;

        Ok(loaded.map(Vec::as_slice))
    }

    /// Conjugation lines for `tense_id`.
    ///
    /// Like [`translations`](Self::translations), the tense only matters for
    /// the first read.
    pub async fn conjugations(&self, tense_id: u64) -> Result<Option<&[String]>, ModelError> {
        if self.kind != ListKind::VerbList {
            return Err(ModelError::KindMismatch {
                expected: ListKind::VerbList,
            });
        }

        let loaded = self
            .conjugations
            .get_or_load(|| async {
                let path = paths::conjugations(self.id, tense_id);
                tracing::debug!("Fetching conjugations for vocabulary {}", self.id);
                match self.transport.fetch_collection(&path).await? {
                    Some(items) => parse_all(&items, conjugation_line).map(Some),
                    None => Ok(None),
                }
            })
            .await?;

        Ok(loaded.map(Vec::as_slice))
    }

    /// The back of a flashcard: translations or conjugations, one per line.
    pub async fn formatted(&self, selector: Selector, messages: &Messages) -> Result<String, ModelError> {
        match selector {
            Selector::TargetLanguage(language_id) => {
                let translations = self.translations(language_id).await?;
                Ok(format_list(
                    translations,
                    Translation::display_word,
                    &messages.no_translations,
                ))
            }
            Selector::Tense(tense_id) => {
                let conjugations = self.conjugations(tense_id).await?;
                Ok(format_list(
                    conjugations,
                    |line| line.clone(),
                    &messages.no_conjugations,
                ))
            }
        }
    }

    pub fn translations_loaded(&self) -> bool {
        self.translations.is_loaded()
    }

    pub fn conjugations_loaded(&self) -> bool {
        self.conjugations.is_loaded()
    }
}

impl std::fmt::Debug for Vocabulary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vocabulary")
            .field("id", &self.id)
            .field("word", &self.word)
            .field("gender", &self.gender)
            .field("kind", &self.kind)
            .field("translations", &self.translations)
            .field("conjugations", &self.conjugations)
            .finish_non_exhaustive()
    }
}
