//! Vocabulary lists.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use super::payload::{object_field, opt_array_field, opt_object_field, opt_str_field, str_field, u64_field};
use super::resolve::{ListKind, Selector, classify, unwrap_if_wrapped, unwrap_single};
use super::slot::{LazySlot, SlotState};
use super::vocabulary::Vocabulary;
use super::{Language, ModelError, paths};
use crate::config::Messages;
use crate::transport::{JsonObject, Transport};

/// Supported tenses of a verb list, keyed by tense id.
pub type Tenses = BTreeMap<u64, String>;

/// Values delivered with the owner's list collection, before the body loads.
#[derive(Debug, Clone, Default)]
struct ListSummary {
    kind: Option<ListKind>,
    name: Option<String>,
    size: Option<u64>,
    source_language: Option<Language>,
}

/// The fully loaded contents of a list.
#[derive(Debug)]
pub struct ListBody {
    pub kind: ListKind,
    pub name: String,
    pub size: u64,
    pub source_language: Language,
    /// Present on plain lists only.
    pub target_language: Option<Language>,
    pub items: Vec<Vocabulary>,
}

impl ListBody {
    fn from_payload(
        kind: ListKind,
        payload: &JsonObject,
        transport: &Arc<dyn Transport>,
    ) -> Result<Self, ModelError> {
        let source_language = Language::from_payload(object_field(payload, "language_from")?)?;
        let target_language = opt_object_field(payload, "language_to")
            .map(Language::from_payload)
            .transpose()?;

        let items = opt_array_field(payload, "vocabularies")?
            .map(|items| {
                items
                    .iter()
                    .map(|item| {
                        Vocabulary::from_list_item(item, kind, &source_language, Arc::clone(transport))
                    })
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?
            .unwrap_or_default();

        let size = match payload.get("size") {
            Some(Value::Null) | None => items.len() as u64,
            Some(_) => u64_field(payload, "size")?,
        };

        Ok(Self {
            kind,
            name: str_field(payload, "name")?.to_string(),
            size,
            source_language,
            target_language,
            items,
        })
    }
}

fn parse_tense(value: &Value) -> Result<(u64, String), ModelError> {
    let tense = unwrap_if_wrapped(value, "name")?;
    Ok((u64_field(tense, "id")?, str_field(tense, "name")?.to_string()))
}

/// A vocabulary list owned by a user.
///
/// The id is known up front. Name, size and source language are available
/// from the owner's list collection when the list came from there; the body
/// fetched from `/lists/{id}.json` supersedes them once loaded.
pub struct VocabularyList {
    id: u64,
    summary: ListSummary,
    body: LazySlot<ListBody>,
    tenses: LazySlot<Tenses>,
    selected_tense: Mutex<Option<u64>>,
    transport: Arc<dyn Transport>,
}

impl VocabularyList {
    /// A list known only by id. Everything else is fetched on first read.
    pub fn new(id: u64, transport: Arc<dyn Transport>) -> Self {
        Self::with_summary(id, ListSummary::default(), transport)
    }

    fn with_summary(id: u64, summary: ListSummary, transport: Arc<dyn Transport>) -> Self {
        Self {
            id,
            summary,
            body: LazySlot::new(),
            tenses: LazySlot::new(),
            selected_tense: Mutex::new(None),
            transport,
        }
    }

    /// Build a list from one element of `/users/{id}/lists.json`.
    ///
    /// Verb lists with a known source language have their tenses requested
    /// right away.
    pub(crate) async fn from_summary(
        value: &Value,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, ModelError> {
        let (kind, payload) = classify(value)?;
        let summary = ListSummary {
            kind: Some(kind),
            name: opt_str_field(payload, "name").map(str::to_string),
            size: payload.get("size").and_then(Value::as_u64),
            source_language: opt_object_field(payload, "language_from")
                .map(Language::from_payload)
                .transpose()?,
        };

        let list = Self::with_summary(u64_field(payload, "id")?, summary, transport);
        if let (ListKind::VerbList, Some(language)) = (kind, list.summary.source_language.clone()) {
            list.prefetch_tenses(language.id).await;
        }
        Ok(list)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Known once either the summary or the body has been seen.
    pub fn kind(&self) -> Option<ListKind> {
        match self.body.get() {
            Some(body) => Some(body.kind),
            None => self.summary.kind,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self.body.get() {
            Some(body) => Some(&body.name),
            None => self.summary.name.as_deref(),
        }
    }

    pub fn size(&self) -> Option<u64> {
        match self.body.get() {
            Some(body) => Some(body.size),
            None => self.summary.size,
        }
    }

    pub fn source_language(&self) -> Option<&Language> {
        match self.body.get() {
            Some(body) => Some(&body.source_language),
            None => self.summary.source_language.as_ref(),
        }
    }

    /// Only known after the body has loaded, and only for plain lists.
    pub fn target_language(&self) -> Option<&Language> {
        self.body.get().and_then(|body| body.target_language.as_ref())
    }

    pub fn body_state(&self) -> SlotState {
        self.body.state()
    }

    pub fn tenses_state(&self) -> SlotState {
        self.tenses.state()
    }

    /// Load the list body.
    pub async fn load(&self) -> Result<Option<&ListBody>, ModelError> {
        self.body
            .get_or_load(|| async {
                tracing::debug!("Fetching body of list {}", self.id);
                let Some(wrapper) = self.transport.fetch_object(&paths::list(self.id)).await? else {
                    return Ok(None);
                };

                let (key, payload) = unwrap_single(&wrapper)?;
                let kind = ListKind::from_key(key);
                let body = ListBody::from_payload(kind, payload, &self.transport)?;

                if kind.is_verb_list() {
                    self.prefetch_tenses(body.source_language.id).await;
                }
                Ok(Some(body))
            })
            .await
    }

    /// The list's vocabulary items, loading the body if needed.
    pub async fn items(&self) -> Result<Option<&[Vocabulary]>, ModelError> {
        Ok(self.load().await?.map(|body| body.items.as_slice()))
    }

    /// Tenses the list's source language supports. Verb lists only.
    pub async fn supported_tenses(&self) -> Result<Option<&Tenses>, ModelError> {
        if let Some(tenses) = self.tenses.get() {
            return Ok(Some(tenses));
        }

        let (kind, language_id) = match (self.kind(), self.source_language()) {
            (Some(kind), Some(language)) => (kind, language.id),
            _ => match self.load().await? {
                Some(body) => (body.kind, body.source_language.id),
                None => return Ok(None),
            },
        };

        if kind != ListKind::VerbList {
            return Err(ModelError::KindMismatch {
                expected: ListKind::VerbList,
            });
        }
        self.load_tenses(language_id).await
    }

    async fn load_tenses(&self, language_id: u64) -> Result<Option<&Tenses>, ModelError> {
        self.tenses
            .get_or_load(|| async {
                tracing::debug!("Fetching tenses for language {}", language_id);
                match self.transport.fetch_collection(&paths::tenses(language_id)).await? {
                    Some(items) => items
                        .iter()
                        .map(parse_tense)
                        .collect::<Result<Tenses, _>>()
                        .map(Some),
                    None => Ok(None),
                }
            })
            .await
    }

    /// Tenses are wanted as soon as a verb list is recognized. A failure here
    /// leaves the slot unloaded and is reported by the next explicit read.
    async fn prefetch_tenses(&self, language_id: u64) {
        if let Err(e) = self.load_tenses(language_id).await {
            tracing::warn!("Could not fetch tenses for list {}: {}", self.id, e);
        }
    }

    pub fn select_tense(&self, tense_id: u64) {
        *self.selected_tense.lock() = Some(tense_id);
    }

    pub fn selected_tense(&self) -> Option<u64> {
        *self.selected_tense.lock()
    }

    /// What item collections are projected through for display.
    pub async fn selector(&self) -> Result<Option<Selector>, ModelError> {
        let Some(body) = self.load().await? else {
            return Ok(None);
        };

        match body.kind {
            ListKind::PlainList => body
                .target_language
                .as_ref()
                .map(|language| Some(Selector::TargetLanguage(language.id)))
                .ok_or(ModelError::MissingTargetLanguage { list_id: self.id }),
            ListKind::VerbList => self
                .selected_tense()
                .map(|tense| Some(Selector::Tense(tense)))
                .ok_or(ModelError::NoTenseSelected { list_id: self.id }),
        }
    }

    /// The two column headings of a flashcard view.
    pub async fn headings(&self, messages: &Messages) -> Result<Option<(String, String)>, ModelError> {
        let Some(body) = self.load().await? else {
            return Ok(None);
        };

        match body.kind {
            ListKind::PlainList => {
                let target = body
                    .target_language
                    .as_ref()
                    .ok_or(ModelError::MissingTargetLanguage { list_id: self.id })?;
                Ok(Some((body.source_language.name.clone(), target.name.clone())))
            }
            ListKind::VerbList => {
                let tense_id = self
                    .selected_tense()
                    .ok_or(ModelError::NoTenseSelected { list_id: self.id })?;
                let name = self
                    .supported_tenses()
                    .await?
                    .and_then(|tenses| tenses.get(&tense_id))
                    .ok_or(ModelError::UnknownTense {
                        list_id: self.id,
                        tense_id,
                    })?;
                Ok(Some((messages.infinitive.clone(), name.clone())))
            }
        }
    }
}

impl std::fmt::Debug for VocabularyList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VocabularyList")
            .field("id", &self.id)
            .field("kind", &self.kind())
            .field("name", &self.name())
            .field("size", &self.size())
            .field("body", &self.body.state())
            .field("tenses", &self.tenses)
            .field("selected_tense", &self.selected_tense())
            .finish()
    }
}
