//! Test doubles shared by the core test modules.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use dailyvocab_shared::{Result, VocabError, VocabularyItem};

use crate::completion::TextCompletion;

/// Completion double. Generation prompts consume scripted replies in order
/// (an exhausted script answers `[]`); enrichment prompts get a canned text.
#[derive(Default)]
pub(crate) struct ScriptedCompletion {
    replies: Mutex<VecDeque<Result<String>>>,
    generation_prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
    enrichment_calls: AtomicUsize,
    fail_enrichment_for: Option<String>,
}

impl ScriptedCompletion {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn reply(self, text: impl Into<String>) -> Self {
        self.replies.lock().unwrap().push_back(Ok(text.into()));
        self
    }

    pub(crate) fn fail(self, message: &str) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(Err(VocabError::Completion(message.into())));
        self
    }

    /// Enrichment prompts mentioning `word` fail.
    pub(crate) fn fail_enrichment_for(mut self, word: &str) -> Self {
        self.fail_enrichment_for = Some(format!("\"{word}\""));
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn enrichment_calls(&self) -> usize {
        self.enrichment_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn generation_prompts(&self) -> Vec<String> {
        self.generation_prompts.lock().unwrap().clone()
    }
}

impl TextCompletion for ScriptedCompletion {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if prompt.contains("JSON array") {
            self.generation_prompts.lock().unwrap().push(prompt.to_string());
            return self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok("[]".into()));
        }

        let n = self.enrichment_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(marker) = &self.fail_enrichment_for {
            if prompt.contains(marker.as_str()) {
                return Err(VocabError::Completion("enrichment unavailable".into()));
            }
        }
        Ok(format!("  enriched text {n}\n"))
    }
}

/// One generated item as the model would send it.
pub(crate) fn item_json(word: &str) -> String {
    serde_json::json!({
        "word": word,
        "translation": format!("{word} (en)"),
        "category": "noun",
        "level": "A1",
        "example_source": format!("Tämä on {word}."),
        "example_target": "This is it.",
    })
    .to_string()
}

/// A reply listing `words`.
pub(crate) fn items_json(words: &[&str]) -> String {
    let items: Vec<String> = words.iter().map(|w| item_json(w)).collect();
    format!("[{}]", items.join(","))
}

/// A fully enriched item.
pub(crate) fn enriched_item(word: &str) -> VocabularyItem {
    VocabularyItem {
        word: word.into(),
        translation: format!("{word} (en)"),
        category: "noun".into(),
        level: "A1".into(),
        example_source: format!("Tämä on {word}."),
        example_target: "This is it.".into(),
        video_prompt: format!("scene for {word}"),
        video_caption: format!("caption for {word}"),
    }
}
