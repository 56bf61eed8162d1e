//! Vocabulary generation loop.
//!
//! Asks the model for the words still missing, filters out anything already
//! known, and retries until the target count is met or the attempt budget is
//! spent. Every failure inside an attempt is recovered locally; the caller
//! always gets whatever was accepted.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, info, instrument, warn};

use dailyvocab_shared::{Batch, Result, RunConfig, VocabError, VocabularyItem};

use crate::completion::TextCompletion;
use crate::dedup::{ExistingKeySet, is_duplicate, normalize};
use crate::pipeline::ProgressReporter;
use crate::prompts;

static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[A-Za-z]*[ \t]*\r?\n?(.*?)```").expect("valid fence pattern")
});

/// Outcome of one generation run.
#[derive(Debug, Clone, Default)]
pub struct GenerationReport {
    /// Accepted items, in acceptance order.
    pub items: Batch,
    /// Target count.
    pub requested: usize,
    /// Attempts made.
    pub attempts: u32,
    /// Attempts whose reply could not be used at all.
    pub failed_attempts: u32,
    /// Items rejected as duplicates.
    pub duplicates_skipped: usize,
    /// Items rejected for lacking a usable word.
    pub malformed_skipped: usize,
}

impl GenerationReport {
    /// How many of the requested words are missing.
    pub fn shortfall(&self) -> usize {
        self.requested.saturating_sub(self.items.len())
    }
}

/// Generate up to `config.target_count` new words.
///
/// Accepted words are added to `existing` as they are accepted.
#[instrument(skip_all, fields(target = config.target_count, known = existing.len()))]
pub async fn generate_vocabulary<C: TextCompletion>(
    config: &RunConfig,
    existing: &mut ExistingKeySet,
    completion: &C,
    progress: &dyn ProgressReporter,
) -> GenerationReport {
    let mut report = GenerationReport {
        requested: config.target_count,
        ..Default::default()
    };

    while report.items.len() < config.target_count && report.attempts < config.max_attempts {
        let needed = config.target_count - report.items.len();
        report.attempts += 1;
        progress.phase(&format!(
            "Generating {needed} words (attempt {}/{})",
            report.attempts, config.max_attempts
        ));

        let prompt =
            prompts::generation_prompt(config, needed, existing.recent(config.exclusion_sample));

        let reply = match completion.complete(&prompt).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(attempt = report.attempts, error = %e, "generation request failed");
                report.failed_attempts += 1;
                continue;
            }
        };

        let candidates = match parse_candidates(&reply) {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(attempt = report.attempts, error = %e, "could not parse generated words");
                report.failed_attempts += 1;
                continue;
            }
        };

        let before = report.items.len();
        for candidate in candidates {
            if report.items.len() == config.target_count {
                debug!("target reached, ignoring extra words");
                break;
            }
            accept(candidate, existing, &mut report);
        }
        info!(
            attempt = report.attempts,
            accepted = report.items.len() - before,
            total = report.items.len(),
            "generation attempt finished"
        );
    }

    if report.shortfall() > 0 {
        warn!(
            generated = report.items.len(),
            requested = report.requested,
            attempts = report.attempts,
            "only generated part of the requested words"
        );
    }

    report
}

fn accept(candidate: Value, existing: &mut ExistingKeySet, report: &mut GenerationReport) {
    let Some(item) = to_item(&candidate) else {
        debug!(%candidate, "skipping item without a word");
        report.malformed_skipped += 1;
        return;
    };

    let key = normalize(&item.word);
    if is_duplicate(&key, existing, &report.items) {
        info!(word = %item.word, "skipping duplicate word");
        report.duplicates_skipped += 1;
        return;
    }

    existing.insert(&key);
    report.items.push(item);
}

/// Pull the JSON payload out of a reply that may be wrapped in code fences.
pub fn strip_code_fences(reply: &str) -> &str {
    match CODE_FENCE.captures(reply).and_then(|caps| caps.get(1)) {
        Some(inner) => inner.as_str().trim(),
        None => reply.trim(),
    }
}

/// Parse a reply into its list of candidate items.
pub fn parse_candidates(reply: &str) -> Result<Vec<Value>> {
    let payload = strip_code_fences(reply);
    let value: Value = serde_json::from_str(payload)
        .map_err(|e| VocabError::parse(format!("reply is not valid JSON: {e}")))?;

    match value {
        Value::Array(items) => Ok(items),
        other => Err(VocabError::parse(format!(
            "expected a JSON array, got {}",
            kind(&other)
        ))),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Build an item from a generated object. `None` if it has no usable word.
fn to_item(candidate: &Value) -> Option<VocabularyItem> {
    let object = candidate.as_object()?;
    let word = object.get("word")?.as_str()?.trim();
    if word.is_empty() {
        return None;
    }

    Some(VocabularyItem {
        word: word.to_string(),
        translation: text_field(object, "translation"),
        category: text_field(object, "category"),
        level: text_field(object, "level"),
        example_source: text_field(object, "example_source"),
        example_target: text_field(object, "example_target"),
        video_prompt: String::new(),
        video_caption: String::new(),
    })
}

/// Scalar field as trimmed text; anything else reads as empty.
fn text_field(object: &Map<String, Value>, key: &str) -> String {
    match object.get(key) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::SilentProgress;
    use crate::testing::{ScriptedCompletion, item_json, items_json};
    use dailyvocab_shared::AppConfig;

    fn config(target: usize) -> RunConfig {
        let mut config = RunConfig::from(&AppConfig::default());
        config.target_count = target;
        config
    }

    fn words(report: &GenerationReport) -> Vec<&str> {
        report.items.iter().map(|i| i.word.as_str()).collect()
    }

    #[test]
    fn strips_json_fence() {
        let reply = "Here you go:\n```json\n[{\"word\":\"talo\"}]\n```\nEnjoy!";
        assert_eq!(strip_code_fences(reply), "[{\"word\":\"talo\"}]");
    }

    #[test]
    fn strips_bare_fence_and_plain_text() {
        assert_eq!(strip_code_fences("```\n[]\n```"), "[]");
        assert_eq!(strip_code_fences("  [1, 2]  "), "[1, 2]");
    }

    #[test]
    fn non_list_is_parse_error() {
        let err = parse_candidates(r#"{"word":"talo"}"#).unwrap_err();
        assert!(err.to_string().contains("expected a JSON array, got an object"));
        assert!(parse_candidates("not json at all").is_err());
    }

    #[test]
    fn to_item_requires_string_word() {
        assert!(to_item(&serde_json::json!({"translation": "house"})).is_none());
        assert!(to_item(&serde_json::json!({"word": "  "})).is_none());
        assert!(to_item(&serde_json::json!({"word": 7})).is_none());
        assert!(to_item(&serde_json::json!("talo")).is_none());

        let item = to_item(&serde_json::json!({"word": " Talo ", "level": 1})).unwrap();
        assert_eq!(item.word, "Talo");
        assert_eq!(item.level, "1");
    }

    #[tokio::test]
    async fn skips_stored_word_and_retries_for_the_rest() {
        let completion = ScriptedCompletion::new()
            .reply(items_json(&["kissa", "talo"]))
            .reply(items_json(&["auto"]));
        let mut existing: ExistingKeySet = ["kissa", "koira"].into_iter().collect();

        let report =
            generate_vocabulary(&config(2), &mut existing, &completion, &SilentProgress).await;

        assert_eq!(words(&report), ["talo", "auto"]);
        assert_eq!(report.attempts, 2);
        assert_eq!(report.duplicates_skipped, 1);
        assert!(completion.generation_prompts()[1].starts_with("Generate 1 random"));
        assert!(existing.contains("talo") && existing.contains("auto"));
    }

    #[tokio::test]
    async fn same_word_twice_in_one_reply_and_across_attempts() {
        let completion = ScriptedCompletion::new()
            .reply(items_json(&["talo", " TALO", "kala"]))
            .reply(items_json(&["Kala", "puu"]));
        let mut existing = ExistingKeySet::new();

        let report =
            generate_vocabulary(&config(3), &mut existing, &completion, &SilentProgress).await;

        assert_eq!(words(&report), ["talo", "kala", "puu"]);
        assert_eq!(report.duplicates_skipped, 2);
        assert_eq!(report.shortfall(), 0);
    }

    #[tokio::test]
    async fn parse_failures_consume_attempts() {
        let completion = ScriptedCompletion::new()
            .reply("I cannot do that")
            .reply(r#"{"word":"talo"}"#)
            .reply(format!("```json\n{}\n```", items_json(&["talo"])));
        let mut existing = ExistingKeySet::new();

        let report =
            generate_vocabulary(&config(1), &mut existing, &completion, &SilentProgress).await;

        assert_eq!(words(&report), ["talo"]);
        assert_eq!(report.attempts, 3);
        assert_eq!(report.failed_attempts, 2);
    }

    #[tokio::test]
    async fn completion_errors_consume_attempts() {
        let completion = ScriptedCompletion::new()
            .fail("timeout")
            .reply(items_json(&["talo"]));
        let mut existing = ExistingKeySet::new();

        let report =
            generate_vocabulary(&config(1), &mut existing, &completion, &SilentProgress).await;

        assert_eq!(words(&report), ["talo"]);
        assert_eq!(report.failed_attempts, 1);
    }

    #[tokio::test]
    async fn budget_exhausted_returns_partial_batch() {
        let completion = ScriptedCompletion::new()
            .reply(items_json(&["talo"]))
            .reply(items_json(&["talo"]))
            .reply(items_json(&["talo"]))
            .reply(items_json(&["talo"]))
            .reply(items_json(&["talo"]))
            .reply(items_json(&["never asked"]));
        let mut existing = ExistingKeySet::new();

        let report =
            generate_vocabulary(&config(3), &mut existing, &completion, &SilentProgress).await;

        assert_eq!(words(&report), ["talo"]);
        assert_eq!(report.attempts, 5);
        assert_eq!(report.shortfall(), 2);
        assert_eq!(completion.calls(), 5);
    }

    #[tokio::test]
    async fn items_without_word_are_skipped() {
        let reply = format!(
            "[{}, {{\"translation\":\"orphan\"}}, 42]",
            item_json("talo")
        );
        let completion = ScriptedCompletion::new().reply(reply);
        let mut existing = ExistingKeySet::new();

        let report =
            generate_vocabulary(&config(1), &mut existing, &completion, &SilentProgress).await;

        assert_eq!(words(&report), ["talo"]);
        assert_eq!(report.malformed_skipped, 0, "target met before the bad items");
    }

    #[tokio::test]
    async fn malformed_items_are_counted() {
        let reply = format!("[{{\"translation\":\"orphan\"}}, 42, {}]", item_json("talo"));
        let completion = ScriptedCompletion::new().reply(reply);
        let mut existing = ExistingKeySet::new();

        let report =
            generate_vocabulary(&config(1), &mut existing, &completion, &SilentProgress).await;

        assert_eq!(words(&report), ["talo"]);
        assert_eq!(report.malformed_skipped, 2);
    }

    #[tokio::test]
    async fn extra_words_beyond_target_are_ignored() {
        let completion = ScriptedCompletion::new().reply(items_json(&["a", "b", "c"]));
        let mut existing = ExistingKeySet::new();

        let report =
            generate_vocabulary(&config(2), &mut existing, &completion, &SilentProgress).await;

        assert_eq!(words(&report), ["a", "b"]);
        assert!(!existing.contains("c"));
    }

    #[tokio::test]
    async fn exclusion_hint_uses_recent_sample() {
        let known: Vec<String> = (0..30).map(|i| format!("sana{i}")).collect();
        let mut existing: ExistingKeySet = known.iter().collect();
        let completion = ScriptedCompletion::new().reply(items_json(&["uusi"]));

        generate_vocabulary(&config(1), &mut existing, &completion, &SilentProgress).await;

        let prompt = &completion.generation_prompts()[0];
        assert!(prompt.contains("sana29"));
        assert!(prompt.contains("sana10"));
        assert!(!prompt.contains("sana9,"));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn variant(word: &str, style: u8) -> String {
            match style % 4 {
                0 => word.to_string(),
                1 => word.to_uppercase(),
                2 => format!("  {word} "),
                _ => format!("\t{}", word.to_uppercase()),
            }
        }

        proptest! {
            #[test]
            fn never_accepts_known_or_repeated_words(
                stored in proptest::collection::vec(0usize..12, 0..6),
                replies in proptest::collection::vec(
                    proptest::collection::vec((0usize..12, any::<u8>()), 0..8),
                    1..6,
                ),
                target in 1usize..8,
            ) {
                let pool: Vec<String> = (0..12).map(|i| format!("sana{i}")).collect();
                let stored_words: Vec<&str> = stored.iter().map(|i| pool[*i].as_str()).collect();

                let mut completion = ScriptedCompletion::new();
                for reply in &replies {
                    let words: Vec<String> =
                        reply.iter().map(|(i, style)| variant(&pool[*i], *style)).collect();
                    let refs: Vec<&str> = words.iter().map(String::as_str).collect();
                    completion = completion.reply(items_json(&refs));
                }

                let mut existing: ExistingKeySet = stored_words.iter().collect();
                let runtime = tokio::runtime::Builder::new_current_thread()
                    .build()
                    .expect("runtime");
                let report = runtime.block_on(generate_vocabulary(
                    &config(target),
                    &mut existing,
                    &completion,
                    &SilentProgress,
                ));

                let keys: Vec<String> = report.items.iter().map(|i| normalize(&i.word)).collect();
                let unique: std::collections::HashSet<&String> = keys.iter().collect();
                prop_assert_eq!(unique.len(), keys.len());
                for key in &keys {
                    prop_assert!(!stored_words.contains(&key.as_str()));
                }
                prop_assert!(report.items.len() <= target);
            }
        }
    }
}
