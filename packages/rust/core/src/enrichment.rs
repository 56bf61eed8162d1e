//! Per-item enrichment: a video-generation prompt and a social caption.
//!
//! Each item gets two sequential completion calls. A failed call leaves its
//! field empty and is counted; the item itself is always kept.

use tracing::{info, instrument, warn};

use dailyvocab_shared::{RunConfig, VocabularyItem};

use crate::completion::TextCompletion;
use crate::pipeline::ProgressReporter;
use crate::prompts;

/// Counts from one enrichment pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichmentSummary {
    /// Items processed.
    pub items: usize,
    /// Video prompts that could not be generated.
    pub prompt_failures: usize,
    /// Captions that could not be generated.
    pub caption_failures: usize,
}

impl EnrichmentSummary {
    pub fn failures(&self) -> usize {
        self.prompt_failures + self.caption_failures
    }
}

/// Fill `video_prompt` and `video_caption` on every item of `batch`.
#[instrument(skip_all, fields(items = batch.len()))]
pub async fn enrich_batch<C: TextCompletion>(
    config: &RunConfig,
    batch: &mut [VocabularyItem],
    completion: &C,
    progress: &dyn ProgressReporter,
) -> EnrichmentSummary {
    let total = batch.len();
    let mut summary = EnrichmentSummary {
        items: total,
        ..Default::default()
    };

    for (i, item) in batch.iter_mut().enumerate() {
        progress.item(i + 1, total, &format!("Video prompt: {}", item.word));
        match completion.complete(&prompts::video_prompt(config, item)).await {
            Ok(text) => item.video_prompt = text.trim().to_string(),
            Err(e) => {
                warn!(word = %item.word, error = %e, "video prompt generation failed");
                summary.prompt_failures += 1;
            }
        }

        progress.item(i + 1, total, &format!("Caption: {}", item.word));
        match completion.complete(&prompts::caption_prompt(config, item)).await {
            Ok(text) => item.video_caption = text.trim().to_string(),
            Err(e) => {
                warn!(word = %item.word, error = %e, "caption generation failed");
                summary.caption_failures += 1;
            }
        }
    }

    info!(
        items = summary.items,
        failures = summary.failures(),
        "enrichment complete"
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::SilentProgress;
    use crate::testing::ScriptedCompletion;
    use dailyvocab_shared::AppConfig;

    fn bare(word: &str) -> VocabularyItem {
        VocabularyItem {
            word: word.into(),
            translation: "x".into(),
            level: "A1".into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn fills_both_fields_trimmed() {
        let config = RunConfig::from(&AppConfig::default());
        let completion = ScriptedCompletion::new();
        let mut batch = vec![bare("talo"), bare("kala")];

        let summary = enrich_batch(&config, &mut batch, &completion, &SilentProgress).await;

        assert_eq!(summary.failures(), 0);
        assert_eq!(completion.enrichment_calls(), 4);
        assert_eq!(batch[0].video_prompt, "enriched text 1");
        assert_eq!(batch[0].video_caption, "enriched text 2");
        assert_eq!(batch[1].video_prompt, "enriched text 3");
    }

    #[tokio::test]
    async fn failure_keeps_item_with_empty_fields() {
        let config = RunConfig::from(&AppConfig::default());
        let completion = ScriptedCompletion::new().fail_enrichment_for("kala");
        let mut batch = vec![bare("talo"), bare("kala"), bare("puu")];

        let summary = enrich_batch(&config, &mut batch, &completion, &SilentProgress).await;

        assert_eq!(batch.len(), 3);
        assert_eq!(summary.prompt_failures, 1);
        assert_eq!(summary.caption_failures, 1);
        assert!(batch[1].video_prompt.is_empty());
        assert!(batch[1].video_caption.is_empty());
        assert!(!batch[2].video_caption.is_empty(), "later items still enriched");
    }
}
