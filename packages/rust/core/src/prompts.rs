//! Prompt templates for generation and enrichment.

use dailyvocab_shared::{RunConfig, VocabularyItem};

/// Fields every generated item must carry, in schema order.
pub const ITEM_FIELDS: [&str; 6] = [
    "word",
    "translation",
    "category",
    "level",
    "example_source",
    "example_target",
];

/// Ask for `needed` new words, steering away from `exclusions`.
pub fn generation_prompt(config: &RunConfig, needed: usize, exclusions: &[String]) -> String {
    let source = &config.source_language;
    let target = &config.target_language;
    let band = config.level_band();
    let levels = config.levels.join(", ");

    let exclude_hint = if exclusions.is_empty() {
        String::new()
    } else {
        format!("Do NOT use any of these words: {}.\n", exclusions.join(", "))
    };

    format!(
        "Generate {needed} random {source} vocabulary words suitable for daily learning \
         at levels {band}.\n\
         {exclude_hint}\
         For each word, provide:\n\
         1. The {source} word\n\
         2. The {target} translation\n\
         3. A category (e.g. noun, verb, adjective, daily life, food, nature)\n\
         4. The level (one of {levels})\n\
         5. A simple example sentence in {source} with its {target} translation\n\
         \n\
         Respond with a JSON array of objects with exactly these keys: {fields}.\n\
         Make the words varied and useful for beginner to intermediate learners.",
        fields = ITEM_FIELDS.join(", "),
    )
}

/// Ask for an 8-second illustrated scene that uses the word in speech.
pub fn video_prompt(config: &RunConfig, item: &VocabularyItem) -> String {
    let source = &config.source_language;
    format!(
        "You are a creative short-form video scriptwriter. Write a video generation prompt \
         for the {source} word of the day.\n\
         Create a simple scene illustrating the word \"{word}\", which means \"{translation}\".\n\
         Characters speak clear, grammatically correct {source}.\n\
         \n\
         The scene shows a common daily-life situation that is easy to illustrate. \
         The conversation sounds natural and starts in the very first second. \
         The word appears once in the dialogue and is not repeated.\n\
         \n\
         Strictly no text or subtitles in the video.\n\
         \n\
         Include these details in your response:\n\
         Scene duration: 8 seconds\n\
         \n\
         Illustration style: warm, modern flat-vector illustration with soft pastel colors, \
         clean lines, and simple but expressive faces, like an educational flashcard or a \
         language-learning app. Playful yet clear, conveying both the action and the meaning.\n\
         \n\
         Audio: characters say their lines exactly as in the scene description, matching \
         their actions, in a natural native {source} accent.",
        word = item.word,
        translation = item.translation,
    )
}

/// Ask for a plain-text social caption for the word's video.
pub fn caption_prompt(config: &RunConfig, item: &VocabularyItem) -> String {
    let source = &config.source_language;
    let target = &config.target_language;
    let first_level = config.levels.first().map(String::as_str).unwrap_or("A1");
    let tag = source.replace(' ', "");

    format!(
        "You are a short-form video content strategist.\n\
         Write a short, engaging caption for a video teaching the {source} word \"{word}\" \
         (meaning \"{translation}\"). The audience is {first_level}-{level} {source} learners.\n\
         \n\
         Do not use JSON formatting. Reply with the raw caption text only, following this layout:\n\
         \n\
         ✨ {source} Word of the Day ✨\n\
         \n\
         📖 <word> (<part of speech>) → <{target} meaning>\n\
         \n\
         💬 Example:\n\
         [{source}]: \"<example sentence>\"\n\
         [{target}]: \"<translation>\"\n\
         \n\
         🔎 Quick Tip\n\
         <one short tip>\n\
         \n\
         🎭 <a question inviting viewers to comment>\n\
         \n\
         📌 #{tag}WordOfTheDay #Learn{tag} #LanguageLearning #{word_tag}\n\
         \n\
         Keep the Quick Tip fresh: vary between grammar endings, synonyms, related words, \
         cultural notes, and fun facts.",
        word = item.word,
        translation = item.translation,
        level = item.level,
        word_tag = item.word.replace(' ', ""),
    )
}
