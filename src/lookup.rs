//! Query resolution: exact match, translation direction, example sentence, and
//! substring suggestions when nothing matches.

use crate::error::AppError;
use crate::store::{Suggestion, WordPair, WordStore};
use crate::Lang;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::Serialize;

/// Maximum number of "did you mean" suggestions.
pub const SUGGESTION_LIMIT: usize = 6;

/// Shown when a matched word has no example sentence in any language.
pub const NO_EXAMPLE_PLACEHOLDER: &str = "Örnek cümle bulunamadı.";

/// Letters that only occur in Turkish spelling. `ı` and `İ` have no case
/// partner in this set because their ASCII partners are shared with English.
const TURKISH_LETTERS: &[char] = &[
    'ç', 'Ç', 'ğ', 'Ğ', 'ı', 'ö', 'Ö', 'ş', 'Ş', 'ü', 'Ü', 'İ',
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LookupOutcome {
    EmptyQuery,
    NoMatch {
        display_query: String,
        suggestions: Vec<Suggestion>,
    },
    Matched(Translation),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Translation {
    /// The trimmed query as typed, case preserved.
    pub display_query: String,
    pub input_lang: Lang,
    pub tr: String,
    pub en: String,
    pub translation: String,
    pub example: String,
}

/// Resolves raw queries against an injected [`WordStore`].
#[derive(Clone)]
pub struct Resolver<S> {
    store: S,
}

impl<S: WordStore> Resolver<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn resolve(&self, raw_query: &str) -> Result<LookupOutcome, AppError> {
        self.resolve_with_rng(raw_query, &mut rand::thread_rng())
    }

    /// Same as [`Resolver::resolve`] with a caller-supplied RNG for example selection.
    pub fn resolve_with_rng<R: Rng + ?Sized>(
        &self,
        raw_query: &str,
        rng: &mut R,
    ) -> Result<LookupOutcome, AppError> {
        let display_query = raw_query.trim();
        if display_query.is_empty() {
            return Ok(LookupOutcome::EmptyQuery);
        }
        let normalized = display_query.to_lowercase();

        let Some(word) = self.store.find_exact(&normalized)? else {
            let suggestions = self
                .store
                .find_containing(&normalized, SUGGESTION_LIMIT)?;
            return Ok(LookupOutcome::NoMatch {
                display_query: display_query.to_string(),
                suggestions,
            });
        };

        let input_lang = input_language(&word, &normalized, display_query);
        let translation = match input_lang {
            Lang::Tr => word.en.clone(),
            Lang::En => word.tr.clone(),
        };
        let example = self.pick_example(word.id, input_lang, rng)?;

        Ok(LookupOutcome::Matched(Translation {
            display_query: display_query.to_string(),
            input_lang,
            tr: word.tr,
            en: word.en,
            translation,
            example,
        }))
    }

    fn pick_example<R: Rng + ?Sized>(
        &self,
        word_id: i64,
        lang: Lang,
        rng: &mut R,
    ) -> Result<String, AppError> {
        let mut candidates = self.store.example_sentences(word_id, Some(lang))?;
        if candidates.is_empty() {
            candidates = self.store.example_sentences(word_id, None)?;
        }
        Ok(candidates
            .choose(rng)
            .cloned()
            .unwrap_or_else(|| NO_EXAMPLE_PLACEHOLDER.to_string()))
    }
}

/// Stored-field equality decides first; the letter heuristic only runs when
/// neither field equals the normalized query.
fn input_language(word: &WordPair, normalized: &str, display_query: &str) -> Lang {
    if word.tr.to_lowercase() == normalized {
        Lang::Tr
    } else if word.en.to_lowercase() == normalized {
        Lang::En
    } else {
        detect_lang(display_query)
    }
}

/// Classifies text as Turkish when it contains a Turkish-only letter.
pub fn detect_lang(text: &str) -> Lang {
    if text.chars().any(|ch| TURKISH_LETTERS.contains(&ch)) {
        Lang::Tr
    } else {
        Lang::En
    }
}
