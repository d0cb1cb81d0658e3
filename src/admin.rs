use crate::error::AppError;
use crate::normalize_field;
use crate::store::{Store, StoreError, WordPair};

pub const MISSING_FIELDS_MESSAGE: &str = "TR ve EN alanlarını doldur.";
pub const DUPLICATE_WORD_MESSAGE: &str = "Bu kelime zaten var.";
pub const UNKNOWN_WORD_MESSAGE: &str = "Kelime bulunamadı.";

/// Create/update/delete operations behind the admin screen.
#[derive(Clone)]
pub struct WordAdmin {
    store: Store,
}

impl WordAdmin {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub fn list(&self) -> Result<Vec<WordPair>, AppError> {
        Ok(self.store.list_words()?)
    }

    pub fn get(&self, id: i64) -> Result<WordPair, AppError> {
        self.store
            .get_word(id)?
            .ok_or_else(|| AppError::not_found(UNKNOWN_WORD_MESSAGE))
    }

    pub fn create(&self, tr: &str, en: &str) -> Result<WordPair, AppError> {
        let (tr, en) = validated_pair(tr, en)?;
        let id = self.store.insert_word(&tr, &en).map_err(conflict_or_storage)?;
        Ok(WordPair { id, tr, en })
    }

    pub fn update(&self, id: i64, tr: &str, en: &str) -> Result<WordPair, AppError> {
        let (tr, en) = validated_pair(tr, en)?;
        let changed = self
            .store
            .update_word(id, &tr, &en)
            .map_err(conflict_or_storage)?;
        if changed == 0 {
            return Err(AppError::not_found(UNKNOWN_WORD_MESSAGE));
        }
        Ok(WordPair { id, tr, en })
    }

    /// Removes the word and its examples. Unknown ids are a no-op.
    pub fn delete(&self, id: i64) -> Result<(), AppError> {
        self.store.delete_word(id)?;
        Ok(())
    }
}

fn validated_pair(tr: &str, en: &str) -> Result<(String, String), AppError> {
    let tr = normalize_field(tr);
    let en = normalize_field(en);
    if tr.is_empty() || en.is_empty() {
        return Err(AppError::validation(MISSING_FIELDS_MESSAGE));
    }
    Ok((tr, en))
}

fn conflict_or_storage(err: StoreError) -> AppError {
    match err {
        StoreError::UniqueViolation(_) => AppError::conflict(DUPLICATE_WORD_MESSAGE),
        other => AppError::Storage(other),
    }
}
