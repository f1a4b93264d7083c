//! Active language context
//!
//! Progress can be computed "as if" editing in a given language. The
//! language is passed explicitly through the calculation; the shared context
//! is only switched for collaborators that read it, and [`LanguageGuard`]
//! restores the previous value on every exit path.

use parking_lot::RwLock;
use qa_model::Language;
use std::sync::Arc;

/// Read and switch the active language
pub trait LanguageContext: Send + Sync {
    /// Currently active language
    fn current(&self) -> Language;

    /// Switch active language
    fn set(&self, language: Language);
}

/// Process-local language context
#[derive(Debug, Clone)]
pub struct SharedLanguage {
    inner: Arc<RwLock<Language>>,
}

impl SharedLanguage {
    /// Create context starting at `language`
    #[must_use]
    pub fn new(language: impl Into<Language>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(language.into())),
        }
    }
}

impl LanguageContext for SharedLanguage {
    fn current(&self) -> Language {
        self.inner.read().clone()
    }

    fn set(&self, language: Language) {
        *self.inner.write() = language;
    }
}

/// Switches the context for its lifetime and restores it on drop
#[must_use = "the previous language is restored when the guard is dropped"]
pub struct LanguageGuard<'a> {
    context: &'a dyn LanguageContext,
    previous: Option<Language>,
}

impl<'a> LanguageGuard<'a> {
    /// Switch to `language` if given; `None` leaves the context untouched
    pub fn switch(context: &'a dyn LanguageContext, language: Option<&Language>) -> Self {
        let previous = language.map(|lang| {
            let previous = context.current();
            if &previous != lang {
                tracing::debug!(from = %previous, to = %lang, "switching language");
            }
            context.set(lang.clone());
            previous
        });
        Self { context, previous }
    }
}

impl Drop for LanguageGuard<'_> {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            self.context.set(previous);
        }
    }
}
