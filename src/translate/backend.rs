//! Translation backend capability

use crate::error::BackendError;

/// An external translator. Implementations are untrusted: any call may fail,
/// and successful responses are still validated by the caller.
pub trait TranslationBackend: Send + Sync {
    /// Stable name, used as part of the translation cache key.
    fn name(&self) -> &str;

    fn translate(&self, text: &str, target_lang: &str) -> Result<String, BackendError>;

    /// One result per input, in input order. Backends with a native batch
    /// endpoint override this to save requests.
    fn translate_batch(
        &self,
        texts: &[String],
        target_lang: &str,
    ) -> Vec<Result<String, BackendError>> {
        texts
            .iter()
            .map(|t| self.translate(t, target_lang))
            .collect()
    }
}

impl<T: TranslationBackend + ?Sized> TranslationBackend for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn translate(&self, text: &str, target_lang: &str) -> Result<String, BackendError> {
        (**self).translate(text, target_lang)
    }

    fn translate_batch(
        &self,
        texts: &[String],
        target_lang: &str,
    ) -> Vec<Result<String, BackendError>> {
        (**self).translate_batch(texts, target_lang)
    }
}
