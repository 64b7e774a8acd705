use std::collections::HashMap;

use i18n_embed::DesktopLanguageRequester;
use unic_langid::{langid, LanguageIdentifier};

// Simple in-memory translations
#[derive(Default)]
pub struct Translations {
    strings: HashMap<&'static str, &'static str>,
}

impl Translations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &'static str, value: &'static str) {
        self.strings.insert(key, value);
    }

    pub fn lookup(&self, key: &str) -> Option<&'static str> {
        self.strings.get(key).copied()
    }
}

fn fallback_language() -> LanguageIdentifier {
    langid!("en-US")
}

pub struct Localizations {
    translations: HashMap<LanguageIdentifier, Translations>,
    current_lang: LanguageIdentifier,
}

impl Localizations {
    /// Picks the best match for the desktop's preferred languages.
    pub fn new() -> Self {
        let requested = DesktopLanguageRequester::requested_languages();
        Self::with_languages(&requested)
    }

    pub fn with_languages(requested: &[LanguageIdentifier]) -> Self {
        let mut translations = HashMap::new();

        let mut en = Translations::new();
        en.insert("app-title", "YouTube / YouTube Music Downloader");
        en.insert("url-label", "Enter YouTube or YouTube Music URL:");
        en.insert("url-placeholder", "https://www.youtube.com/watch?v=...");
        en.insert("format-label", "Select Output Format:");
        en.insert("change-music-folder", "Change Music Folder");
        en.insert("change-video-folder", "Change Video Folder");
        en.insert("pick-music-title", "Select Music Download Folder");
        en.insert("pick-video-title", "Select Video Download Folder");
        en.insert("download-button", "Download");
        en.insert("cancel-button", "Cancel Download");
        en.insert("log-label", "Log:");
        en.insert("status-ready", "Ready");
        en.insert("status-running", "Downloading...");
        en.insert("status-complete", "Download complete");
        en.insert("status-canceled", "Download canceled");
        en.insert("status-failed", "Download failed");
        en.insert("input-error-title", "Input Error");
        en.insert("format-error-title", "Format Error");
        en.insert("error-no-url", "Please enter a valid YouTube or YouTube Music URL.");
        en.insert("error-format", "Please select a valid output format.");
        translations.insert(fallback_language(), en);

        let mut es = Translations::new();
        es.insert("app-title", "Descargador de YouTube / YouTube Music");
        es.insert("url-label", "Ingrese la URL de YouTube o YouTube Music:");
        es.insert("format-label", "Seleccione el formato de salida:");
        es.insert("change-music-folder", "Cambiar carpeta de música");
        es.insert("change-video-folder", "Cambiar carpeta de videos");
        es.insert("pick-music-title", "Seleccione la carpeta de música");
        es.insert("pick-video-title", "Seleccione la carpeta de videos");
        es.insert("download-button", "Descargar");
        es.insert("cancel-button", "Cancelar descarga");
        es.insert("log-label", "Registro:");
        es.insert("status-ready", "Listo");
        es.insert("status-running", "Descargando...");
        es.insert("status-complete", "Descarga completada");
        es.insert("status-canceled", "Descarga cancelada");
        es.insert("status-failed", "La descarga falló");
        es.insert("input-error-title", "Error de entrada");
        es.insert("format-error-title", "Error de formato");
        es.insert("error-no-url", "Ingrese una URL válida de YouTube o YouTube Music.");
        es.insert("error-format", "Seleccione un formato de salida válido.");
        translations.insert(langid!("es-ES"), es);

        let mut localizer = Self {
            translations,
            current_lang: fallback_language(),
        };
        if let Some(lang) = requested.iter().find(|lang| localizer.supports(lang)) {
            localizer.select(lang);
        }
        localizer
    }

    fn supports(&self, lang: &LanguageIdentifier) -> bool {
        self.translations
            .keys()
            .any(|key| key.language == lang.language)
    }

    pub fn current(&self) -> &LanguageIdentifier {
        &self.current_lang
    }

    pub fn lookup_single_language(&self, key: &str) -> Option<String> {
        self.translations
            .get(&self.current_lang)
            .and_then(|t| t.lookup(key))
            .or_else(|| {
                // English is always complete
                self.translations
                    .get(&fallback_language())
                    .and_then(|t| t.lookup(key))
            })
            .map(str::to_string)
    }

    pub fn text(&self, key: &str, fallback: &str) -> String {
        self.lookup_single_language(key)
            .unwrap_or_else(|| fallback.to_string())
    }

    pub fn select(&mut self, lang: &LanguageIdentifier) {
        if self.translations.contains_key(lang) {
            self.current_lang = lang.clone();
            return;
        }

        // same language, other region
        self.current_lang = self
            .translations
            .keys()
            .find(|key| key.language == lang.language)
            .cloned()
            .unwrap_or_else(fallback_language);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_first_supported_language() {
        let localizer = Localizations::with_languages(&[langid!("fr-FR"), langid!("es-MX")]);
        assert_eq!(localizer.current(), &langid!("es-ES"));
        assert_eq!(
            localizer.lookup_single_language("download-button").as_deref(),
            Some("Descargar")
        );
    }

    #[test]
    fn unsupported_languages_fall_back_to_english() {
        let localizer = Localizations::with_languages(&[langid!("de-DE")]);
        assert_eq!(localizer.current(), &langid!("en-US"));
        assert_eq!(localizer.text("log-label", "?"), "Log:");
    }

    #[test]
    fn missing_keys_use_english_then_fallback() {
        let localizer = Localizations::with_languages(&[langid!("es-ES")]);
        // not translated to Spanish
        assert_eq!(
            localizer.text("url-placeholder", "?"),
            "https://www.youtube.com/watch?v=..."
        );
        assert_eq!(localizer.text("no-such-key", "fallback"), "fallback");
    }
}
