use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Languages offered by the speech server, each with its ordered voice presets.
///
/// Key order is the order the server sent; the first language is the default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VoiceCatalog {
    languages: IndexMap<String, Vec<String>>,
}

impl VoiceCatalog {
    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.languages.keys().map(String::as_str)
    }

    pub fn voices(&self, language: &str) -> &[String] {
        self.languages
            .get(language)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn contains_language(&self, language: &str) -> bool {
        self.languages.contains_key(language)
    }

    pub fn contains_voice(&self, language: &str, voice: &str) -> bool {
        self.voices(language).iter().any(|preset| preset == voice)
    }

    pub fn first_language(&self) -> Option<&str> {
        self.languages.keys().next().map(String::as_str)
    }

    /// Voice selected whenever `language` becomes the current language.
    pub fn default_voice_for(&self, language: &str) -> Option<&str> {
        self.voices(language).first().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.languages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.languages.len()
    }
}

impl<L, V> FromIterator<(L, Vec<V>)> for VoiceCatalog
where
    L: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (L, Vec<V>)>>(iter: I) -> Self {
        Self {
            languages: iter
                .into_iter()
                .map(|(lang, voices)| (lang.into(), voices.into_iter().map(Into::into).collect()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_server_key_order() {
        let raw = r#"{"zh": ["z1"], "en": ["v1", "v2"], "fr": ["v3"]}"#;
        let catalog: VoiceCatalog = serde_json::from_str(raw).unwrap();
        assert_eq!(catalog.languages().collect::<Vec<_>>(), ["zh", "en", "fr"]);
        assert_eq!(catalog.first_language(), Some("zh"));
    }

    #[test]
    fn default_voice_is_first_preset() {
        let catalog: VoiceCatalog =
            [("en", vec!["v1", "v2"]), ("fr", vec!["v3"]), ("de", vec![])]
                .into_iter()
                .collect();
        assert_eq!(catalog.default_voice_for("en"), Some("v1"));
        assert_eq!(catalog.default_voice_for("fr"), Some("v3"));
        assert_eq!(catalog.default_voice_for("de"), None);
        assert_eq!(catalog.default_voice_for("xx"), None);
    }

    #[test]
    fn voice_membership_is_per_language() {
        let catalog: VoiceCatalog = [("en", vec!["v1"]), ("fr", vec!["v3"])]
            .into_iter()
            .collect();
        assert!(catalog.contains_voice("en", "v1"));
        assert!(!catalog.contains_voice("en", "v3"));
        assert!(!catalog.contains_voice("xx", "v1"));
    }

    #[test]
    fn rejects_non_list_presets() {
        let raw = r#"{"en": "v1"}"#;
        assert!(serde_json::from_str::<VoiceCatalog>(raw).is_err());
    }
}
