use std::{
    fs,
    path::{
        Path,
        PathBuf,
    },
};

use serde::{
    de::DeserializeOwned,
    Deserialize,
    Serialize,
};
use tracing::{
    debug,
    info,
    warn,
};

use crate::{
    anki::{
        api::DEFAULT_ANKI_URL,
        VOCAB_NOTE_TYPE,
    },
    core::TangoError,
    routing::DeckSortConfig,
};

const APP_NAME: &str = "tango";
pub const SETTINGS_FILE: &str = "settings.json";
pub const DECK_SORT_FILE: &str = "deck_sort.json";

/// Where imported notes go and how they are looked up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportSettings {
    pub note_type: String,
    pub deck: String,
    pub use_enrichment: bool,
    pub anki_url: String,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            note_type: VOCAB_NOTE_TYPE.to_string(),
            deck: "Default".to_string(),
            use_enrichment: false,
            anki_url: DEFAULT_ANKI_URL.to_string(),
        }
    }
}

pub fn get_app_data_dir() -> PathBuf {
    if let Some(data_dir) = dirs::data_local_dir() {
        let app_dir = data_dir.join(APP_NAME);
        let _ = fs::create_dir_all(&app_dir);
        app_dir
    } else {
        PathBuf::from(".")
    }
}

pub fn save_json<T: Serialize>(data: &T, path: &Path) -> Result<(), TangoError> {
    let json = serde_json::to_string_pretty(data)?;
    fs::write(path, json)?;
    debug!("Data saved to: {}", path.display());
    Ok(())
}

pub fn load_json<T: DeserializeOwned + Default>(path: &Path) -> Result<T, TangoError> {
    if !path.exists() {
        return Ok(T::default());
    }

    let json = fs::read_to_string(path)?;
    let data: T = serde_json::from_str(&json)?;
    debug!("Data loaded from: {}", path.display());
    Ok(data)
}

pub fn load_json_or_default<T: DeserializeOwned + Default>(path: &Path) -> T {
    match load_json::<T>(path) {
        Ok(data) => data,
        Err(e) => {
            warn!("Failed to load {}: {}. Using defaults.", path.display(), e);
            T::default()
        }
    }
}

pub fn load_import_settings(path: &Path) -> ImportSettings {
    load_json_or_default(path)
}

/// Routing settings with the user's file layered over the built-in table.
pub fn load_deck_sort_config(path: &Path) -> Result<DeckSortConfig, TangoError> {
    if !path.exists() {
        return Ok(DeckSortConfig::default());
    }
    let overrides: serde_json::Value = serde_json::from_str(&fs::read_to_string(path)?)?;
    let config = DeckSortConfig::default().merged_with(&overrides)?;
    info!("Loaded deck routing from {}", path.display());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn settings_fill_missing_keys_with_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        fs::write(&path, r#"{"deck": "Mining", "use_enrichment": true}"#).unwrap();

        let settings = load_import_settings(&path);
        assert_eq!(settings.deck, "Mining");
        assert!(settings.use_enrichment);
        assert_eq!(settings.note_type, VOCAB_NOTE_TYPE);
        assert_eq!(settings.anki_url, DEFAULT_ANKI_URL);
    }

    #[test]
    fn broken_or_missing_files_fall_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        assert_eq!(load_import_settings(&path), ImportSettings::default());

        fs::write(&path, "{ not json").unwrap();
        assert_eq!(load_import_settings(&path), ImportSettings::default());
        assert!(load_deck_sort_config(&path).is_err());
    }

    #[test]
    fn save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        let settings = ImportSettings { deck: "Inbox".to_string(), ..Default::default() };
        save_json(&settings, &path).unwrap();
        assert_eq!(load_json::<ImportSettings>(&path).unwrap(), settings);
    }

    #[test]
    fn deck_sort_overrides_merge_over_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(DECK_SORT_FILE);
        assert_eq!(load_deck_sort_config(&path).unwrap(), DeckSortConfig::default());

        fs::write(&path, r#"{"tag_to_deck": {"jlpt_n5": "Beginner"}, "auto_sort_on_add": false}"#)
            .unwrap();
        let config = load_deck_sort_config(&path).unwrap();
        assert_eq!(config.tag_to_deck["jlpt_n5"], "Beginner");
        assert_eq!(config.tag_to_deck["jlpt_n2"], "0_JLPT N2");
        assert!(!config.auto_sort_on_add);
    }
}
