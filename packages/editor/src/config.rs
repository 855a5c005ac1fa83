use crate::serializer::LoadMode;
use serde::{Deserialize, Serialize};

/// Engine settings, usually read from the `editor` section of the host config
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorConfig {
    /// Keep nodes with unregistered widget types as placeholders instead of failing the load
    #[serde(default)]
    pub tolerant_load: bool,

    /// Maximum number of undo levels (0 = unlimited)
    #[serde(default = "default_max_undo_levels")]
    pub max_undo_levels: usize,
}

fn default_max_undo_levels() -> usize {
    100
}

impl EditorConfig {
    pub fn load_mode(&self) -> LoadMode {
        if self.tolerant_load {
            LoadMode::Tolerant
        } else {
            LoadMode::Strict
        }
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            tolerant_load: false,
            max_undo_levels: default_max_undo_levels(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let json = r#"{ "tolerantLoad": true, "maxUndoLevels": 0 }"#;
        let config: EditorConfig = serde_json::from_str(json).unwrap();
        assert!(config.tolerant_load);
        assert_eq!(config.max_undo_levels, 0);
        assert_eq!(config.load_mode(), LoadMode::Tolerant);
    }

    #[test]
    fn test_default_config() {
        let config: EditorConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, EditorConfig::default());
        assert_eq!(config.max_undo_levels, 100);
        assert_eq!(config.load_mode(), LoadMode::Strict);
    }
}
