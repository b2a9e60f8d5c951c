//! Avatar key resolution.

use super::AvatarResolver;
use std::collections::HashSet;

/// Resolves avatar keys to image paths under a base directory.
#[derive(Debug, Clone)]
pub struct AvatarCatalog {
    base_path: String,
    default_key: String,
    known: HashSet<String>,
}

impl AvatarCatalog {
    pub fn new(base_path: &str, default_key: &str, known: &[String]) -> Self {
        Self {
            base_path: base_path.trim_end_matches('/').to_string(),
            default_key: default_key.to_string(),
            known: known.iter().cloned().collect(),
        }
    }

    fn image_path(&self, key: &str) -> String {
        format!("{}/{}.png", self.base_path, key)
    }
}

impl From<&crate::config::AvatarConfig> for AvatarCatalog {
    fn from(config: &crate::config::AvatarConfig) -> Self {
        Self::new(&config.base_path, &config.default_avatar, &config.known)
    }
}

impl AvatarResolver for AvatarCatalog {
    fn resolve_avatar(&self, avatar_key: &str) -> String {
        if self.known.contains(avatar_key) {
            self.image_path(avatar_key)
        } else {
            self.default_avatar()
        }
    }

    fn default_avatar(&self) -> String {
        self.image_path(&self.default_key)
    }
}
