use crate::error::{ConfigError, Result};
use crate::parse::{from_value, parse_document};
use crate::perspective::{PerspectiveConfig, PerspectiveKind};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

pub const PORTAL_CONFIG_FILE: &str = "portalConfig.json";
const PERSPECTIVE_CONFIG_DIR: &str = "perspective_configs";
const SEARCH_PERSPECTIVES_DIR: &str = "search_perspectives";
const INSTANCE_PAGES_DIR: &str = "only_instance_pages";
const PERSPECTIVE_EXTENSIONS: [&str; 2] = ["json", "toml"];

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPortal {
    #[serde(rename = "portalID", alias = "portalId")]
    portal_id: Option<String>,
    #[serde(default)]
    perspectives: RawPerspectiveLists,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPerspectiveLists {
    #[serde(default)]
    search_perspectives: Vec<String>,
    #[serde(default)]
    only_instance_pages: Vec<String>,
}

/// A fully loaded portal: every declared perspective, validated.
#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub portal_id: String,
    pub search_perspectives: Vec<PerspectiveConfig>,
    pub instance_pages: Vec<PerspectiveConfig>,
}

impl PortalConfig {
    pub fn new(
        portal_id: impl Into<String>,
        search_perspectives: Vec<PerspectiveConfig>,
        instance_pages: Vec<PerspectiveConfig>,
    ) -> Result<Self> {
        let mut seen = HashSet::new();
        for perspective in search_perspectives.iter().chain(&instance_pages) {
            if !seen.insert(perspective.id.as_str()) {
                return Err(ConfigError::DuplicatePerspective(perspective.id.clone()));
            }
        }
        Ok(Self {
            portal_id: portal_id.into(),
            search_perspectives,
            instance_pages,
        })
    }

    /// Load `<configs>/portalConfig.json` and every perspective it lists from
    /// `<configs>/<portalID>/perspective_configs/{search_perspectives,only_instance_pages}/<id>.{json,toml}`.
    pub fn load_dir(configs_dir: &Path) -> Result<Self> {
        let index_path = configs_dir.join(PORTAL_CONFIG_FILE);
        let bytes = read(&index_path)?;
        let origin = index_path.display().to_string();
        let raw: RawPortal = from_value(&origin, parse_document(&origin, &bytes)?)?;
        let portal_id = raw
            .portal_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingField {
                perspective: origin.clone(),
                field: "portalID".to_string(),
            })?;

        let base = configs_dir.join(&portal_id).join(PERSPECTIVE_CONFIG_DIR);
        let search = load_perspectives(
            &base.join(SEARCH_PERSPECTIVES_DIR),
            &raw.perspectives.search_perspectives,
            PerspectiveKind::Search,
        )?;
        let instance_pages = load_perspectives(
            &base.join(INSTANCE_PAGES_DIR),
            &raw.perspectives.only_instance_pages,
            PerspectiveKind::InstancePage,
        )?;

        log::info!(
            "Loaded portal '{}': {} search perspectives, {} instance pages",
            portal_id,
            search.len(),
            instance_pages.len()
        );
        Self::new(portal_id, search, instance_pages)
    }

    pub fn perspectives(&self) -> impl Iterator<Item = &PerspectiveConfig> {
        self.search_perspectives.iter().chain(&self.instance_pages)
    }

    #[must_use]
    pub fn perspective(&self, id: &str) -> Option<&PerspectiveConfig> {
        self.perspectives().find(|p| p.id == id)
    }
}

fn load_perspectives(
    dir: &Path,
    ids: &[String],
    kind: PerspectiveKind,
) -> Result<Vec<PerspectiveConfig>> {
    let mut out = Vec::with_capacity(ids.len());
    for id in ids {
        let path = perspective_path(dir, id);
        let bytes = read(&path)?;
        let config = PerspectiveConfig::from_bytes(&path.display().to_string(), &bytes, kind)?;
        if config.id != *id {
            log::warn!(
                "Perspective file {} declares id '{}' (listed as '{}')",
                path.display(),
                config.id,
                id
            );
        }
        out.push(config);
    }
    Ok(out)
}

fn perspective_path(dir: &Path, id: &str) -> PathBuf {
    PERSPECTIVE_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{id}.{ext}")))
        .find(|candidate| candidate.is_file())
        .unwrap_or_else(|| dir.join(format!("{id}.json")))
}

fn read(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}
