//! Dataset Loading
//!
//! Reads the images, groups and descriptive datasets from disk, hashes each
//! raw input and builds the normalized structures the engine works on. All
//! I/O happens here, before any graph construction.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::checksum::Checksum;
use crate::error::{JigenError, Result};
use crate::forms::FormIndex;
use crate::normalize::{normalize, NormalizedGroups};
use crate::reference::DescriptiveDataset;

/// Image file extensions that count towards the asset hash
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "svg", "webp"];

/// Where to find the datasets
#[derive(Debug, Clone)]
pub struct LoadConfig {
    pub images_path: PathBuf,
    pub groups_path: PathBuf,
    /// Optional; a missing file means no descriptive data
    pub charinfo_path: PathBuf,
    /// Image directory whose listing feeds the asset hash
    pub image_dir: Option<PathBuf>,
}

impl LoadConfig {
    /// Default file names inside `dir`
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            images_path: dir.join("images.json"),
            groups_path: dir.join("groups.json"),
            charinfo_path: dir.join("charinfo.json"),
            image_dir: None,
        }
    }
}

/// Raw dataset texts, as read
#[derive(Debug, Clone, Default)]
pub struct DatasetSources {
    pub groups_json: String,
    pub images_json: String,
    pub charinfo_json: Option<String>,
    /// Identity of ancillary assets; defaults to the images hash
    pub assets_hash: Option<Checksum>,
}

/// Everything construction needs, plus the hashes of its inputs
#[derive(Debug, Clone)]
pub struct LoadedDataset {
    pub groups: NormalizedGroups,
    pub forms: FormIndex,
    pub descriptive: DescriptiveDataset,
    pub groups_hash: Checksum,
    pub images_hash: Checksum,
    pub assets_hash: Checksum,
}

impl LoadedDataset {
    /// Parse and normalize raw dataset texts
    pub fn from_sources(sources: DatasetSources) -> Result<Self> {
        let groups_hash = Checksum::from_str(&sources.groups_json);
        let images_hash = Checksum::from_str(&sources.images_json);
        let assets_hash = sources.assets_hash.unwrap_or_else(|| images_hash.clone());

        let groups_raw = parse_json("groups", &sources.groups_json)?;
        let images_raw = parse_json("images", &sources.images_json)?;
        if !images_raw.is_object() {
            return Err(JigenError::InvalidDataset {
                name: "images".to_string(),
                reason: "expected an object of descriptor -> image ids".to_string(),
            });
        }
        let descriptive_raw = match &sources.charinfo_json {
            Some(text) => parse_json("charinfo", text)?,
            None => Value::Null,
        };

        let groups = normalize(&groups_raw);
        let forms = FormIndex::build(&images_raw, &groups);
        let descriptive = DescriptiveDataset::from_value(&descriptive_raw);

        Ok(Self {
            groups,
            forms,
            descriptive,
            groups_hash,
            images_hash,
            assets_hash,
        })
    }
}

fn parse_json(name: &str, text: &str) -> Result<Value> {
    serde_json::from_str(text).map_err(|e| JigenError::InvalidDataset {
        name: name.to_string(),
        reason: e.to_string(),
    })
}

fn read_required(name: &str, path: &Path) -> Result<String> {
    if !path.is_file() {
        return Err(JigenError::MissingDataset {
            name: name.to_string(),
            path: path.to_path_buf(),
        });
    }
    Ok(fs::read_to_string(path)?)
}

/// Load all datasets described by `config`
pub fn load_dataset(config: &LoadConfig) -> Result<LoadedDataset> {
    let groups_json = read_required("groups", &config.groups_path)?;
    let images_json = read_required("images", &config.images_path)?;

    let charinfo_json = if config.charinfo_path.is_file() {
        Some(fs::read_to_string(&config.charinfo_path)?)
    } else {
        debug!(path = %config.charinfo_path.display(), "no descriptive dataset");
        None
    };

    let assets_hash = config
        .image_dir
        .as_deref()
        .map(asset_hash)
        .transpose()?
        .flatten();

    let dataset = LoadedDataset::from_sources(DatasetSources {
        groups_json,
        images_json,
        charinfo_json,
        assets_hash,
    })?;

    info!(
        groups = dataset.groups.len(),
        forms = dataset.forms.form_count(),
        characters = dataset.descriptive.len(),
        "loaded datasets"
    );
    Ok(dataset)
}

/// Hash of the image directory listing: `name|mtime|size` per image file,
/// sorted by name. `None` when the directory holds no images.
pub fn asset_hash(image_dir: &Path) -> Result<Option<Checksum>> {
    if !image_dir.is_dir() {
        debug!(path = %image_dir.display(), "image directory missing; using images hash");
        return Ok(None);
    }

    let mut markers = Vec::new();
    for entry in WalkDir::new(image_dir)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let is_image = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
            .unwrap_or(false);
        if !is_image {
            continue;
        }

        let metadata = entry.metadata().map_err(std::io::Error::from)?;
        let modified = metadata
            .modified()
            .map(|t| DateTime::<Utc>::from(t).to_rfc3339())
            .unwrap_or_default();
        let name = path
            .strip_prefix(image_dir)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/");
        markers.push(format!("{}|{}|{}", name, modified, metadata.len()));
    }

    if markers.is_empty() {
        return Ok(None);
    }
    markers.sort();
    debug!(files = markers.len(), "hashed image directory listing");
    Ok(Some(Checksum::from_str(&markers.join("||"))))
}
