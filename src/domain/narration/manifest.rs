use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("failed to read manifest {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid manifest: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("duplicate narration index {0}")]
    DuplicateIndex(u32),

    #[error("no narration for index {0}")]
    MissingIndex(u32),
}

/// On-disk notes file: `{"notes":[{"slide":0,"note":"..."}]}`.
#[derive(Debug, Deserialize)]
struct NotesFile {
    notes: Vec<NoteEntry>,
}

#[derive(Debug, Deserialize)]
struct NoteEntry {
    slide: u32,
    #[serde(default)]
    note: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NarrationItem {
    pub index: u32,
    pub text: String,
}

impl NarrationItem {
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Narration items in index order. Read-only once loaded.
#[derive(Debug, Clone, Default)]
pub struct NarrationManifest {
    items: BTreeMap<u32, String>,
}

impl NarrationManifest {
    pub fn from_items<I>(items: I) -> Result<Self, ManifestError>
    where
        I: IntoIterator<Item = (u32, String)>,
    {
        let mut map = BTreeMap::new();
        for (index, text) in items {
            if map.insert(index, text).is_some() {
                return Err(ManifestError::DuplicateIndex(index));
            }
        }
        Ok(Self { items: map })
    }

    pub fn from_json(json: &str) -> Result<Self, ManifestError> {
        let file: NotesFile = serde_json::from_str(json)?;
        Self::from_items(file.notes.into_iter().map(|n| (n.slide, n.note)))
    }

    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let json = std::fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn get(&self, index: u32) -> Result<&str, ManifestError> {
        self.items
            .get(&index)
            .map(String::as_str)
            .ok_or(ManifestError::MissingIndex(index))
    }

    pub fn items(&self) -> impl Iterator<Item = NarrationItem> + '_ {
        self.items.iter().map(|(index, text)| NarrationItem {
            index: *index,
            text: text.clone(),
        })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
