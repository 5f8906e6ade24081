use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Encoded reference voices kept on the device between calls.
///
/// The built-in voice (`None`) and the configured default reference are
/// pinned. Voices encoded from caller-supplied references are transient and
/// go away on [`VoiceCache::evict_transient`].
pub struct VoiceCache<S> {
    pinned: Option<PathBuf>,
    entries: HashMap<Option<PathBuf>, S>,
}

impl<S: Clone> VoiceCache<S> {
    pub fn new(pinned: Option<PathBuf>) -> Self {
        Self {
            pinned,
            entries: HashMap::new(),
        }
    }

    /// Cached state for `voice`, encoding it with `encode` on a miss.
    pub fn get_or_try_insert<E>(
        &mut self,
        voice: Option<&Path>,
        encode: impl FnOnce() -> Result<S, E>,
    ) -> Result<S, E> {
        let key = voice.map(Path::to_path_buf);
        if let Some(state) = self.entries.get(&key) {
            return Ok(state.clone());
        }

        let state = encode()?;
        self.entries.insert(key, state.clone());
        Ok(state)
    }

    pub fn evict_transient(&mut self) -> usize {
        let before = self.entries.len();
        let pinned = self.pinned.as_deref();
        self.entries
            .retain(|key, _| key.is_none() || key.as_deref() == pinned);
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
