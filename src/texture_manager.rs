use std::collections::HashMap;
use std::hash::Hash;

use egui::{ColorImage, Context, TextureHandle, TextureId, TextureOptions};
use thiserror::Error;

/// Errors that can occur during texture generation
#[derive(Error, Debug)]
pub enum TextureGenerationError {
    #[error("Failed to generate texture: {0}")]
    GenerationFailed(String),
    #[error("Invalid texture dimensions")]
    InvalidDimensions,
}

/// Caches GPU textures by key and content version, evicting the least
/// recently used once full
pub struct TextureManager<K> {
    name: &'static str,
    /// Cache of textures by (key, version)
    texture_cache: HashMap<(K, u64), TextureHandle>,
    /// Tracks when each texture was last used
    last_used: HashMap<(K, u64), u64>,
    /// Current frame counter for LRU tracking
    current_frame: u64,
    max_cache_size: usize,
}

impl<K> TextureManager<K>
where
    K: Clone + Eq + Hash + std::fmt::Debug,
{
    pub fn new(name: &'static str, max_cache_size: usize) -> Self {
        Self {
            name,
            texture_cache: HashMap::new(),
            last_used: HashMap::new(),
            current_frame: 0,
            max_cache_size: max_cache_size.max(1),
        }
    }

    /// Increments the frame counter, should be called at the start of each frame
    pub fn begin_frame(&mut self) {
        self.current_frame += 1;
    }

    /// Gets or uploads the texture for `key` at `version`
    pub fn get_or_create_texture<F>(
        &mut self,
        key: &K,
        version: u64,
        generator: F,
        ctx: &Context,
    ) -> Result<TextureId, TextureGenerationError>
    where
        F: FnOnce() -> Result<ColorImage, TextureGenerationError>,
    {
        let cache_key = (key.clone(), version);

        if let Some(handle) = self.texture_cache.get(&cache_key) {
            self.last_used.insert(cache_key, self.current_frame);
            return Ok(handle.id());
        }

        let image = generator()?;
        if image.width() == 0 || image.height() == 0 {
            return Err(TextureGenerationError::InvalidDimensions);
        }

        self.prune_to(self.max_cache_size - 1);

        let name = format!("{}_{:?}_v{}", self.name, key, version);
        let handle = ctx.load_texture(name, image, TextureOptions::LINEAR);
        let id = handle.id();
        self.texture_cache.insert(cache_key.clone(), handle);
        self.last_used.insert(cache_key, self.current_frame);
        Ok(id)
    }

    /// Drops every version cached for `key`
    pub fn invalidate(&mut self, key: &K) {
        self.texture_cache.retain(|(cached, _), _| cached != key);
        self.last_used.retain(|(cached, _), _| cached != key);
    }

    /// Removes the oldest entries until at most `limit` remain
    fn prune_to(&mut self, limit: usize) {
        if self.texture_cache.len() <= limit {
            return;
        }

        let mut entries: Vec<((K, u64), u64)> = self.last_used.iter().map(|(k, v)| (k.clone(), *v)).collect();
        entries.sort_by_key(|(_, frame)| *frame);

        let to_remove = entries.len() - limit;
        for (key, _) in entries.into_iter().take(to_remove) {
            self.texture_cache.remove(&key);
            self.last_used.remove(&key);
        }
    }

    pub fn clear_cache(&mut self) {
        self.texture_cache.clear();
        self.last_used.clear();
    }

    pub fn cache_size(&self) -> usize {
        self.texture_cache.len()
    }

    #[cfg(test)]
    fn get_texture(&self, key: &K, version: u64) -> Option<&TextureHandle> {
        self.texture_cache.get(&(key.clone(), version))
    }
}
