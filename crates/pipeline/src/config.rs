/// Settings the sync pipeline needs from the environment.
#[derive(Debug, Clone, Default)]
pub struct SyncConfig {
    /// Key forwarded to creative agents for generative builds. Generative
    /// formats fail per item when absent.
    pub generation_api_key: Option<String>,
}

impl SyncConfig {
    pub fn with_generation_api_key(mut self, key: Option<String>) -> Self {
        self.generation_api_key = key.filter(|k| !k.trim().is_empty());
        self
    }
}

/// AI review worker pool sizing.
#[derive(Debug, Clone)]
pub struct ReviewConfig {
    pub workers: usize,
    /// Bounded channel capacity; submissions wait when full.
    pub queue_capacity: usize,
    /// Finished tasks kept observable. Older ones are evicted first.
    pub retain_finished: usize,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            queue_capacity: 256,
            retain_finished: 1024,
        }
    }
}
