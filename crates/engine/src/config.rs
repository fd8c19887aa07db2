use courseforge_core::HashAlgo;

/// Storage key the collection blob lives under unless configured otherwise.
pub const DEFAULT_STORAGE_KEY: &str = "courseforge_projects_v1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub storage_key: String,
    /// Fixed for the lifetime of a store; every signature and script hash it
    /// produces uses this algorithm.
    pub hash_algo: HashAlgo,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            hash_algo: HashAlgo::Blake3,
        }
    }
}

impl StoreConfig {
    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    pub fn with_hash_algo(mut self, algo: HashAlgo) -> Self {
        self.hash_algo = algo;
        self
    }
}
