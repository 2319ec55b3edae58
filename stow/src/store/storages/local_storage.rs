use anyhow::anyhow;

use crate::store::StorageBackend;

/// `window.localStorage` as a backing facility.
#[derive(Debug, Clone)]
pub struct LocalStorage(web_sys::Storage);

impl LocalStorage {
    /// `None` outside a window context or when storage access is denied.
    pub fn from_window() -> Option<Self> {
        web_sys::window()?.local_storage().ok().flatten().map(Self)
    }
}

impl StorageBackend for LocalStorage {
    fn get_item(&self, key: &str) -> anyhow::Result<Option<String>> {
        self.0
            .get_item(key)
            .map_err(|e| anyhow!("localStorage.getItem({key:?}) failed: {e:?}"))
    }

    fn set_item(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.0
            .set_item(key, value)
            .map_err(|e| anyhow!("localStorage.setItem({key:?}) failed: {e:?}"))
    }

    fn remove_item(&self, key: &str) -> anyhow::Result<()> {
        self.0
            .remove_item(key)
            .map_err(|e| anyhow!("localStorage.removeItem({key:?}) failed: {e:?}"))
    }
}
