//! NVS (Non-Volatile Storage) key-value adapter.
//!
//! Implements [`StoragePort`] over the ESP-IDF NVS blob API on the device
//! and over an in-memory map on the host. Higher-level persistence
//! (config text, history snapshot) lives in
//! [`persist`](super::persist) and only ever talks to the trait.
//!
//! - Namespace isolation: each subsystem uses its own namespace.
//! - Atomic writes: ESP-IDF NVS commits are atomic per `nvs_commit()`.
//! - NVS limits namespaces and keys to 15 bytes; longer names are
//!   rejected with [`StorageError::InvalidKey`] instead of truncated.

use log::info;

use crate::app::ports::{StorageError, StoragePort};

#[cfg(not(target_os = "espidf"))]
use std::collections::HashMap;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;
#[cfg(target_os = "espidf")]
use log::warn;

/// Largest blob any caller reads back.
pub const MAX_BLOB_SIZE: usize = 4096;

/// NVS name length limit (excluding the NUL terminator).
const NVS_KEY_MAX: usize = 15;

pub struct NvsStorage {
    #[cfg(not(target_os = "espidf"))]
    store: HashMap<(String, String), Vec<u8>>,
}

impl NvsStorage {
    /// Initialise NVS flash and return the adapter.
    ///
    /// On first boot or after a version mismatch the NVS partition is
    /// erased and re-initialised automatically.
    #[cfg(target_os = "espidf")]
    pub fn new() -> Result<Self, StorageError> {
        // SAFETY: nvs_flash_init / nvs_flash_erase are called from the
        // single main-task context before any concurrent NVS access.
        let ret = unsafe { nvs_flash_init() };
        if ret == rc::NO_FREE_PAGES || ret == rc::NEW_VERSION {
            warn!("NVS: erasing and re-initialising flash partition");
            if unsafe { nvs_flash_erase() } != rc::OK {
                return Err(StorageError::IoError);
            }
            if unsafe { nvs_flash_init() } != rc::OK {
                return Err(StorageError::IoError);
            }
        } else if ret != rc::OK {
            return Err(StorageError::IoError);
        }
        info!("NvsStorage: ESP-IDF NVS initialised");
        Ok(Self {})
    }

    /// In-memory simulation backend.
    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Result<Self, StorageError> {
        info!("NvsStorage: simulation backend");
        Ok(Self {
            store: HashMap::new(),
        })
    }
}

/// ESP-IDF return codes normalised to `esp_err_t` for matching.
#[cfg(target_os = "espidf")]
mod rc {
    use esp_idf_svc::sys::*;

    pub const OK: i32 = ESP_OK as i32;
    pub const NOT_FOUND: i32 = ESP_ERR_NVS_NOT_FOUND as i32;
    pub const NO_FREE_PAGES: i32 = ESP_ERR_NVS_NO_FREE_PAGES as i32;
    pub const NEW_VERSION: i32 = ESP_ERR_NVS_NEW_VERSION_FOUND as i32;
    pub const INVALID_LENGTH: i32 = ESP_ERR_NVS_INVALID_LENGTH as i32;
    pub const NOT_ENOUGH_SPACE: i32 = ESP_ERR_NVS_NOT_ENOUGH_SPACE as i32;
    pub const VALUE_TOO_LONG: i32 = ESP_ERR_NVS_VALUE_TOO_LONG as i32;
}

/// NUL-terminated copy of an NVS name.
fn nvs_name(name: &str) -> Result<[u8; NVS_KEY_MAX + 1], StorageError> {
    let bytes = name.as_bytes();
    if bytes.is_empty() || bytes.len() > NVS_KEY_MAX || bytes.contains(&0) {
        return Err(StorageError::InvalidKey);
    }
    let mut buf = [0u8; NVS_KEY_MAX + 1];
    buf[..bytes.len()].copy_from_slice(bytes);
    Ok(buf)
}

// ── ESP-IDF backend ───────────────────────────────────────────

#[cfg(target_os = "espidf")]
impl NvsStorage {
    /// Open an NVS namespace, execute a closure with the handle, then close.
    fn with_handle<T>(
        namespace: &str,
        write: bool,
        f: impl FnOnce(nvs_handle_t) -> Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        let ns = nvs_name(namespace)?;
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };

        let mut handle: nvs_handle_t = 0;
        // SAFETY: `ns` is NUL-terminated and outlives the call.
        let ret = unsafe { nvs_open(ns.as_ptr().cast(), mode, &mut handle) };
        if ret == rc::NOT_FOUND {
            // Read-only open of a namespace that was never written.
            return Err(StorageError::NotFound);
        }
        if ret != rc::OK {
            warn!("NVS: open '{}' failed ({})", namespace, ret);
            return Err(StorageError::IoError);
        }

        let result = f(handle);
        // SAFETY: handle was opened above and is closed exactly once.
        unsafe { nvs_close(handle) };
        result
    }

    fn commit(handle: nvs_handle_t) -> Result<(), StorageError> {
        // SAFETY: handle is open for the duration of `with_handle`.
        match unsafe { nvs_commit(handle) } {
            rc::OK => Ok(()),
            _ => Err(StorageError::IoError),
        }
    }
}

#[cfg(target_os = "espidf")]
impl StoragePort for NvsStorage {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        let k = nvs_name(key)?;
        Self::with_handle(namespace, false, |handle| {
            let mut size = buf.len();
            // SAFETY: `buf` is valid for `size` bytes; NVS writes at most that.
            let ret = unsafe { nvs_get_blob(handle, k.as_ptr().cast(), buf.as_mut_ptr().cast(), &mut size) };
            match ret {
                rc::OK => Ok(size),
                rc::NOT_FOUND => Err(StorageError::NotFound),
                rc::INVALID_LENGTH => Err(StorageError::TooLarge),
                _ => Err(StorageError::IoError),
            }
        })
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        let k = nvs_name(key)?;
        Self::with_handle(namespace, true, |handle| {
            // SAFETY: `data` is valid for `data.len()` bytes.
            let ret = unsafe { nvs_set_blob(handle, k.as_ptr().cast(), data.as_ptr().cast(), data.len()) };
            match ret {
                rc::OK => Self::commit(handle),
                rc::NOT_ENOUGH_SPACE => Err(StorageError::Full),
                rc::VALUE_TOO_LONG => Err(StorageError::TooLarge),
                _ => Err(StorageError::IoError),
            }
        })
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        let k = nvs_name(key)?;
        Self::with_handle(namespace, true, |handle| {
            // SAFETY: `k` is NUL-terminated.
            let ret = unsafe { nvs_erase_key(handle, k.as_ptr().cast()) };
            if ret != rc::OK && ret != rc::NOT_FOUND {
                return Err(StorageError::IoError);
            }
            Self::commit(handle)
        })
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        let Ok(k) = nvs_name(key) else {
            return false;
        };
        Self::with_handle(namespace, false, |handle| {
            let mut size = 0usize;
            // SAFETY: a null out-pointer asks NVS for the length only.
            let ret = unsafe { nvs_get_blob(handle, k.as_ptr().cast(), core::ptr::null_mut(), &mut size) };
            Ok(ret == rc::OK)
        })
        .unwrap_or(false)
    }
}

// ── Simulation backend ────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
impl NvsStorage {
    fn slot(namespace: &str, key: &str) -> Result<(String, String), StorageError> {
        nvs_name(namespace)?;
        nvs_name(key)?;
        Ok((namespace.to_owned(), key.to_owned()))
    }
}

#[cfg(not(target_os = "espidf"))]
impl StoragePort for NvsStorage {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        let data = self
            .store
            .get(&Self::slot(namespace, key)?)
            .ok_or(StorageError::NotFound)?;
        if data.len() > buf.len() {
            return Err(StorageError::TooLarge);
        }
        buf[..data.len()].copy_from_slice(data);
        Ok(data.len())
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        if data.len() > MAX_BLOB_SIZE {
            return Err(StorageError::TooLarge);
        }
        self.store.insert(Self::slot(namespace, key)?, data.to_vec());
        Ok(())
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        self.store.remove(&Self::slot(namespace, key)?);
        Ok(())
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        Self::slot(namespace, key).is_ok_and(|slot| self.store.contains_key(&slot))
    }
}
