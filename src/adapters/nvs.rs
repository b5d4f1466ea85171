//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements [`ConfigPort`]: the whole option table is one `postcard`
//! blob under a single key.  On the host the blob lives in an in-memory
//! map so integration tests can inspect and corrupt it.
//!
//! - Blobs that fail to decode are reported as [`ConfigError::Corrupted`].
//! - Blobs that decode but do not match the current option layout are
//!   reported as [`ConfigError::ValidationFailed`].
//! - ESP-IDF NVS commits are atomic per `nvs_commit()`.

use crate::app::ports::{ConfigError, ConfigPort};
use crate::config::Options;
use log::{info, warn};

#[cfg(not(target_os = "espidf"))]
use std::collections::HashMap;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

const CONFIG_NAMESPACE: &str = "garage";
const CONFIG_KEY: &str = "options";

#[cfg(target_os = "espidf")]
const CONFIG_KEY_C: &[u8] = b"options\0";

const MAX_BLOB_SIZE: usize = 4000;

pub struct NvsAdapter {
    #[cfg(not(target_os = "espidf"))]
    store: std::cell::RefCell<HashMap<String, Vec<u8>>>,
}

impl NvsAdapter {
    /// Create the adapter and initialise NVS flash.
    ///
    /// On first boot or after a version mismatch the partition is erased
    /// and re-initialised.
    pub fn new() -> Result<Self, ConfigError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: nvs_flash_init / nvs_flash_erase run from the main
            // task before any other NVS access.
            let ret = unsafe { nvs_flash_init() };
            if ret == (ESP_ERR_NVS_NO_FREE_PAGES as i32) || ret == (ESP_ERR_NVS_NEW_VERSION_FOUND as i32) {
                warn!("NVS: erasing and re-initialising flash partition");
                if unsafe { nvs_flash_erase() } != ESP_OK as i32 {
                    return Err(ConfigError::IoError);
                }
                if unsafe { nvs_flash_init() } != ESP_OK as i32 {
                    return Err(ConfigError::IoError);
                }
            } else if ret != ESP_OK as i32 {
                return Err(ConfigError::IoError);
            }
            info!("NvsAdapter: ESP-IDF NVS initialised");
        }

        #[cfg(not(target_os = "espidf"))]
        info!("NvsAdapter: simulation backend");

        Ok(Self {
            #[cfg(not(target_os = "espidf"))]
            store: std::cell::RefCell::new(HashMap::new()),
        })
    }

    /// Load the stored options, or defaults when nothing usable is
    /// stored.  A bad blob is logged and replaced on the next save.
    pub fn load_or_default(&self) -> Options {
        match self.load() {
            Ok(options) => options,
            Err(ConfigError::NotFound) => {
                info!("NvsAdapter: no stored options, using defaults");
                Options::default()
            }
            Err(e) => {
                warn!("NvsAdapter: {}, using defaults", e);
                Options::default()
            }
        }
    }

    fn composite_key(namespace: &str, key: &str) -> String {
        format!("{}::{}", namespace, key)
    }

    /// Host-only: overwrite the raw blob.
    #[cfg(not(target_os = "espidf"))]
    pub fn write_raw(&self, bytes: &[u8]) {
        let key = Self::composite_key(CONFIG_NAMESPACE, CONFIG_KEY);
        self.store.borrow_mut().insert(key, bytes.to_vec());
    }

    /// Host-only: whether a blob is stored.
    #[cfg(not(target_os = "espidf"))]
    pub fn has_blob(&self) -> bool {
        let key = Self::composite_key(CONFIG_NAMESPACE, CONFIG_KEY);
        self.store.borrow().contains_key(&key)
    }

    /// Open an NVS namespace, execute a closure with the handle, then close.
    #[cfg(target_os = "espidf")]
    fn with_nvs_handle<F, T>(namespace: &str, write: bool, f: F) -> Result<T, i32>
    where
        F: FnOnce(nvs_handle_t) -> Result<T, i32>,
    {
        let mut ns_buf = [0u8; 16];
        let ns_bytes = namespace.as_bytes();
        let len = ns_bytes.len().min(15);
        ns_buf[..len].copy_from_slice(&ns_bytes[..len]);

        let mut handle: nvs_handle_t = 0;
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };

        // SAFETY: ns_buf is NUL-terminated; handle is closed below.
        let ret = unsafe { nvs_open(ns_buf.as_ptr() as *const _, mode, &mut handle) };
        if ret != ESP_OK as i32 {
            return Err(ret);
        }

        let result = f(handle);
        unsafe {
            nvs_close(handle);
        }
        result
    }

    #[cfg(target_os = "espidf")]
    fn read_blob(&self) -> Result<Option<Vec<u8>>, ConfigError> {
        let result = Self::with_nvs_handle(CONFIG_NAMESPACE, false, |handle| {
            let mut size: usize = 0;
            // SAFETY: a null buffer asks for the blob size only.
            let ret = unsafe {
                nvs_get_blob(handle, CONFIG_KEY_C.as_ptr() as *const _, core::ptr::null_mut(), &mut size)
            };
            if ret != ESP_OK as i32 {
                return Err(ret);
            }
            if size == 0 || size > MAX_BLOB_SIZE {
                return Err(ESP_ERR_NVS_INVALID_LENGTH as i32);
            }
            let mut buf = vec![0u8; size];
            // SAFETY: buf holds exactly `size` bytes.
            let ret = unsafe {
                nvs_get_blob(handle, CONFIG_KEY_C.as_ptr() as *const _, buf.as_mut_ptr() as *mut _, &mut size)
            };
            if ret != ESP_OK as i32 {
                return Err(ret);
            }
            Ok(buf)
        });
        match result {
            Ok(bytes) => Ok(Some(bytes)),
            // Opening a namespace that was never written also reports NOT_FOUND.
            Err(e) if e == (ESP_ERR_NVS_NOT_FOUND as i32) => Ok(None),
            Err(e) if e == (ESP_ERR_NVS_INVALID_LENGTH as i32) => Err(ConfigError::Corrupted),
            Err(e) => {
                warn!("NvsAdapter: NVS read error {}", e);
                Err(ConfigError::IoError)
            }
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn read_blob(&self) -> Result<Option<Vec<u8>>, ConfigError> {
        let key = Self::composite_key(CONFIG_NAMESPACE, CONFIG_KEY);
        Ok(self.store.borrow().get(&key).cloned())
    }
}

impl ConfigPort for NvsAdapter {
    fn load(&self) -> Result<Options, ConfigError> {
        let Some(bytes) = self.read_blob()? else {
            return Err(ConfigError::NotFound);
        };
        let options: Options = postcard::from_bytes(&bytes).map_err(|_| ConfigError::Corrupted)?;
        if !options.is_well_formed() {
            return Err(ConfigError::ValidationFailed("stored option layout does not match"));
        }
        info!("NvsAdapter: loaded options ({} bytes)", bytes.len());
        Ok(options)
    }

    fn save(&self, options: &Options) -> Result<(), ConfigError> {
        if !options.is_well_formed() {
            return Err(ConfigError::ValidationFailed("option table is malformed"));
        }
        let bytes = postcard::to_allocvec(options).map_err(|_| ConfigError::IoError)?;
        if bytes.len() > MAX_BLOB_SIZE {
            return Err(ConfigError::StorageFull);
        }

        #[cfg(not(target_os = "espidf"))]
        {
            let key = Self::composite_key(CONFIG_NAMESPACE, CONFIG_KEY);
            self.store.borrow_mut().insert(key, bytes);
            info!("NvsAdapter: options saved (simulation)");
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            let result = Self::with_nvs_handle(CONFIG_NAMESPACE, true, |handle| {
                // SAFETY: key is NUL-terminated; bytes outlives the call.
                let ret = unsafe {
                    nvs_set_blob(handle, CONFIG_KEY_C.as_ptr() as *const _, bytes.as_ptr() as *const _, bytes.len())
                };
                if ret != ESP_OK as i32 {
                    return Err(ret);
                }
                let ret = unsafe { nvs_commit(handle) };
                if ret != ESP_OK as i32 {
                    return Err(ret);
                }
                Ok(())
            });
            match result {
                Ok(()) => {
                    info!("NvsAdapter: options saved to NVS ({} bytes)", bytes.len());
                    Ok(())
                }
                Err(e) if e == (ESP_ERR_NVS_NOT_ENOUGH_SPACE as i32) => Err(ConfigError::StorageFull),
                Err(e) => {
                    warn!("NvsAdapter: NVS write error {}", e);
                    Err(ConfigError::IoError)
                }
            }
        }
    }

    fn erase(&self) -> Result<(), ConfigError> {
        #[cfg(not(target_os = "espidf"))]
        {
            let prefix = format!("{}::", CONFIG_NAMESPACE);
            self.store.borrow_mut().retain(|k, _| !k.starts_with(&prefix));
            info!("NvsAdapter: options erased (simulation)");
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            let result = Self::with_nvs_handle(CONFIG_NAMESPACE, true, |handle| {
                // SAFETY: handle is open read-write.
                let ret = unsafe { nvs_erase_all(handle) };
                if ret != ESP_OK as i32 {
                    return Err(ret);
                }
                let ret = unsafe { nvs_commit(handle) };
                if ret != ESP_OK as i32 {
                    return Err(ret);
                }
                Ok(())
            });
            match result {
                Ok(()) => {
                    info!("NvsAdapter: options erased");
                    Ok(())
                }
                Err(e) if e == (ESP_ERR_NVS_NOT_FOUND as i32) => Ok(()),
                Err(_) => Err(ConfigError::IoError),
            }
        }
    }
}
