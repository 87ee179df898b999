//! Windows registry [`KeyStore`] over HKEY_LOCAL_MACHINE.

#![cfg(target_os = "windows")]

use std::ffi::OsString;
use std::os::windows::ffi::{OsStrExt, OsStringExt};
use std::ptr;

use windows_sys::Win32::Foundation::{ERROR_MORE_DATA, ERROR_NO_MORE_ITEMS, ERROR_SUCCESS};
use windows_sys::Win32::System::Registry::{
    RegCloseKey, RegEnumKeyExW, RegGetValueW, RegOpenKeyExW, HKEY, HKEY_LOCAL_MACHINE, KEY_READ,
    RRF_RT_REG_SZ,
};

use crate::key_store::KeyStore;

/// Registry key names are limited to 255 characters.
const MAX_KEY_NAME_LEN: usize = 256;

pub struct WindowsRegistry {
    root: HKEY,
}

// HKEY_LOCAL_MACHINE is a predefined pseudo-handle, valid from any thread.
unsafe impl Send for WindowsRegistry {}
unsafe impl Sync for WindowsRegistry {}

impl WindowsRegistry {
    pub fn local_machine() -> Self {
        Self {
            root: HKEY_LOCAL_MACHINE,
        }
    }

    fn open(&self, path: &str) -> Option<OpenKey> {
        let wide = to_wide(path);
        let mut handle: HKEY = ptr::null_mut();
        let status = unsafe { RegOpenKeyExW(self.root, wide.as_ptr(), 0, KEY_READ, &mut handle) };
        if status == ERROR_SUCCESS {
            Some(OpenKey(handle))
        } else {
            None
        }
    }
}

/// Closes the handle on drop.
struct OpenKey(HKEY);

impl Drop for OpenKey {
    fn drop(&mut self) {
        unsafe {
            RegCloseKey(self.0);
        }
    }
}

fn to_wide(s: &str) -> Vec<u16> {
    std::ffi::OsStr::new(s)
        .encode_wide()
        .chain(std::iter::once(0))
        .collect()
}

fn from_wide(buf: &[u16]) -> String {
    let end = buf.iter().position(|&c| c == 0).unwrap_or(buf.len());
    OsString::from_wide(&buf[..end])
        .to_string_lossy()
        .into_owned()
}

impl KeyStore for WindowsRegistry {
    fn subkeys(&self, path: &str) -> Option<Vec<String>> {
        let key = self.open(path)?;
        let mut names = Vec::new();
        let mut index = 0u32;
        loop {
            let mut buf = [0u16; MAX_KEY_NAME_LEN];
            let mut len = buf.len() as u32;
            let status = unsafe {
                RegEnumKeyExW(
                    key.0,
                    index,
                    buf.as_mut_ptr(),
                    &mut len,
                    ptr::null(),
                    ptr::null_mut(),
                    ptr::null_mut(),
                    ptr::null_mut(),
                )
            };
            if status == ERROR_NO_MORE_ITEMS {
                break;
            }
            if status != ERROR_SUCCESS {
                tracing::debug!(path, index, status, "RegEnumKeyExW failed, stopping enumeration");
                break;
            }
            names.push(from_wide(&buf[..len as usize]));
            index += 1;
        }
        Some(names)
    }

    fn default_value(&self, path: &str) -> Option<String> {
        let wide = to_wide(path);
        let mut size: u32 = 0;
        let status = unsafe {
            RegGetValueW(
                self.root,
                wide.as_ptr(),
                ptr::null(),
                RRF_RT_REG_SZ,
                ptr::null_mut(),
                ptr::null_mut(),
                &mut size,
            )
        };
        if status != ERROR_SUCCESS && status != ERROR_MORE_DATA {
            return None;
        }
        let mut buf = vec![0u16; (size as usize).div_ceil(2) + 1];
        let mut size = (buf.len() * 2) as u32;
        let status = unsafe {
            RegGetValueW(
                self.root,
                wide.as_ptr(),
                ptr::null(),
                RRF_RT_REG_SZ,
                ptr::null_mut(),
                buf.as_mut_ptr().cast(),
                &mut size,
            )
        };
        if status != ERROR_SUCCESS {
            return None;
        }
        Some(from_wide(&buf))
    }
}
