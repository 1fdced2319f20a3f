//! User and group name resolution through the system databases.
//!
//! Ids without a database entry render as their decimal value, and numeric
//! names resolve to themselves, so files owned by unknown ids still round
//! trip.

use crate::error::{Error, Result};
use std::ffi::{CStr, CString};

/// Name of the user with `uid`, or the uid as text.
#[allow(unsafe_code)]
pub fn user_name(uid: u32) -> String {
    // SAFETY: getpwuid returns null or a pointer to static storage that stays
    // valid until the next passwd lookup; the name is copied out immediately.
    unsafe {
        let entry = libc::getpwuid(uid);
        if entry.is_null() || (*entry).pw_name.is_null() {
            return uid.to_string();
        }
        CStr::from_ptr((*entry).pw_name).to_string_lossy().into_owned()
    }
}

/// Name of the group with `gid`, or the gid as text.
#[allow(unsafe_code)]
pub fn group_name(gid: u32) -> String {
    // SAFETY: see user_name
    unsafe {
        let entry = libc::getgrgid(gid);
        if entry.is_null() || (*entry).gr_name.is_null() {
            return gid.to_string();
        }
        CStr::from_ptr((*entry).gr_name).to_string_lossy().into_owned()
    }
}

/// Resolve a user name to a uid.
#[allow(unsafe_code)]
pub fn uid_of(name: &str) -> Result<u32> {
    let c_name = CString::new(name).map_err(|_| Error::UnknownUser(name.to_string()))?;

    // SAFETY: c_name outlives the call; only the uid is read from the entry.
    let uid = unsafe {
        let entry = libc::getpwnam(c_name.as_ptr());
        (!entry.is_null()).then(|| (*entry).pw_uid)
    };

    uid.or_else(|| name.parse().ok())
        .ok_or_else(|| Error::UnknownUser(name.to_string()))
}

/// Resolve a group name to a gid.
#[allow(unsafe_code)]
pub fn gid_of(name: &str) -> Result<u32> {
    let c_name = CString::new(name).map_err(|_| Error::UnknownGroup(name.to_string()))?;

    // SAFETY: c_name outlives the call; only the gid is read from the entry.
    let gid = unsafe {
        let entry = libc::getgrnam(c_name.as_ptr());
        (!entry.is_null()).then(|| (*entry).gr_gid)
    };

    gid.or_else(|| name.parse().ok())
        .ok_or_else(|| Error::UnknownGroup(name.to_string()))
}
