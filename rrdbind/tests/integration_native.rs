//! Integration tests against the system librrd.
//!
//! Built only with `--features native`. Every test works in its own
//! temporary directory; the daemon address used for fallback tests points
//! at a socket that does not exist.

#![cfg(feature = "native")]

use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int, c_ulong};
use std::ptr;

use rrdbind::ffi;
use rrdbind::{Client, Creator, Native, Updater};
use tempfile::tempdir;

const T: i64 = 1_700_000_040;
const NO_DAEMON: &str = "unix:/nonexistent/rrdcached.sock";

fn create_db(client: &Client<Native>, path: &str) {
    client
        .create(path, 60, T, &["DS:load:GAUGE:120:U:U", "RRA:AVERAGE:0.5:1:10"])
        .unwrap();
}

#[test]
fn test_create_update_fetch() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("load.rrd").display().to_string();
    let client = Client::new(Native);

    create_db(&client, &path);
    client.update(&path, None, &[format!("{}:42", T + 60)]).unwrap();

    let result = client.fetch(&path, "AVERAGE", T, T + 120, 60).unwrap();
    assert_eq!(result.ds_names(), &["load".to_string()]);
    assert_eq!(result.data.window.step, 60);
    assert_eq!(result.value_at_time(0, T + 60), Some(42.0));

    let info = client.info(&path).unwrap();
    assert_eq!(info.scalar("step").and_then(|v| v.as_u64()), Some(60));
    assert_eq!(
        info.scalar("last_update").and_then(|v| v.as_u64()),
        u64::try_from(T + 60).ok()
    );
    assert!(info.map("ds.type").unwrap().contains_key("load"));
}

#[test]
fn test_invalid_filename_fails_every_operation() {
    let client = Client::new(Native);
    let path = "/nonexistent/dir/load.rrd";

    let errors = [
        client
            .create(path, 60, T, &["DS:load:GAUGE:120:U:U", "RRA:AVERAGE:0.5:1:10"])
            .unwrap_err(),
        client.update(path, None, &[format!("{}:1", T + 60)]).unwrap_err(),
        client.info(path).unwrap_err(),
        client.fetch(path, "AVERAGE", T, T + 120, 60).unwrap_err(),
    ];
    for err in errors {
        let message = err.library_message().unwrap();
        assert!(!message.is_empty());
    }
}

#[test]
fn test_unreachable_daemon_falls_back_to_local() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("load.rrd").display().to_string();
    let client = Client::new(Native).with_daemon(NO_DAEMON).unwrap();

    create_db(&client, &path);
    client.update(&path, None, &[format!("{}:7", T + 60)]).unwrap();
    client.flush(&path).unwrap();

    let via_client = client.fetch(&path, "AVERAGE", T, T + 120, 60).unwrap();
    let local = Client::new(Native)
        .fetch_local(&path, "AVERAGE", T, T + 120, 60)
        .unwrap();
    assert_eq!(via_client.value_at_time(0, T + 60), Some(7.0));
    assert_eq!(via_client.value_at_time(0, T + 60), local.value_at_time(0, T + 60));

    let info = client.info(&path).unwrap();
    assert_eq!(info, client.info_local(&path).unwrap());
}

#[test]
fn test_past_updates_are_skipped() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("load.rrd").display().to_string();
    let client = Client::new(Native);

    create_db(&client, &path);
    let mut updater = Updater::new(path.clone());
    updater.update(&client, &[&(T + 120), &3]).unwrap();
    updater.update(&client, &[&(T + 60), &99]).unwrap();

    let info = client.info(&path).unwrap();
    assert_eq!(
        info.scalar("last_update").and_then(|v| v.as_u64()),
        u64::try_from(T + 120).ok()
    );
}

#[test]
fn test_creator_refuses_existing_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("load.rrd").display().to_string();
    let client = Client::new(Native);
    create_db(&client, &path);

    let mut creator = Creator::new(path, T, 60);
    creator
        .ds("load", "GAUGE", &[&120, &"U", &"U"])
        .rra("AVERAGE", &[&0.5, &1, &10]);
    assert!(creator.create(&client, false).unwrap_err().is_exists());
}

#[test]
fn test_error_messages_do_not_alias() {
    let client = Client::new(Native);

    let first = client.info("/nonexistent/a.rrd").unwrap_err();
    let second = client.info("/nonexistent/b.rrd").unwrap_err();

    let first = first.library_message().unwrap();
    let second = second.library_message().unwrap();
    assert!(first.contains("a.rrd"), "{first}");
    assert!(second.contains("b.rrd"), "{second}");
}

#[test]
fn test_c_abi_error_and_array_accessor() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("load.rrd").display().to_string();
    create_db(&Client::new(Native), &path);

    // A failing call hands back an owned message.
    let missing = CString::new("/nonexistent/c.rrd").unwrap();
    let mut info = ptr::null_mut();
    // SAFETY: all pointers are valid for the duration of the call.
    let err = unsafe { ffi::rrdbind_info(&mut info, missing.as_ptr()) };
    assert!(!err.is_null());
    assert!(info.is_null());
    // SAFETY: err is a NUL-terminated string returned by rrdbind_info.
    let message = unsafe { CStr::from_ptr(err) }.to_string_lossy().into_owned();
    assert!(message.contains("c.rrd"), "{message}");
    // SAFETY: err was returned by rrdbind_info and is released once.
    unsafe { ffi::rrdbind_error_free(err) };

    // A fetch through an unreachable daemon walks the name array.
    let file = CString::new(path).unwrap();
    let daemon = CString::new(NO_DAEMON).unwrap();
    let cf = CString::new("AVERAGE").unwrap();
    let (mut start, mut end) = (T, T + 120);
    let mut step: c_ulong = 60;
    let mut ds_cnt: c_ulong = 0;
    let mut names: *mut *mut c_char = ptr::null_mut();
    let mut data = ptr::null_mut();
    let mut ret: c_int = -1;
    // SAFETY: all pointers are valid for the duration of the call.
    let err = unsafe {
        ffi::rrdbind_daemon_fetch(
            &mut ret,
            daemon.as_ptr(),
            file.as_ptr(),
            cf.as_ptr(),
            &mut start,
            &mut end,
            &mut step,
            &mut ds_cnt,
            &mut names,
            &mut data,
        )
    };
    assert!(err.is_null());
    assert_eq!(ret, 0);
    assert_eq!(ds_cnt, 1);

    // SAFETY: names holds ds_cnt entries written by librrd.
    let first = unsafe { ffi::rrdbind_array_get(names, 0) };
    // SAFETY: entries of the name array are NUL-terminated strings.
    assert_eq!(unsafe { CStr::from_ptr(first) }.to_str().unwrap(), "load");

    // SAFETY: the arrays were allocated by librrd and are released once.
    unsafe {
        rrdbind_sys::rrd_freemem(first.cast());
        rrdbind_sys::rrd_freemem(names.cast());
        rrdbind_sys::rrd_freemem(data.cast());
    }
}
