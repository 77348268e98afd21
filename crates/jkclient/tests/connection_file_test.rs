//
// connection_file_test.rs
//
// Copyright (C) 2025 Posit Software, PBC. All rights reserved.
//
//

#[path = "common/mod.rs"]
mod common;

use std::fs;
use std::path::PathBuf;

use common::{connection_info, KEY};
use jkclient::connection_file::{
    read_connection_file, write_connection_file, ConnectionFileProvider, RuntimeDirectories,
};
use jkclient::error::KernelError;
use tempfile::{tempdir, TempDir};

/// A scratch directory with named subdirectories.
struct ScratchDir {
    dir: TempDir,
    path: PathBuf,
}

impl ScratchDir {
    fn new() -> Self {
        let dir = tempdir().unwrap();
        let path = dir.path().to_path_buf();
        Self { dir, path }
    }

    fn child(&self, name: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::create_dir_all(&path).unwrap();
        path
    }
}

#[test]
fn test_read_connection_file() {
    let scratch = ScratchDir::new();
    let path = scratch.path.join("kernel-abc.json");
    fs::write(
        &path,
        r#"{
            "shell_port": 53794,
            "iopub_port": 53795,
            "stdin_port": 53796,
            "control_port": 53797,
            "hb_port": 53798,
            "ip": "127.0.0.1",
            "key": "8b9f6a3e-c9d8b1a0e2f5",
            "transport": "tcp",
            "signature_scheme": "hmac-sha256",
            "kernel_name": "python3"
        }"#,
    )
    .unwrap();

    let info = read_connection_file(&path).unwrap();
    assert_eq!(info.shell_port, 53794);
    assert_eq!(info.control_port, 53797);
    assert_eq!(info.key, "8b9f6a3e-c9d8b1a0e2f5");
    assert_eq!(info.kernel_name.as_deref(), Some("python3"));
}

#[test]
fn test_write_then_read() {
    let scratch = ScratchDir::new();
    let path = scratch.path.join("kernel-written.json");
    let info = connection_info(KEY);
    write_connection_file(&info, &path).unwrap();
    assert_eq!(read_connection_file(&path).unwrap(), info);
}

#[test]
fn test_invalid_connection_files() {
    let scratch = ScratchDir::new();

    let missing = scratch.path.join("missing.json");
    assert!(matches!(
        read_connection_file(&missing),
        Err(KernelError::InvalidDescriptor { path, .. }) if path == missing
    ));

    let garbled = scratch.path.join("garbled.json");
    fs::write(&garbled, "{\"shell_port\": ").unwrap();
    assert!(matches!(
        read_connection_file(&garbled),
        Err(KernelError::InvalidDescriptor { .. })
    ));

    let no_ports = scratch.path.join("no-ports.json");
    fs::write(&no_ports, r#"{"ip": "127.0.0.1", "key": ""}"#).unwrap();
    assert!(matches!(
        read_connection_file(&no_ports),
        Err(KernelError::InvalidDescriptor { .. })
    ));
}

#[test]
fn test_signature_scheme_checked_only_when_signing() {
    let scratch = ScratchDir::new();

    let mut info = connection_info("secret");
    info.signature_scheme = String::from("hmac-md5");
    let path = scratch.path.join("md5.json");
    write_connection_file(&info, &path).unwrap();
    match read_connection_file(&path) {
        Err(KernelError::UnsupportedSignatureScheme(scheme)) => assert_eq!(scheme, "hmac-md5"),
        other => panic!("expected UnsupportedSignatureScheme, got {:?}", other),
    }

    // Without a key nothing is signed, so the scheme doesn't matter
    info.key = String::new();
    let path = scratch.path.join("unsigned.json");
    write_connection_file(&info, &path).unwrap();
    assert!(read_connection_file(&path).is_ok());
}

#[test]
fn test_search_order() {
    let scratch = ScratchDir::new();
    let first = scratch.child("first");
    let second = scratch.child("second");

    let mut early = connection_info(KEY);
    early.shell_port = 1111;
    let mut late = connection_info(KEY);
    late.shell_port = 2222;
    write_connection_file(&late, second.join("kernel-k1.json")).unwrap();
    write_connection_file(&late, second.join("kernel-k2.json")).unwrap();
    write_connection_file(&early, first.join("kernel-k1.json")).unwrap();

    let provider = RuntimeDirectories::with_dirs(vec![first.clone(), second.clone()]);
    assert_eq!(provider.dirs(), &[first.clone(), second.clone()]);
    assert_eq!(provider.find("k1"), Some(first.join("kernel-k1.json")));
    assert_eq!(provider.connection_info("k1").unwrap().shell_port, 1111);
    assert_eq!(provider.connection_info("k2").unwrap().shell_port, 2222);
}

#[test]
fn test_direct_path() {
    let scratch = ScratchDir::new();
    let path = scratch.path.join("elsewhere.json");
    write_connection_file(&connection_info(KEY), &path).unwrap();

    let provider = RuntimeDirectories::with_dirs(Vec::new());
    let kernel_id = path.to_string_lossy().to_string();
    assert_eq!(provider.find(&kernel_id), Some(path.clone()));
    assert_eq!(
        provider.connection_info(&kernel_id).unwrap(),
        connection_info(KEY)
    );
}

#[test]
fn test_not_found() {
    let scratch = ScratchDir::new();
    let provider = RuntimeDirectories::with_dirs(vec![scratch.child("empty")]);
    match provider.connection_info("no-such-kernel") {
        Err(KernelError::DescriptorNotFound(id)) => assert_eq!(id, "no-such-kernel"),
        other => panic!("expected DescriptorNotFound, got {:?}", other),
    }
}

#[test]
fn test_default_dirs_include_ipython_security() {
    let provider = RuntimeDirectories::new();
    assert!(provider
        .dirs()
        .iter()
        .any(|dir| dir.ends_with(".ipython/profile_default/security")));
}
