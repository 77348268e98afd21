//
// connection_file.rs
//
// Copyright (C) 2024 Posit Software, PBC. All rights reserved.
//
//

//! Locating and reading the connection files kernels write on startup.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use directories::BaseDirs;
use jkshared::connection_info::{ConnectionInfo, HMAC_SHA256};

use crate::error::KernelError;

/// Finds the connection details of a running kernel.
pub trait ConnectionFileProvider {
    fn connection_info(&self, kernel_id: &str) -> Result<ConnectionInfo, KernelError>;
}

/// Parse and validate a connection file.
pub fn read_connection_file<P: AsRef<Path>>(path: P) -> Result<ConnectionInfo, KernelError> {
    let path = path.as_ref();
    let invalid = |reason: String| KernelError::InvalidDescriptor {
        path: path.to_path_buf(),
        reason,
    };

    let file = File::open(path).map_err(|err| invalid(err.to_string()))?;
    let reader = BufReader::new(file);
    let info: ConnectionInfo =
        serde_json::from_reader(reader).map_err(|err| invalid(err.to_string()))?;

    if !info.key.is_empty() && info.signature_scheme != HMAC_SHA256 {
        return Err(KernelError::UnsupportedSignatureScheme(
            info.signature_scheme,
        ));
    }
    Ok(info)
}

/// Write `info` as a connection file.
pub fn write_connection_file<P: AsRef<Path>>(
    info: &ConnectionInfo,
    path: P,
) -> Result<(), KernelError> {
    let path = path.as_ref();
    let invalid = |reason: String| KernelError::InvalidDescriptor {
        path: path.to_path_buf(),
        reason,
    };
    let file = File::create(path).map_err(|err| invalid(err.to_string()))?;
    serde_json::to_writer_pretty(file, info).map_err(|err| invalid(err.to_string()))?;
    Ok(())
}

#[cfg(target_os = "macos")]
fn jupyter_dir() -> Option<PathBuf> {
    // On macOS, Jupyter doesn't follow the XDG Base Directory
    // Specification; it stores its data in `~/Library/Jupyter` instead
    // of the "correct" XDG location in `~/Library/Application Support`.
    let base_dir = BaseDirs::new()?;
    Some(base_dir.home_dir().join("Library").join("Jupyter"))
}

#[cfg(not(target_os = "macos"))]
fn jupyter_dir() -> Option<PathBuf> {
    let dir = directories::ProjectDirs::from("Jupyter", "", "")?;
    Some(dir.data_dir().to_path_buf())
}

/// `$XDG_RUNTIME_DIR/jupyter`, where the platform has one.
#[cfg(target_os = "linux")]
fn platform_runtime_dir() -> Option<PathBuf> {
    let dir = directories::ProjectDirs::from("Jupyter", "", "")?;
    dir.runtime_dir().map(|dir| dir.to_path_buf())
}

#[cfg(not(target_os = "linux"))]
fn platform_runtime_dir() -> Option<PathBuf> {
    None
}

/// Finds connection files the way Jupyter does: `kernel-<id>.json` in the
/// runtime directories.
#[derive(Debug, Clone)]
pub struct RuntimeDirectories {
    dirs: Vec<PathBuf>,
}

impl RuntimeDirectories {
    /// The standard search path, most specific first:
    /// `$JUPYTER_RUNTIME_DIR`, the platform runtime directory, the Jupyter
    /// data directory's `runtime`, and the legacy IPython security
    /// directory.
    pub fn new() -> Self {
        let mut dirs = Vec::new();
        if let Some(dir) = std::env::var_os("JUPYTER_RUNTIME_DIR") {
            if !dir.is_empty() {
                dirs.push(PathBuf::from(dir));
            }
        }
        if let Some(dir) = platform_runtime_dir() {
            dirs.push(dir);
        }
        if let Some(dir) = jupyter_dir() {
            dirs.push(dir.join("runtime"));
        }
        if let Some(base_dir) = BaseDirs::new() {
            dirs.push(
                base_dir
                    .home_dir()
                    .join(".ipython")
                    .join("profile_default")
                    .join("security"),
            );
        }
        Self { dirs }
    }

    /// Search only the given directories, in order.
    pub fn with_dirs(dirs: Vec<PathBuf>) -> Self {
        Self { dirs }
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// The connection file for `kernel_id`, if one exists. A `kernel_id`
    /// naming an existing file is taken as that file.
    pub fn find(&self, kernel_id: &str) -> Option<PathBuf> {
        let direct = Path::new(kernel_id);
        if direct.is_file() {
            return Some(direct.to_path_buf());
        }

        let file_name = format!("kernel-{}.json", kernel_id);
        self.dirs
            .iter()
            .map(|dir| dir.join(&file_name))
            .find(|candidate| candidate.is_file())
    }
}

impl Default for RuntimeDirectories {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionFileProvider for RuntimeDirectories {
    fn connection_info(&self, kernel_id: &str) -> Result<ConnectionInfo, KernelError> {
        let path = self.find(kernel_id).ok_or_else(|| {
            log::debug!(
                "No connection file for kernel {} in {:?}",
                kernel_id,
                self.dirs
            );
            KernelError::DescriptorNotFound(kernel_id.to_string())
        })?;
        log::debug!("Reading connection file {}", path.display());
        read_connection_file(path)
    }
}
