use std::fs;
use std::path::{Path, PathBuf};

/// Get the socket path for the host bridge
///
/// Priority:
/// 1. `COBRO_SOCKET` environment variable (if set)
/// 2. `$XDG_RUNTIME_DIR/cobro.sock` (if XDG_RUNTIME_DIR is set)
/// 3. `/tmp/cobro.sock` (fallback)
pub fn socket_path() -> PathBuf {
    if let Ok(path) = std::env::var("COBRO_SOCKET") {
        return PathBuf::from(path);
    }
    dirs::runtime_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("cobro.sock")
}

pub fn remove_socket(path: &Path) {
    let _ = fs::remove_file(path);
}
