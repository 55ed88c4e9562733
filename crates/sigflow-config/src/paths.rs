//! Platform-specific paths for patches and configuration.
//!
//! # Directory Structure
//!
//! - **User patches**: `~/.config/sigflow/patches/` (Linux), `~/Library/Application Support/sigflow/patches/` (macOS), `%APPDATA%\sigflow\patches\` (Windows)
//! - **User config**: the parent of the patches directory, holding `engine.toml`
//!
//! # Example
//!
//! ```rust,no_run
//! use sigflow_config::paths;
//!
//! if let Some(path) = paths::find_patch("cloud") {
//!     println!("Found patch at: {:?}", path);
//! }
//! ```

use std::path::{Path, PathBuf};

/// Application name used for directory paths.
const APP_NAME: &str = "sigflow";

/// Subdirectory name for patches.
const PATCHES_SUBDIR: &str = "patches";

/// Engine settings file name.
const ENGINE_FILE: &str = "engine.toml";

/// Extensions recognised as patch files.
const PATCH_EXTENSIONS: &[&str] = &["toml", "json"];

/// Returns the user-specific configuration directory.
///
/// Returns a fallback path if the config directory cannot be determined.
pub fn user_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Returns the user-specific patches directory.
pub fn user_patches_dir() -> PathBuf {
    user_config_dir().join(PATCHES_SUBDIR)
}

/// Path of the user's engine settings file.
pub fn user_engine_config() -> PathBuf {
    user_config_dir().join(ENGINE_FILE)
}

/// Find a patch file by name.
///
/// Searches in the following order:
/// 1. `name` as a path
/// 2. `name` with a `.toml` or `.json` extension appended
/// 3. The same names inside the user patches directory
pub fn find_patch(name: &str) -> Option<PathBuf> {
    find_patch_in(name, &user_patches_dir())
}

fn find_patch_in(name: &str, dir: &Path) -> Option<PathBuf> {
    let path = PathBuf::from(name);
    if path.is_file() {
        return Some(path);
    }

    let candidates = || {
        PATCH_EXTENSIONS
            .iter()
            .map(move |ext| PathBuf::from(format!("{name}.{ext}")))
    };

    candidates()
        .find(|p| p.is_file())
        .or_else(|| {
            std::iter::once(PathBuf::from(name))
                .chain(candidates())
                .map(|p| dir.join(p))
                .find(|p| p.is_file())
        })
}

/// Ensure the user patches directory exists.
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
pub fn ensure_user_patches_dir() -> Result<PathBuf, crate::ConfigError> {
    let dir = user_patches_dir();

    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| crate::ConfigError::create_dir(&dir, e))?;
    }

    Ok(dir)
}

/// List all patch files in the user patches directory.
///
/// Returns an empty vector if the directory doesn't exist or can't be read.
pub fn list_user_patches() -> Vec<PathBuf> {
    list_patches_in_dir(&user_patches_dir())
}

fn list_patches_in_dir(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut patches: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| PATCH_EXTENSIONS.contains(&ext))
        })
        .collect();
    patches.sort();
    patches
}

/// Get the patch name from a file path.
///
/// ```rust
/// use sigflow_config::paths::patch_name_from_path;
/// use std::path::Path;
///
/// let name = patch_name_from_path(Path::new("/path/to/cloud.toml"));
/// assert_eq!(name, Some("cloud".to_string()));
/// ```
pub fn patch_name_from_path(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_user_dirs() {
        assert!(user_config_dir().to_string_lossy().contains("sigflow"));
        assert!(user_patches_dir().ends_with("sigflow/patches"));
        assert!(user_engine_config().ends_with("sigflow/engine.toml"));
    }

    #[test]
    fn test_find_patch_by_path() {
        let temp_dir = TempDir::new().unwrap();
        let patch_path = temp_dir.path().join("test.toml");
        fs::write(&patch_path, "name = \"test\"").unwrap();

        assert_eq!(find_patch(patch_path.to_str().unwrap()), Some(patch_path));
    }

    #[test]
    fn test_find_patch_appends_extension() {
        let temp_dir = TempDir::new().unwrap();
        let patch_path = temp_dir.path().join("cloud.json");
        fs::write(&patch_path, "{}").unwrap();

        let bare = temp_dir.path().join("cloud");
        assert_eq!(find_patch(bare.to_str().unwrap()), Some(patch_path));
    }

    #[test]
    fn test_find_patch_in_dir() {
        let temp_dir = TempDir::new().unwrap();
        let patch_path = temp_dir.path().join("drone_zz_1234.toml");
        fs::write(&patch_path, "").unwrap();

        assert_eq!(
            find_patch_in("drone_zz_1234", temp_dir.path()),
            Some(patch_path)
        );
        assert_eq!(find_patch_in("missing_zz_1234", temp_dir.path()), None);
    }

    #[test]
    fn test_list_patches_in_dir() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("b.toml"), "").unwrap();
        fs::write(temp_dir.path().join("a.json"), "").unwrap();
        fs::write(temp_dir.path().join("notes.txt"), "").unwrap();

        let patches = list_patches_in_dir(temp_dir.path());
        assert_eq!(patches.len(), 2);
        assert!(patches[0].ends_with("a.json"));
    }

    #[test]
    fn test_list_patches_nonexistent_dir() {
        assert!(list_patches_in_dir(Path::new("/nonexistent/path/12345")).is_empty());
    }

    #[test]
    fn test_patch_name_from_path() {
        let path = Path::new("simple.json");
        assert_eq!(patch_name_from_path(path), Some("simple".to_string()));
    }
}
