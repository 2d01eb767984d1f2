//! Manual mock discovery.
//!
//! Two layouts are recognized, mirroring the `__mocks__` convention:
//!
//! - local modules: `src/__mocks__/api.ts` next to `src/api.ts`;
//! - packages (or modules that do not exist on disk): `<root>/__mocks__/lodash.js`,
//!   `<root>/__mocks__/@scope/pkg.ts` or `<root>/__mocks__/lodash/index.js`.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::paths::is_bare_specifier;

/// Find the manual mock file for a registration
pub(crate) async fn find_mock_redirect(
    root: &Path,
    specifier: &str,
    absolute_path: &Path,
    mocks_dir_name: &str,
) -> Option<PathBuf> {
    let external = is_bare_specifier(specifier);

    if external || !is_file(absolute_path).await {
        let reference = if external {
            PathBuf::from(specifier)
        } else {
            absolute_path.to_path_buf()
        };
        let folder = match reference.parent() {
            Some(parent) if external => root.join(mocks_dir_name).join(parent),
            _ => root.join(mocks_dir_name),
        };
        let stem = reference.file_name()?.to_string_lossy().into_owned();
        return find_in_folder(&folder, &stem).await;
    }

    let dir = absolute_path.parent()?;
    let file_name = absolute_path.file_name()?;
    let mocks_dir = dir.join(mocks_dir_name);

    let exact = mocks_dir.join(file_name);
    if is_file(&exact).await {
        return Some(exact);
    }

    // `./api` registered, `api.ts` resolved, `__mocks__/api.js` written
    let stem = absolute_path.file_stem()?.to_string_lossy().into_owned();
    find_file_by_stem(&mocks_dir, &stem).await
}

/// Look in a package mock folder, descending once into a matching directory
async fn find_in_folder(folder: &Path, stem: &str) -> Option<PathBuf> {
    for entry in sorted_entries(folder).await {
        if entry_stem(&entry).as_deref() != Some(stem) && entry.file_name() != Some(OsStr::new(stem)) {
            continue;
        }
        if is_file(&entry).await {
            return Some(entry);
        }
        if is_dir(&entry).await {
            if let Some(index) = find_file_by_stem(&entry, "index").await {
                return Some(index);
            }
        }
    }
    None
}

async fn find_file_by_stem(dir: &Path, stem: &str) -> Option<PathBuf> {
    for entry in sorted_entries(dir).await {
        if entry_stem(&entry).as_deref() == Some(stem) && is_file(&entry).await {
            return Some(entry);
        }
    }
    None
}

/// Directory entries sorted by name so lookups are deterministic
async fn sorted_entries(dir: &Path) -> Vec<PathBuf> {
    let mut entries = Vec::new();
    let Ok(mut read_dir) = fs::read_dir(dir).await else {
        return entries;
    };
    while let Ok(Some(entry)) = read_dir.next_entry().await {
        entries.push(entry.path());
    }
    entries.sort();
    entries
}

fn entry_stem(path: &Path) -> Option<String> {
    path.file_stem().map(|s| s.to_string_lossy().into_owned())
}

async fn is_file(path: &Path) -> bool {
    fs::metadata(path).await.map(|m| m.is_file()).unwrap_or(false)
}

async fn is_dir(path: &Path) -> bool {
    fs::metadata(path).await.map(|m| m.is_dir()).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs as std_fs;
    use tempfile::TempDir;

    fn write(path: &Path, content: &str) {
        std_fs::create_dir_all(path.parent().unwrap()).unwrap();
        std_fs::write(path, content).unwrap();
    }

    #[tokio::test]
    async fn test_local_sibling_mock() {
        let dir = TempDir::new().unwrap();
        let module = dir.path().join("src/api.ts");
        let mock = dir.path().join("src/__mocks__/api.ts");
        write(&module, "export const a = 1;");
        write(&mock, "export const a = 2;");

        let found = find_mock_redirect(dir.path(), "./api", &module, "__mocks__").await;
        assert_eq!(found, Some(mock));
    }

    #[tokio::test]
    async fn test_local_sibling_mock_with_other_extension() {
        let dir = TempDir::new().unwrap();
        let module = dir.path().join("src/api.ts");
        let mock = dir.path().join("src/__mocks__/api.js");
        write(&module, "export const a = 1;");
        write(&mock, "export const a = 2;");

        let found = find_mock_redirect(dir.path(), "./api", &module, "__mocks__").await;
        assert_eq!(found, Some(mock));
    }

    #[tokio::test]
    async fn test_no_mock() {
        let dir = TempDir::new().unwrap();
        let module = dir.path().join("src/api.ts");
        write(&module, "export const a = 1;");

        let found = find_mock_redirect(dir.path(), "./api", &module, "__mocks__").await;
        assert_eq!(found, None);
    }

    #[tokio::test]
    async fn test_package_mock_in_root() {
        let dir = TempDir::new().unwrap();
        let module = dir.path().join("node_modules/lodash/lodash.js");
        let mock = dir.path().join("__mocks__/lodash.js");
        write(&module, "module.exports = {};");
        write(&mock, "export default {};");

        let found = find_mock_redirect(dir.path(), "lodash", &module, "__mocks__").await;
        assert_eq!(found, Some(mock));
    }

    #[tokio::test]
    async fn test_scoped_package_directory_mock() {
        let dir = TempDir::new().unwrap();
        let module = dir.path().join("node_modules/@scope/pkg/index.js");
        let mock = dir.path().join("__mocks__/@scope/pkg/index.ts");
        write(&module, "export {};");
        write(&mock, "export {};");

        let found = find_mock_redirect(dir.path(), "@scope/pkg", &module, "__mocks__").await;
        assert_eq!(found, Some(mock));
    }
}
