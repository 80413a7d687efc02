//! The asset tree.
//!
//! Assets are files below `<project>/assets/` that ship to the output
//! unprocessed. They mirror the filesystem: directories have children,
//! files do not. Uninteresting source names are filtered out of
//! listings, with one escape hatch: a URL segment starting with `.`
//! resolves against a source file starting with `_`, so dotfiles like
//! `.htaccess` can be shipped as `_htaccess`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::db::{Database, DbError, Result};
use crate::paths::is_uninteresting_source_name;

/// One node of the asset tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    source_filename: PathBuf,
    /// Public (URL) name; differs from the file name for `_`-mapped files
    name: String,
    is_directory: bool,
}

impl Asset {
    /// The root of a project's asset tree, or `None` when the project
    /// has no `assets/` directory.
    pub fn root(db: &Database) -> Option<Asset> {
        let dir = db.root().join("assets");
        if dir.is_dir() {
            Some(Asset {
                source_filename: dir,
                name: String::new(),
                is_directory: true,
            })
        } else {
            None
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source_filename(&self) -> &Path {
        &self.source_filename
    }

    pub fn is_directory(&self) -> bool {
        self.is_directory
    }

    /// The children of a directory asset, sorted by public name. Files
    /// yield an empty list.
    pub fn children(&self) -> Result<Vec<Asset>> {
        if !self.is_directory {
            return Ok(Vec::new());
        }
        let entries = match std::fs::read_dir(&self.source_filename) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(DbError::io(&self.source_filename, e)),
        };
        let mut rv = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| DbError::io(&self.source_filename, e))?;
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if is_uninteresting_source_name(&name) {
                continue;
            }
            let file_type = entry.file_type().map_err(|e| DbError::io(entry.path(), e))?;
            rv.push(Asset {
                source_filename: entry.path(),
                name,
                is_directory: file_type.is_dir(),
            });
        }
        rv.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rv)
    }

    /// A child by name. With `from_url` set, a `.`-prefixed name also
    /// tries the `_`-prefixed source file.
    pub fn get_child(&self, name: &str, from_url: bool) -> Option<Asset> {
        if !self.is_directory {
            return None;
        }
        if is_uninteresting_source_name(name) {
            if !from_url || !name.starts_with('.') {
                return None;
            }
            let source_name = format!("_{}", &name[1..]);
            let path = self.source_filename.join(&source_name);
            if !path.exists() {
                return None;
            }
            return Some(Asset {
                is_directory: path.is_dir(),
                source_filename: path,
                name: name.to_string(),
            });
        }
        let path = self.source_filename.join(name);
        if !path.exists() {
            return None;
        }
        Some(Asset {
            is_directory: path.is_dir(),
            source_filename: path,
            name: name.to_string(),
        })
    }

    /// Resolve URL segments below this asset.
    pub fn resolve_url_path(&self, url_path: &[&str]) -> Option<Asset> {
        let mut node = self.clone();
        for piece in url_path {
            node = node.get_child(piece, true)?;
        }
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datamodel::DatamodelRegistry;
    use strata_config::ProjectConfig;

    fn project_with_assets(files: &[&str]) -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        for rel in files {
            let path = dir.path().join("assets").join(rel);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, "x").unwrap();
        }
        let db = Database::new(
            dir.path().to_path_buf(),
            ProjectConfig::default(),
            DatamodelRegistry::new(),
        );
        (dir, db)
    }

    #[test]
    fn test_missing_assets_dir() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(
            dir.path().to_path_buf(),
            ProjectConfig::default(),
            DatamodelRegistry::new(),
        );
        assert!(Asset::root(&db).is_none());
    }

    #[test]
    fn test_children_filtered_and_sorted() {
        let (_dir, db) = project_with_assets(&["static/b.css", "static/a.js", "static/_partial"]);
        let root = Asset::root(&db).unwrap();
        let static_dir = root.get_child("static", false).unwrap();
        assert!(static_dir.is_directory());
        let names: Vec<_> = static_dir
            .children()
            .unwrap()
            .into_iter()
            .map(|a| a.name().to_string())
            .collect();
        assert_eq!(names, vec!["a.js", "b.css"]);
    }

    #[test]
    fn test_resolve_url_path() {
        let (_dir, db) = project_with_assets(&["static/css/site.css"]);
        let root = Asset::root(&db).unwrap();
        let asset = root.resolve_url_path(&["static", "css", "site.css"]).unwrap();
        assert!(!asset.is_directory());
        assert_eq!(asset.name(), "site.css");
        assert!(root.resolve_url_path(&["static", "nope"]).is_none());
    }

    #[test]
    fn test_underscore_maps_to_dotfile() {
        let (_dir, db) = project_with_assets(&["_htaccess"]);
        let root = Asset::root(&db).unwrap();
        // Not listed, not reachable by its source name.
        assert!(root.children().unwrap().is_empty());
        assert!(root.get_child("_htaccess", false).is_none());
        // Reachable from the URL side under the dotted name.
        let asset = root.resolve_url_path(&[".htaccess"]).unwrap();
        assert_eq!(asset.name(), ".htaccess");
        assert!(asset.source_filename().ends_with("_htaccess"));
    }
}
