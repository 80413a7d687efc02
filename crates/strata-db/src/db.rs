//! The database: stateless access to the content tree on disk.
//!
//! A [`Database`] owns the project root, configuration and datamodel
//! registry, and knows how to turn a content path into raw field data.
//! It holds no record cache and no mutable state; per-build-pass state
//! lives on the [`Pad`](crate::pad::Pad) it spawns.

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use strata_config::{ConfigError, ProjectConfig};

use crate::datamodel::{DatamodelError, DatamodelRegistry};
use crate::metaformat;
use crate::pad::Pad;
use crate::paths;
use crate::record::PRIMARY_ALT;

/// Extension of content/metadata files, without the dot.
pub const CONTENT_EXT: &str = "str";

/// Name of the content file inside a page directory.
pub const CONTENT_FILENAME: &str = "contents.str";

/// Errors raised by the content database.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Datamodel(#[from] DatamodelError),
}

impl DbError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DbError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, DbError>;

/// Raw field data loaded from disk, before datamodel processing.
#[derive(Debug)]
pub struct RawRecord {
    /// Raw text fields, reserved fields included
    pub data: BTreeMap<String, String>,
    pub is_attachment: bool,
}

/// A child item found while scanning a page directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildItem {
    pub id: String,
    pub is_attachment: bool,
}

/// One filename candidate for loading a record.
struct Candidate {
    fs_path: PathBuf,
    /// Which alternative this candidate file belongs to
    alt_name: String,
    is_attachment: bool,
}

/// Stateless loader for a content tree.
#[derive(Debug)]
pub struct Database {
    root: PathBuf,
    config: ProjectConfig,
    datamodels: DatamodelRegistry,
}

impl Database {
    /// Open a project: load `strata.toml` and the `models/` directory.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let config = ProjectConfig::for_project(&root)?;
        let datamodels = DatamodelRegistry::load(&root)?;
        info!(root = %root.display(), "opened content database");
        Ok(Self::new(root, config, datamodels))
    }

    pub fn new(root: PathBuf, config: ProjectConfig, datamodels: DatamodelRegistry) -> Self {
        Self {
            root,
            config,
            datamodels,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The directory holding the content tree.
    pub fn content_root(&self) -> PathBuf {
        self.root.join("content")
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    pub fn datamodels(&self) -> &DatamodelRegistry {
        &self.datamodels
    }

    /// Map a content path to its filesystem location.
    pub fn to_fs_path(&self, path: &str) -> PathBuf {
        paths::to_fs_path(&self.content_root(), path)
    }

    /// Spawn a pad over this database.
    pub fn new_pad(self: &Arc<Self>) -> Pad {
        Pad::new(self.clone())
    }

    /// Filename candidates for `(path, alt)`, in resolution order:
    /// alternative page file, primary page file, alternative attachment
    /// metadata, primary attachment metadata. With `fallback` disabled
    /// only the exact alternative's files are candidates.
    fn filename_candidates(&self, path: &str, alt: &str, fallback: bool) -> Vec<Candidate> {
        let fs_base = self.to_fs_path(path);
        let want_alt = alt != PRIMARY_ALT && self.config.alternatives.is_valid_alternative(alt);
        let want_primary = fallback || alt == PRIMARY_ALT;
        let mut rv = Vec::new();

        if want_alt {
            rv.push(Candidate {
                fs_path: fs_base.join(format!("contents+{alt}.{CONTENT_EXT}")),
                alt_name: alt.to_string(),
                is_attachment: false,
            });
        }
        if want_primary {
            rv.push(Candidate {
                fs_path: fs_base.join(CONTENT_FILENAME),
                alt_name: PRIMARY_ALT.to_string(),
                is_attachment: false,
            });
        }
        if want_alt {
            rv.push(Candidate {
                fs_path: sibling_with_suffix(&fs_base, &format!("+{alt}.{CONTENT_EXT}")),
                alt_name: alt.to_string(),
                is_attachment: true,
            });
        }
        if want_primary {
            rv.push(Candidate {
                fs_path: sibling_with_suffix(&fs_base, &format!(".{CONTENT_EXT}")),
                alt_name: PRIMARY_ALT.to_string(),
                is_attachment: true,
            });
        }
        rv
    }

    /// Load the raw field data for a record, or `None` when no content
    /// exists at the path.
    ///
    /// The first candidate that exists on disk wins outright: an
    /// alternative file replaces the primary content as a whole, never
    /// field by field. Within one file the last write for a duplicate
    /// key wins. An attachment whose binary exists without a metadata
    /// file still yields an (empty) record.
    pub fn load_raw_data(
        &self,
        path: &str,
        alt: &str,
        fallback: bool,
    ) -> Result<Option<RawRecord>> {
        let path = paths::cleanup_path(path);
        let binary_path = self.to_fs_path(&path);
        let mut data: BTreeMap<String, String> = BTreeMap::new();
        let mut rv_type: Option<bool> = None;

        for candidate in self.filename_candidates(&path, alt, fallback) {
            match std::fs::read_to_string(&candidate.fs_path) {
                Ok(text) => {
                    for (key, value) in metaformat::tokenize(&text) {
                        data.insert(key, value);
                    }
                    data.insert("_source_alt".to_string(), candidate.alt_name);
                    rv_type = Some(candidate.is_attachment);
                    break;
                }
                Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory) => {
                    // An attachment binary without metadata still counts,
                    // anchored at the primary metadata candidate.
                    if candidate.is_attachment
                        && candidate.alt_name == PRIMARY_ALT
                        && binary_path.is_file()
                    {
                        data.insert("_source_alt".to_string(), candidate.alt_name);
                        rv_type = Some(true);
                        break;
                    }
                }
                Err(e) => return Err(DbError::io(candidate.fs_path, e)),
            }
        }

        let Some(is_attachment) = rv_type else {
            return Ok(None);
        };

        data.insert("_path".to_string(), path.clone());
        data.insert("_id".to_string(), paths::basename(&path).to_string());
        data.insert("_gid".to_string(), path_group_id(&path));
        data.insert("_alt".to_string(), alt.to_string());
        if is_attachment {
            data.insert("_attachment_for".to_string(), paths::dirname(&path));
        }
        debug!(path = %path, alt, is_attachment, "loaded raw record data");
        Ok(Some(RawRecord {
            data,
            is_attachment,
        }))
    }

    /// Scan a page directory for child items, sorted by id.
    ///
    /// Subdirectories count as child pages only when they carry a
    /// content file for the primary or the requested alternative; plain
    /// files are attachment candidates. Content/metadata files and
    /// uninteresting source names are skipped. A missing directory
    /// scans as empty.
    pub fn iter_items(&self, path: &str, alt: &str) -> Result<Vec<ChildItem>> {
        let dir = self.to_fs_path(&paths::cleanup_path(path));
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory) => {
                return Ok(Vec::new());
            }
            Err(e) => return Err(DbError::io(dir, e)),
        };

        let mut rv = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| DbError::io(&dir, e))?;
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if paths::is_uninteresting_source_name(&name) {
                continue;
            }
            let file_type = entry.file_type().map_err(|e| DbError::io(entry.path(), e))?;
            if file_type.is_dir() {
                if self.dir_has_content_file(&entry.path(), alt) {
                    rv.push(ChildItem {
                        id: name,
                        is_attachment: false,
                    });
                }
            } else if !name.ends_with(&format!(".{CONTENT_EXT}")) {
                rv.push(ChildItem {
                    id: name,
                    is_attachment: true,
                });
            }
        }
        rv.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(rv)
    }

    /// Whether a directory holds a content file for the primary or the
    /// given alternative.
    fn dir_has_content_file(&self, dir: &Path, alt: &str) -> bool {
        if dir.join(CONTENT_FILENAME).is_file() {
            return true;
        }
        alt != PRIMARY_ALT
            && self.config.alternatives.is_valid_alternative(alt)
            && dir.join(format!("contents+{alt}.{CONTENT_EXT}")).is_file()
    }
}

/// Stable group id of a content path, shared across alternatives.
fn path_group_id(path: &str) -> String {
    let digest = Sha256::digest(path.as_bytes());
    let mut rv = String::with_capacity(digest.len() * 2);
    for byte in digest {
        rv.push_str(&format!("{byte:02x}"));
    }
    rv
}

/// `base` with `suffix` appended to its final component.
fn sibling_with_suffix(base: &Path, suffix: &str) -> PathBuf {
    let mut os = base.as_os_str().to_os_string();
    os.push(suffix);
    PathBuf::from(os)
}
