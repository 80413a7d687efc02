//! Edit sessions.
//!
//! An [`EditSession`] stages field changes against one record's content
//! file and writes them back through the metaformat serializer on
//! [`commit`](EditSession::commit). Sessions are alternative-exact: a
//! session for `de` reads and writes only the `+de` file, never the
//! primary fallback, so editing an alternative cannot clobber the
//! primary content.

use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::info;

use crate::db::{DbError, Result, CONTENT_EXT, CONTENT_FILENAME};
use crate::metaformat;
use crate::pad::Pad;
use crate::paths;
use crate::record::PRIMARY_ALT;

/// Reserved fields derived at load time; never written back to disk.
const COMPUTED_FIELDS: &[&str] = &[
    "_path",
    "_id",
    "_gid",
    "_alt",
    "_source_alt",
    "_attachment_for",
];

/// A staged edit of one record's content file.
#[derive(Debug)]
pub struct EditSession<'a> {
    pad: &'a Pad,
    path: String,
    alt: String,
    exists: bool,
    is_attachment: bool,
    original: BTreeMap<String, String>,
    /// Staged changes; `None` marks a field deletion
    changes: BTreeMap<String, Option<String>>,
}

impl<'a> EditSession<'a> {
    /// Start a session for `(path, alt)`. The record does not have to
    /// exist yet; committing a session for a missing page creates it.
    pub fn new(pad: &'a Pad, path: &str, alt: &str) -> Result<Self> {
        let path = paths::cleanup_path(path);
        let exact = pad.db().load_raw_data(&path, alt, false)?;
        let (exists, is_attachment, mut original) = match exact {
            Some(raw) => (true, raw.is_attachment, raw.data),
            None => {
                // The record type still follows the primary content when
                // only the alternative file is missing.
                match pad.db().load_raw_data(&path, alt, true)? {
                    Some(raw) => (false, raw.is_attachment, BTreeMap::new()),
                    None => (false, false, BTreeMap::new()),
                }
            }
        };
        for key in COMPUTED_FIELDS {
            original.remove(*key);
        }
        Ok(Self {
            pad,
            path,
            alt: alt.to_string(),
            exists,
            is_attachment,
            original,
            changes: BTreeMap::new(),
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn alt(&self) -> &str {
        &self.alt
    }

    /// Whether the edited file existed when the session started.
    pub fn exists(&self) -> bool {
        self.exists
    }

    pub fn is_attachment(&self) -> bool {
        self.is_attachment
    }

    /// The current value of a field, staged changes applied.
    pub fn get(&self, key: &str) -> Option<&str> {
        match self.changes.get(key) {
            Some(staged) => staged.as_deref(),
            None => self.original.get(key).map(String::as_str),
        }
    }

    /// Stage a field value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.changes.insert(key.into(), Some(value.into()));
    }

    /// Stage a field deletion.
    pub fn delete_field(&mut self, key: &str) {
        self.changes.insert(key.to_string(), None);
    }

    /// Whether any change is staged.
    pub fn is_dirty(&self) -> bool {
        !self.changes.is_empty()
    }

    /// The file this session writes.
    fn target_filename(&self) -> PathBuf {
        let fs_path = self.pad.db().to_fs_path(&self.path);
        if self.is_attachment {
            let suffix = if self.alt == PRIMARY_ALT {
                format!(".{CONTENT_EXT}")
            } else {
                format!("+{}.{CONTENT_EXT}", self.alt)
            };
            let mut os = fs_path.into_os_string();
            os.push(suffix);
            PathBuf::from(os)
        } else if self.alt == PRIMARY_ALT {
            fs_path.join(CONTENT_FILENAME)
        } else {
            fs_path.join(format!("contents+{}.{CONTENT_EXT}", self.alt))
        }
    }

    /// Write the staged state to disk.
    ///
    /// An attachment metadata file with no remaining fields is removed
    /// instead of being written empty. The pad's record cache is flushed
    /// so stale field data cannot survive the edit.
    pub fn commit(self) -> Result<()> {
        let mut fields = self.original.clone();
        for (key, staged) in &self.changes {
            match staged {
                Some(value) => {
                    fields.insert(key.clone(), value.clone());
                }
                None => {
                    fields.remove(key);
                }
            }
        }

        let target = self.target_filename();
        if fields.is_empty() && self.is_attachment {
            if target.is_file() {
                std::fs::remove_file(&target).map_err(|e| DbError::io(&target, e))?;
            }
        } else {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent).map_err(|e| DbError::io(parent, e))?;
            }
            let text =
                metaformat::serialize(fields.iter().map(|(k, v)| (k.as_str(), v.as_str())));
            std::fs::write(&target, text).map_err(|e| DbError::io(&target, e))?;
        }

        info!(path = %self.path, alt = %self.alt, file = %target.display(), "committed edit");
        self.pad.cache().flush();
        Ok(())
    }

    /// Drop all staged changes without touching disk.
    pub fn discard(self) {}
}

impl Pad {
    /// Start an edit session for a record.
    pub fn edit(&self, path: &str, alt: &str) -> Result<EditSession<'_>> {
        EditSession::new(self, path, alt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use std::sync::Arc;

    #[test]
    fn test_edit_existing_page() {
        let dir = tempfile::tempdir().unwrap();
        let content = dir.path().join("content").join("about");
        std::fs::create_dir_all(&content).unwrap();
        std::fs::write(content.join("contents.str"), "title: About\n").unwrap();
        let db = Arc::new(Database::open(dir.path().to_path_buf()).unwrap());
        let pad = db.new_pad();

        let mut session = pad.edit("/about", PRIMARY_ALT).unwrap();
        assert!(session.exists());
        assert_eq!(session.get("title"), Some("About"));
        session.set("title", "About Us");
        session.set("body", "Hello");
        assert!(session.is_dirty());
        session.commit().unwrap();

        let record = pad.get("/about").unwrap().unwrap();
        assert_eq!(record.field("title").as_str(), Some("About Us"));
        assert_eq!(record.field("body").as_str(), Some("Hello"));
    }

    #[test]
    fn test_edit_creates_page() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("content")).unwrap();
        let db = Arc::new(Database::open(dir.path().to_path_buf()).unwrap());
        let pad = db.new_pad();

        let mut session = pad.edit("/new-page", PRIMARY_ALT).unwrap();
        assert!(!session.exists());
        session.set("title", "New");
        session.commit().unwrap();

        let record = pad.get("/new-page").unwrap().unwrap();
        assert_eq!(record.field("title").as_str(), Some("New"));
    }

    #[test]
    fn test_delete_last_attachment_field_removes_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let content = dir.path().join("content");
        std::fs::create_dir_all(&content).unwrap();
        std::fs::write(content.join("contents.str"), "title: Home\n").unwrap();
        std::fs::write(content.join("photo.jpg"), "binary").unwrap();
        std::fs::write(content.join("photo.jpg.str"), "caption: Hi\n").unwrap();
        let db = Arc::new(Database::open(dir.path().to_path_buf()).unwrap());
        let pad = db.new_pad();

        let mut session = pad.edit("/photo.jpg", PRIMARY_ALT).unwrap();
        assert!(session.is_attachment());
        session.delete_field("caption");
        session.commit().unwrap();

        assert!(!content.join("photo.jpg.str").exists());
        // The attachment record itself survives via its binary.
        let record = pad.get("/photo.jpg").unwrap().unwrap();
        assert!(record.is_attachment());
    }

    #[test]
    fn test_alternative_session_is_exact() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("strata.toml"),
            "[alternatives]\nprimary = \"en\"\n\n[alternatives.entries.en]\nurl_prefix = \"/\"\n\n[alternatives.entries.de]\nurl_prefix = \"/de/\"\n",
        )
        .unwrap();
        let content = dir.path().join("content").join("about");
        std::fs::create_dir_all(&content).unwrap();
        std::fs::write(content.join("contents.str"), "title: About\n").unwrap();
        let db = Arc::new(Database::open(dir.path().to_path_buf()).unwrap());
        let pad = db.new_pad();

        let mut session = pad.edit("/about", "de").unwrap();
        // The primary file exists but the de file does not.
        assert!(!session.exists());
        assert_eq!(session.get("title"), None);
        session.set("title", "Uber uns");
        session.commit().unwrap();

        assert!(content.join("contents+de.str").is_file());
        // Primary stays untouched.
        let primary = std::fs::read_to_string(content.join("contents.str")).unwrap();
        assert_eq!(primary, "title: About\n");
    }
}
