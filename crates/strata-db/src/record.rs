//! Records: the in-memory representation of one content node.
//!
//! A record is identified by `(path, alt)` and owns a field map produced
//! by datamodel resolution. The variant set is closed: a `Page` is a
//! directory-backed node with children and attachments, an `Attachment`
//! is a flat node tied to its parent page, and an `Image` is an
//! attachment that can introspect its backing binary.
//!
//! Records are shared as `Arc<Record>` so a persistent cache hit returns
//! the same object identity for the lifetime of the pad. Field data sits
//! behind a lock; mutation promotes the record to the persistent cache
//! tier first so edits cannot be lost to LRU eviction.

use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::datamodel::Datamodel;
use crate::db::{Database, Result};
use crate::images::ImageInfo;
use crate::pad::Pad;
use crate::paths;
use crate::query::{AttachmentsQuery, Query};
use crate::sort::SortKey;
use crate::value::Value;

/// The sentinel alternative used when no alternative system is configured
/// or the primary variant is meant.
pub const PRIMARY_ALT: &str = "_primary";

/// Closed set of record variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Page,
    Attachment,
    Image,
}

/// A loaded content record.
#[derive(Debug)]
pub struct Record {
    kind: RecordKind,
    data: RwLock<BTreeMap<String, Value>>,
    /// Lazily computed image header info (image attachments only)
    image_info: OnceCell<Option<ImageInfo>>,
}

/// Shared record handle; cache identity is `Arc` identity.
pub type SharedRecord = Arc<Record>;

impl Record {
    pub fn new(kind: RecordKind, data: BTreeMap<String, Value>) -> Self {
        Self {
            kind,
            data: RwLock::new(data),
            image_info: OnceCell::new(),
        }
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    pub fn is_attachment(&self) -> bool {
        self.kind != RecordKind::Page
    }

    /// A field value, or an undefined marker naming the record and field.
    pub fn field(&self, name: &str) -> Value {
        match self.data.read().get(name) {
            Some(value) => value.clone(),
            None => Value::undefined(format!(
                "field '{}' is undefined on record '{}'",
                name,
                self.path()
            )),
        }
    }

    /// A field value, `None` when the field is not present at all.
    pub fn get(&self, name: &str) -> Option<Value> {
        self.data.read().get(name).cloned()
    }

    /// Whether a field is present and defined.
    pub fn has_field(&self, name: &str) -> bool {
        self.data
            .read()
            .get(name)
            .is_some_and(|v| !v.is_undefined())
    }

    /// Set a field. The record is promoted to the persistent cache tier
    /// first so the mutation survives ephemeral eviction.
    pub fn set_field(self: &Arc<Self>, pad: &Pad, name: impl Into<String>, value: Value) {
        pad.cache().persist_if_cached(self);
        self.data.write().insert(name.into(), value);
    }

    /// Remove a field; promotes like [`Record::set_field`].
    pub fn delete_field(self: &Arc<Self>, pad: &Pad, name: &str) {
        pad.cache().persist_if_cached(self);
        self.data.write().remove(name);
    }

    /// A clone of the full field map.
    pub fn to_dict(&self) -> BTreeMap<String, Value> {
        self.data.read().clone()
    }

    pub fn path(&self) -> String {
        self.field("_path").to_display_string()
    }

    /// The last path segment; empty for the root.
    pub fn id(&self) -> String {
        self.field("_id").to_display_string()
    }

    /// Stable group id: hash of the path alone, shared across alternates.
    pub fn gid(&self) -> String {
        self.field("_gid").to_display_string()
    }

    pub fn alt(&self) -> String {
        self.field("_alt").to_display_string()
    }

    pub fn model_name(&self) -> String {
        self.field("_model").to_display_string()
    }

    /// The URL segment this record contributes.
    pub fn slug(&self) -> String {
        self.field("_slug").to_display_string()
    }

    pub fn template_name(&self) -> String {
        self.field("_template").to_display_string()
    }

    /// The datamodel for this record; unknown model names fall back to
    /// the global default.
    pub fn datamodel(&self, pad: &Pad) -> Arc<Datamodel> {
        pad.db()
            .datamodels()
            .get(&self.model_name())
            .unwrap_or_else(|| pad.db().datamodels().default_model())
    }

    /// The parent record: the page at `dirname(path)` for pages (the root
    /// has none), the page at `_attachment_for` for attachments.
    pub fn parent(&self, pad: &Pad) -> Result<Option<SharedRecord>> {
        let persist = pad.cache().is_persistent_key(&self.path(), &self.alt());
        let parent_path = if self.is_attachment() {
            let parent = self.field("_attachment_for").to_display_string();
            if parent.is_empty() {
                return Ok(None);
            }
            parent
        } else {
            let path = self.path();
            let parent = paths::dirname(&path);
            if parent == path {
                return Ok(None);
            }
            parent
        };
        pad.get_with_persist(&parent_path, &self.alt(), persist)
    }

    /// Every record from the root down to this one, inclusive.
    pub fn iter_record_path(self: &Arc<Self>, pad: &Pad) -> Result<Vec<SharedRecord>> {
        let mut rv = vec![self.clone()];
        let mut node = self.clone();
        while let Some(parent) = node.parent(pad)? {
            rv.push(parent.clone());
            node = parent;
        }
        rv.reverse();
        Ok(rv)
    }

    /// Whether this record lives at or below `path`.
    pub fn is_child_of(&self, path: &str) -> bool {
        let this = paths::cleanup_path(&self.path());
        let crumbs = paths::cleanup_path(path);
        this == crumbs || this.starts_with(&format!("{}/", crumbs.trim_end_matches('/')))
    }

    /// Hidden records are skipped by builds: either the record's own
    /// `_hidden` field, or inherited through the hierarchy. A page is
    /// hidden when any record on its ancestor chain (itself included)
    /// has an unexposed datamodel; an attachment without an explicit
    /// `_hidden` simply follows its parent page, since its own model is
    /// usually the unexposed default.
    pub fn is_hidden(self: &Arc<Self>, pad: &Pad) -> Result<bool> {
        let own = self.field("_hidden");
        if !own.is_undefined() {
            return Ok(own.is_truthy());
        }

        if self.is_attachment() {
            return match self.parent(pad)? {
                Some(parent) => parent.is_hidden(pad),
                None => Ok(false),
            };
        }

        let mut node = self.clone();
        loop {
            if !node.datamodel(pad).expose {
                return Ok(true);
            }
            match node.parent(pad)? {
                Some(parent) => node = parent,
                None => return Ok(false),
            }
        }
    }

    pub fn is_visible(self: &Arc<Self>, pad: &Pad) -> Result<bool> {
        Ok(!self.is_hidden(pad)?)
    }

    /// The URL path: slash-joined slugs from the root to this record.
    /// Pages end with a trailing slash, attachments do not.
    pub fn url_path(self: &Arc<Self>, pad: &Pad) -> Result<String> {
        let mut bits = Vec::new();
        let mut node = Some(self.clone());
        while let Some(current) = node {
            bits.push(current.slug());
            node = current.parent(pad)?;
        }
        bits.reverse();
        let joined = bits.join("/");
        let trimmed = joined.trim_matches('/');
        let mut rv = format!("/{trimmed}");
        if self.kind == RecordKind::Page && !rv.ends_with('/') {
            rv.push('/');
        }
        Ok(rv)
    }

    /// Human-facing label: the datamodel's formatted label when set, else
    /// a humanized `_id` for pages (`(Index)` at the root) or the raw
    /// `_id` for attachments.
    pub fn record_label(&self, pad: &Pad) -> String {
        let data = self.to_dict();
        if let Some(label) = self.datamodel(pad).format_record_label(&data) {
            return label;
        }
        let id = self.id();
        if self.is_attachment() {
            return id;
        }
        if id.is_empty() {
            return "(Index)".to_string();
        }
        humanize_id(&id)
    }

    /// Build a multi-field sort key. A leading `-` reverses that field,
    /// a leading `+` is accepted and ignored.
    pub fn get_sort_key(&self, fields: &[impl AsRef<str>]) -> Vec<SortKey> {
        fields
            .iter()
            .map(|field| {
                let field = field.as_ref();
                let (name, reverse) = match field.strip_prefix('-') {
                    Some(name) => (name, true),
                    None => (field.trim_start_matches('+'), false),
                };
                SortKey::new(self.field(name), reverse)
            })
            .collect()
    }

    /// All children, hidden included. A datamodel-declared replacement
    /// query takes over when configured.
    pub fn all_children(&self, pad: &Pad) -> Query {
        let model = self.datamodel(pad);
        if let Some(replacement) = model.child_config.replaced_with.as_deref() {
            return Query::new(&paths::cleanup_path(replacement), &self.alt());
        }
        Query::new(&self.path(), &self.alt())
    }

    /// The visible children.
    pub fn children(&self, pad: &Pad) -> Query {
        self.all_children(pad).visible_only()
    }

    /// The children that physically live below this page; empty when the
    /// datamodel declares them fully replaced.
    pub fn real_children(&self, pad: &Pad) -> Query {
        let model = self.datamodel(pad);
        if model.child_config.replaced_with.is_some() {
            return Query::empty_at(&self.path(), &self.alt());
        }
        self.all_children(pad)
    }

    /// The attachments of this page.
    pub fn attachments(&self) -> AttachmentsQuery {
        AttachmentsQuery::new(&self.path(), &self.alt())
    }

    /// Find a visible child page by id.
    pub fn find_page(&self, pad: &Pad, id: &str) -> Result<Option<SharedRecord>> {
        self.children(pad).get(pad, id)
    }

    /// Resolve URL segments below this record, greedily trying longer
    /// slug prefixes against real children first, then attachments.
    pub fn resolve_url_path(
        self: &Arc<Self>,
        pad: &Pad,
        url_path: &[&str],
    ) -> Result<Option<SharedRecord>> {
        if url_path.is_empty() {
            return Ok(Some(self.clone()));
        }
        if self.is_attachment() {
            return Ok(None);
        }

        for idx in 0..url_path.len() {
            let piece = url_path[..=idx].join("/");
            let slug_filter = crate::expr::Expr::field("_slug").eq(piece);
            let node = match self
                .real_children(pad)
                .filter(slug_filter.clone())
                .first(pad)?
            {
                Some(child) => child,
                None => match self.attachments().filter(slug_filter).first(pad)? {
                    Some(attachment) => attachment,
                    None => continue,
                },
            };
            if let Some(rv) = node.resolve_url_path(pad, &url_path[idx + 1..])? {
                return Ok(Some(rv));
            }
        }
        Ok(None)
    }

    /// The content file backing this record. For attachments this is the
    /// metadata file, which may not exist.
    pub fn source_filename(&self, db: &Database) -> PathBuf {
        let fs_path = db.to_fs_path(&self.path());
        if self.is_attachment() {
            append_metadata_suffix(fs_path)
        } else {
            fs_path.join(crate::db::CONTENT_FILENAME)
        }
    }

    /// The raw binary a non-page record wraps; `None` for pages.
    pub fn attachment_filename(&self, db: &Database) -> Option<PathBuf> {
        if self.is_attachment() {
            Some(db.to_fs_path(&self.path()))
        } else {
            None
        }
    }

    /// Files the incremental builder must watch for this record: pages
    /// yield their content file; attachments yield the metadata file only
    /// if it exists, and always the binary file.
    pub fn dependent_filenames(&self, db: &Database) -> Vec<PathBuf> {
        if !self.is_attachment() {
            return vec![self.source_filename(db)];
        }
        let mut rv = Vec::new();
        let source = self.source_filename(db);
        if source.is_file() {
            rv.push(source);
        }
        if let Some(binary) = self.attachment_filename(db) {
            rv.push(binary);
        }
        rv
    }

    fn image_info(&self, db: &Database) -> &Option<ImageInfo> {
        self.image_info.get_or_init(|| {
            let path = self.attachment_filename(db)?;
            crate::images::read_image_info(&path).ok().flatten()
        })
    }

    /// Image width; undefined when it cannot be determined or the record
    /// is not an image.
    pub fn image_width(&self, db: &Database) -> Value {
        match self.image_info(db).as_ref().and_then(|info| info.width) {
            Some(width) => Value::Int(width as i64),
            None => Value::undefined("width of image could not be determined"),
        }
    }

    /// Image height; undefined when it cannot be determined.
    pub fn image_height(&self, db: &Database) -> Value {
        match self.image_info(db).as_ref().and_then(|info| info.height) {
            Some(height) => Value::Int(height as i64),
            None => Value::undefined("height of image could not be determined"),
        }
    }

    /// Image format name; undefined when the header is unrecognized.
    pub fn image_format(&self, db: &Database) -> Value {
        match self.image_info(db) {
            Some(info) => Value::from(info.format.name()),
            None => Value::undefined("format of image could not be determined"),
        }
    }

    /// Human-readable image format description.
    pub fn image_format_description(&self, db: &Database) -> Value {
        match self.image_info(db) {
            Some(info) => Value::from(info.format.description()),
            None => Value::undefined("format description of image could not be determined"),
        }
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.path() == other.path()
            && self.alt() == other.alt()
    }
}

fn append_metadata_suffix(path: PathBuf) -> PathBuf {
    let mut os = path.into_os_string();
    os.push(".");
    os.push(crate::db::CONTENT_EXT);
    PathBuf::from(os)
}

/// Humanize an id: separators become spaces, words get title-cased.
fn humanize_id(id: &str) -> String {
    id.replace(['-', '_'], " ")
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
