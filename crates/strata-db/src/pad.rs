//! The pad: per-build-pass access to the content database.
//!
//! A pad pairs the stateless [`Database`] with a [`RecordCache`] and an
//! optional [`DependencySink`]. All record lookups go through the pad so
//! a build pass sees a consistent set of record objects, and every file
//! consulted on behalf of the caller is reported to the sink.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::cache::RecordCache;
use crate::datamodel::Datamodel;
use crate::db::{Database, RawRecord, Result};
use crate::deps::DependencySink;
use crate::paths;
use crate::query::Query;
use crate::record::{Record, RecordKind, SharedRecord, PRIMARY_ALT};
use crate::value::Value;

/// What a URL path resolved to.
#[derive(Debug)]
pub enum ResolvedUrl {
    Record(SharedRecord),
    Asset(crate::assets::Asset),
}

impl ResolvedUrl {
    pub fn as_record(&self) -> Option<&SharedRecord> {
        match self {
            ResolvedUrl::Record(record) => Some(record),
            ResolvedUrl::Asset(_) => None,
        }
    }

    pub fn as_asset(&self) -> Option<&crate::assets::Asset> {
        match self {
            ResolvedUrl::Asset(asset) => Some(asset),
            ResolvedUrl::Record(_) => None,
        }
    }
}

/// Per-build-pass record access.
pub struct Pad {
    db: Arc<Database>,
    cache: RecordCache,
    sink: Option<Arc<dyn DependencySink>>,
}

impl Pad {
    pub fn new(db: Arc<Database>) -> Self {
        let cache = RecordCache::new(db.config().content.ephemeral_cache_size);
        Self {
            db,
            cache,
            sink: None,
        }
    }

    /// Attach a dependency sink; every file consulted from here on is
    /// reported to it.
    pub fn with_dependency_sink(mut self, sink: Arc<dyn DependencySink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn db(&self) -> &Arc<Database> {
        &self.db
    }

    pub fn cache(&self) -> &RecordCache {
        &self.cache
    }

    /// The root record in the primary alternative.
    pub fn root(&self) -> Result<Option<SharedRecord>> {
        self.get("/")
    }

    /// The root record in a specific alternative.
    pub fn root_alt(&self, alt: &str) -> Result<Option<SharedRecord>> {
        self.get_alt("/", alt)
    }

    /// Get a record by content path in the primary alternative.
    pub fn get(&self, path: &str) -> Result<Option<SharedRecord>> {
        self.get_with_persist(path, PRIMARY_ALT, true)
    }

    /// Get a record by content path in a specific alternative.
    pub fn get_alt(&self, path: &str, alt: &str) -> Result<Option<SharedRecord>> {
        self.get_with_persist(path, alt, true)
    }

    /// Get a record, choosing the cache tier it lands in. Query iteration
    /// passes `persist: false` so bulk traversal cannot evict the records
    /// a build pass keeps coming back to.
    pub fn get_with_persist(
        &self,
        path: &str,
        alt: &str,
        persist: bool,
    ) -> Result<Option<SharedRecord>> {
        let path = paths::cleanup_path(path);
        if let Some(record) = self.cache.get(&path, alt) {
            self.track_record_dependency(&record);
            return Ok(Some(record));
        }

        let Some(raw) = self.db.load_raw_data(&path, alt, true)? else {
            return Ok(None);
        };
        let record = self.instance_record(raw)?;
        if persist {
            self.cache.persist(&record);
        } else {
            self.cache.remember(&record);
        }
        self.track_record_dependency(&record);
        debug!(path = %path, alt, persist, "loaded record");
        Ok(Some(record))
    }

    /// Start a query over the children of a path, in the primary
    /// alternative.
    pub fn query(&self, path: &str) -> Query {
        Query::new(&paths::cleanup_path(path), PRIMARY_ALT)
    }

    /// Start a query over the children of a path in an alternative.
    pub fn query_alt(&self, path: &str, alt: &str) -> Query {
        Query::new(&paths::cleanup_path(path), alt)
    }

    /// Resolve a URL path.
    ///
    /// The alternative is split off the URL first (prefix match before
    /// suffix match), then the remaining segments resolve greedily
    /// against child and attachment slugs from the root down. When no
    /// record matches — or the match is hidden and `include_invisible`
    /// is unset — the same segments fall back to the asset tree if
    /// `include_assets` is set.
    pub fn resolve_url_path(
        &self,
        url_path: &str,
        include_invisible: bool,
        include_assets: bool,
    ) -> Result<Option<ResolvedUrl>> {
        let Some((alt, path)) = self.split_alt_from_url(url_path) else {
            return Ok(None);
        };
        let pieces: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();

        if let Some(root) = self.get_with_persist("/", &alt, true)? {
            if let Some(record) = root.resolve_url_path(self, &pieces)? {
                if include_invisible || record.is_visible(self)? {
                    return Ok(Some(ResolvedUrl::Record(record)));
                }
            }
        }
        if include_assets {
            if let Some(asset) = self
                .asset_root()
                .and_then(|root| root.resolve_url_path(&pieces))
            {
                return Ok(Some(ResolvedUrl::Asset(asset)));
            }
        }
        Ok(None)
    }

    /// The root of the asset tree, if the project ships assets.
    pub fn asset_root(&self) -> Option<crate::assets::Asset> {
        crate::assets::Asset::root(&self.db)
    }

    /// Resolve a URL path against the asset tree. Used as the fallback
    /// when no record matches a URL.
    pub fn resolve_asset_url_path(&self, url_path: &str) -> Option<crate::assets::Asset> {
        let root = self.asset_root()?;
        let pieces: Vec<&str> = url_path.split('/').filter(|p| !p.is_empty()).collect();
        root.resolve_url_path(&pieces)
    }

    /// Split the alternative off a URL path.
    ///
    /// Returns the alternative and the remaining rooted path, or `None`
    /// when the URL belongs to no configured alternative (an unprefixed
    /// URL with a non-rooted primary).
    fn split_alt_from_url(&self, url_path: &str) -> Option<(String, String)> {
        let alternatives = &self.db.config().alternatives;
        let Some(primary) = alternatives.primary_alternative() else {
            return Some((PRIMARY_ALT.to_string(), url_path.to_string()));
        };

        for (prefix, alt) in alternatives.url_prefixes() {
            let bare = format!("/{prefix}");
            if url_path == bare || url_path == format!("{bare}/") {
                return Some((alt, "/".to_string()));
            }
            if let Some(rest) = url_path.strip_prefix(&format!("{bare}/")) {
                return Some((alt, format!("/{rest}")));
            }
        }
        for (suffix, alt) in alternatives.url_suffixes() {
            if let Some(rest) = url_path.strip_suffix(&suffix) {
                return Some((alt, rest.to_string()));
            }
        }
        if alternatives.primary_is_rooted() {
            return Some((primary.to_string(), url_path.to_string()));
        }
        None
    }

    /// Report a consulted file to the dependency sink, if any.
    pub fn record_dependency(&self, filename: &std::path::Path) {
        if let Some(sink) = &self.sink {
            sink.record_dependency(filename);
        }
    }

    /// Report everything a record's existence depends on: its source
    /// files plus the defining files of every datamodel reachable from
    /// its own. Reachable means through the parent chain and through
    /// declared child and attachment models; a change to any of those
    /// files can alter how this record or its children load.
    pub fn track_record_dependency(&self, record: &SharedRecord) {
        let Some(sink) = &self.sink else {
            return;
        };
        for filename in record.dependent_filenames(&self.db) {
            sink.record_dependency(&filename);
        }

        let mut seen = HashSet::new();
        let mut pending = vec![record.model_name()];
        while let Some(name) = pending.pop() {
            if !seen.insert(name.clone()) {
                continue;
            }
            let Some(model) = self.db.datamodels().get(&name) else {
                continue;
            };
            if let Some(filename) = &model.filename {
                sink.record_dependency(filename);
            }
            if let Some(parent) = &model.parent {
                pending.push(parent.clone());
            }
            if let Some(child_model) = &model.child_config.model {
                pending.push(child_model.clone());
            }
            if let Some(attachment_model) = &model.attachment_config.model {
                pending.push(attachment_model.clone());
            }
        }
    }

    /// Turn raw field data into a record: resolve the datamodel, process
    /// the fields, pick the record kind.
    fn instance_record(&self, raw: RawRecord) -> Result<SharedRecord> {
        let model = self.resolve_datamodel(&raw)?;
        let mut data = model.process_raw_data(&raw.data);
        self.process_data(&mut data, &raw, &model)?;

        let kind = if raw.is_attachment {
            match data.get("_attachment_type").and_then(|v| v.as_str()) {
                Some("image") => RecordKind::Image,
                _ => RecordKind::Attachment,
            }
        } else {
            RecordKind::Page
        };
        Ok(Arc::new(Record::new(kind, data)))
    }

    /// Resolve the datamodel for raw data: the explicit `_model` field,
    /// else the parent datamodel's declared child/attachment model, else
    /// (for pages) a model named like the record id, else the `page`
    /// built-in for pages and the default for attachments.
    fn resolve_datamodel(&self, raw: &RawRecord) -> Result<Arc<Datamodel>> {
        let registry = self.db.datamodels();
        let path = raw.data.get("_path").map(String::as_str).unwrap_or("/");
        let alt = raw
            .data
            .get("_alt")
            .map(String::as_str)
            .unwrap_or(PRIMARY_ALT);

        if let Some(name) = raw
            .data
            .get("_model")
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
        {
            if let Some(model) = registry.get(name) {
                return Ok(model);
            }
            warn!(model = name, path, "unknown datamodel, using implied model");
        }

        let parent_path = paths::dirname(path);
        if parent_path != path {
            if let Some(parent) = self.get_with_persist(&parent_path, alt, true)? {
                let implied = if raw.is_attachment {
                    parent.datamodel(self).attachment_config.model.clone()
                } else {
                    parent.datamodel(self).child_config.model.clone()
                };
                if let Some(model) = implied.and_then(|name| registry.get(&name)) {
                    return Ok(model);
                }
            }
        }

        if !raw.is_attachment {
            let id = paths::basename(path);
            if let Some(model) = registry.get(id) {
                return Ok(model);
            }
            if let Some(model) = registry.get("page") {
                return Ok(model);
            }
        }
        Ok(registry.default_model())
    }

    /// Fill in the derived fields raw data leaves open: the slug, the
    /// template and the attachment type.
    fn process_data(
        &self,
        data: &mut BTreeMap<String, Value>,
        raw: &RawRecord,
        model: &Datamodel,
    ) -> Result<()> {
        let path = raw.data.get("_path").map(String::as_str).unwrap_or("/");
        let alt = raw
            .data
            .get("_alt")
            .map(String::as_str)
            .unwrap_or(PRIMARY_ALT);

        let explicit_slug = data
            .get("_slug")
            .filter(|v| !v.is_undefined())
            .map(|v| v.to_display_string())
            .filter(|s| !s.is_empty());
        let slug = match explicit_slug {
            Some(slug) => slug.trim_matches('/').to_string(),
            None => {
                let parent_path = paths::dirname(path);
                if parent_path == path {
                    String::new()
                } else if let Some(parent) = self.get_with_persist(&parent_path, alt, true)? {
                    parent.datamodel(self).get_default_child_slug(data)
                } else {
                    String::new()
                }
            }
        };
        data.insert("_slug".to_string(), Value::String(slug));

        if raw.is_attachment
            && data
                .get("_attachment_type")
                .is_none_or(Value::is_undefined)
        {
            let ty = paths::extension(path)
                .and_then(|ext| {
                    self.db
                        .config()
                        .attachments
                        .type_for_extension(&ext)
                        .map(str::to_string)
                });
            if let Some(ty) = ty {
                data.insert("_attachment_type".to_string(), Value::String(ty));
            }
        }

        if data.get("_template").is_none_or(Value::is_undefined) {
            data.insert(
                "_template".to_string(),
                Value::String(model.get_default_template_name()),
            );
        }
        Ok(())
    }
}

impl std::fmt::Debug for Pad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pad")
            .field("db", &self.db.root())
            .field("cache", &self.cache)
            .field("has_sink", &self.sink.is_some())
            .finish()
    }
}
