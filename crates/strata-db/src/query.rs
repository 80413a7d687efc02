//! Lazy queries over the children of a content path.
//!
//! A query is a cheap description: path, alternative, inclusion flags,
//! filters, ordering and pagination. Nothing touches the filesystem
//! until a terminal method runs against a [`Pad`]. Chainers borrow and
//! return a modified clone, so a query can be refined and reused.
//!
//! Records loaded during iteration go into the ephemeral cache tier;
//! bulk traversal never evicts persistently cached records.

use std::collections::BTreeSet;
use std::ops::Deref;
use tracing::debug;

use crate::db::Result;
use crate::expr::Expr;
use crate::pad::Pad;
use crate::paths;
use crate::record::SharedRecord;
use crate::sort::compare_keys;
use crate::value::Value;

/// A lazy query over the children of one content path.
#[derive(Debug, Clone)]
pub struct Query {
    path: String,
    alt: String,
    include_pages: bool,
    include_attachments: bool,
    include_hidden: bool,
    filters: Vec<Expr>,
    order_by: Option<Vec<String>>,
    limit: Option<usize>,
    offset: Option<usize>,
    /// Pristine queries can answer `get(id)` with a direct record load.
    pristine: bool,
    /// An always-empty query; used when children are declared replaced.
    empty: bool,
}

impl Query {
    /// All child pages of a path, hidden included.
    pub fn new(path: &str, alt: &str) -> Self {
        Self {
            path: path.to_string(),
            alt: alt.to_string(),
            include_pages: true,
            include_attachments: false,
            include_hidden: true,
            filters: Vec::new(),
            order_by: None,
            limit: None,
            offset: None,
            pristine: true,
            empty: false,
        }
    }

    /// A query that yields nothing but remembers its origin.
    pub fn empty_at(path: &str, alt: &str) -> Self {
        let mut rv = Self::new(path, alt);
        rv.empty = true;
        rv
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn alt(&self) -> &str {
        &self.alt
    }

    fn touched(&self) -> Self {
        let mut rv = self.clone();
        rv.pristine = false;
        rv
    }

    /// Add a filter; records failing any filter are skipped.
    pub fn filter(&self, expr: Expr) -> Self {
        let mut rv = self.touched();
        rv.filters.push(expr);
        rv
    }

    /// Skip hidden records. Like ordering, this leaves the query
    /// pristine; only filters, pagination and the attachment toggle
    /// disable the `get(id)` fast path.
    pub fn visible_only(&self) -> Self {
        let mut rv = self.clone();
        rv.include_hidden = false;
        rv
    }

    pub fn include_hidden(&self, include: bool) -> Self {
        let mut rv = self.clone();
        rv.include_hidden = include;
        rv
    }

    /// Also yield attachments alongside pages.
    pub fn include_attachments(&self, include: bool) -> Self {
        let mut rv = self.touched();
        rv.include_attachments = include;
        rv
    }

    /// Order by fields; a `-` prefix reverses that field. Ordering does
    /// not change which records match, so the query stays pristine and
    /// `get(id)` keeps its direct-load fast path.
    pub fn order_by(&self, fields: &[&str]) -> Self {
        let mut rv = self.clone();
        rv.order_by = Some(fields.iter().map(|f| f.to_string()).collect());
        rv
    }

    pub fn limit(&self, limit: usize) -> Self {
        let mut rv = self.touched();
        rv.limit = Some(limit);
        rv
    }

    pub fn offset(&self, offset: usize) -> Self {
        let mut rv = self.touched();
        rv.offset = Some(offset);
        rv
    }

    /// The records matching the inclusion flags and filters, before
    /// ordering and pagination.
    fn matched(&self, pad: &Pad) -> Result<Vec<SharedRecord>> {
        if self.empty {
            return Ok(Vec::new());
        }
        // Loading the base record reports its dependencies; the root's
        // filesystem path is reported even when no record exists there,
        // so creating one later invalidates the output.
        pad.get_with_persist(&self.path, &self.alt, true)?;
        pad.record_dependency(&pad.db().to_fs_path(&self.path));

        let mut rv = Vec::new();
        for item in pad.db().iter_items(&self.path, &self.alt)? {
            let wanted = (item.is_attachment && self.include_attachments)
                || (!item.is_attachment && self.include_pages);
            if !wanted {
                continue;
            }
            let child_path = paths::join(&self.path, &item.id);
            let Some(record) = pad.get_with_persist(&child_path, &self.alt, false)? else {
                continue;
            };
            if record.is_attachment() != item.is_attachment {
                continue;
            }
            if !self.include_hidden && record.is_hidden(pad)? {
                continue;
            }
            if self.filters.iter().all(|f| f.evaluate(&record).is_truthy()) {
                rv.push(record);
            }
        }
        Ok(rv)
    }

    /// The ordering in effect: the query's own, else the child ordering
    /// the parent's datamodel declares.
    fn effective_order(&self, pad: &Pad) -> Result<Option<Vec<String>>> {
        if self.order_by.is_some() {
            return Ok(self.order_by.clone());
        }
        if !self.include_pages {
            return Ok(None);
        }
        match pad.get_with_persist(&self.path, &self.alt, true)? {
            Some(base) => Ok(base.datamodel(pad).child_config.order_by.clone()),
            None => Ok(None),
        }
    }

    /// Run the query: match, order, paginate.
    pub fn all(&self, pad: &Pad) -> Result<Vec<SharedRecord>> {
        let mut rv = self.matched(pad)?;
        if let Some(fields) = self.effective_order(pad)? {
            rv.sort_by(|a, b| compare_keys(&a.get_sort_key(&fields), &b.get_sort_key(&fields)));
        }
        if let Some(offset) = self.offset {
            rv.drain(..offset.min(rv.len()));
        }
        if let Some(limit) = self.limit {
            rv.truncate(limit);
        }
        debug!(path = %self.path, alt = %self.alt, count = rv.len(), "query evaluated");
        Ok(rv)
    }

    /// The first record in query order.
    pub fn first(&self, pad: &Pad) -> Result<Option<SharedRecord>> {
        let mut limited = self.clone();
        limited.limit = Some(1);
        Ok(limited.all(pad)?.into_iter().next())
    }

    /// The number of matching records, before pagination.
    pub fn count(&self, pad: &Pad) -> Result<usize> {
        Ok(self.matched(pad)?.len())
    }

    /// Get a child by id. A pristine query loads it directly; a refined
    /// one goes through iteration so filters keep applying.
    pub fn get(&self, pad: &Pad, id: &str) -> Result<Option<SharedRecord>> {
        if self.pristine && !self.empty {
            let child_path = paths::join(&self.path, id);
            return pad.get_with_persist(&child_path, &self.alt, true);
        }
        self.filter(Expr::field("_id").eq(id)).first(pad)
    }

    /// The distinct display values of a field across the matching
    /// records; list fields contribute each element.
    pub fn distinct(&self, pad: &Pad, field: &str) -> Result<BTreeSet<String>> {
        let mut rv = BTreeSet::new();
        for record in self.matched(pad)? {
            match record.field(field) {
                Value::Undefined(_) => {}
                Value::List(items) => {
                    rv.extend(items.iter().map(Value::to_display_string));
                }
                value => {
                    rv.insert(value.to_display_string());
                }
            }
        }
        Ok(rv)
    }
}

/// A query over the attachments of one page.
#[derive(Debug, Clone)]
pub struct AttachmentsQuery {
    query: Query,
}

impl AttachmentsQuery {
    pub fn new(path: &str, alt: &str) -> Self {
        let mut query = Query::new(path, alt);
        query.include_pages = false;
        query.include_attachments = true;
        Self { query }
    }

    fn typed(&self, attachment_type: &str) -> Query {
        self.query
            .filter(Expr::field("_attachment_type").eq(attachment_type))
    }

    pub fn images(&self) -> Query {
        self.typed("image")
    }

    pub fn videos(&self) -> Query {
        self.typed("video")
    }

    pub fn audio(&self) -> Query {
        self.typed("audio")
    }

    pub fn documents(&self) -> Query {
        self.typed("document")
    }

    pub fn text(&self) -> Query {
        self.typed("text")
    }
}

impl Deref for AttachmentsQuery {
    type Target = Query;

    fn deref(&self) -> &Query {
        &self.query
    }
}
