//! Strata DB - The content database behind the static-site builder
//!
//! This crate loads a filesystem content tree into typed records:
//! - Metaformat content files and datamodel-driven field processing
//! - Records (pages, attachments, images) addressed by path and alternative
//! - Lazy, chainable queries with a small expression DSL
//! - URL resolution for records, alternatives and the asset tree
//! - Explicit dependency reporting for incremental rebuilds

pub mod assets;
pub mod cache;
pub mod datamodel;
pub mod db;
pub mod deps;
pub mod editor;
pub mod expr;
pub mod images;
pub mod metaformat;
pub mod pad;
pub mod paths;
pub mod query;
pub mod record;
pub mod sort;
pub mod value;

// Re-exports for convenience
pub use assets::Asset;
pub use cache::RecordCache;
pub use datamodel::{Datamodel, DatamodelError, DatamodelRegistry, FieldSpec, FieldType};
pub use db::{ChildItem, Database, DbError, RawRecord, Result};
pub use deps::{CollectedDependencies, DependencySink};
pub use editor::EditSession;
pub use expr::{BinaryOp, Expr};
pub use images::{read_image_info, ImageFormat, ImageInfo};
pub use pad::{Pad, ResolvedUrl};
pub use query::{AttachmentsQuery, Query};
pub use record::{Record, RecordKind, SharedRecord, PRIMARY_ALT};
pub use value::Value;
