//! # notepress-core
//!
//! Core library for notepress, which publishes a linked subset of a SiYuan
//! note store as a Hugo content section.
//!
//! Starting from the notes marked for publication, the pipeline follows
//! block references to every reachable note, rewrites the references into
//! site links, and writes each note once with its backlinks and assets.

pub mod assets;
pub mod backlinks;
pub mod closure;
pub mod config;
pub mod emit;
pub mod frontmatter;
pub mod markdown;
pub mod models;
pub mod pipeline;
pub mod repository;
pub mod resolver;
pub mod row;
pub mod slug;
pub mod store;
pub mod worklist;

pub use assets::{AssetError, AssetLocator};
pub use backlinks::{BacklinkIndex, EdgeTable};
pub use closure::{ClosureError, ClosureState};
pub use config::{Config, ConfigError, FetchFailurePolicy};
pub use emit::{EmitError, Emitter, MarkdownEmitter};
pub use models::{AttrValue, Backlink, NoteDocument, NoteMetadata, NoteState};
pub use pipeline::{
    Plan, PublishError, PublishPipeline, PublishReport, SkippedNote, UnresolvedReference,
};
pub use repository::{FetchError, Repository};
pub use resolver::{ReferenceResolver, Resolution};
pub use row::{NoteRow, ParseError};
pub use slug::slugify;
pub use store::{MemoryStore, NoteStore, SeedFilter, SiyuanStore, StoreError};
pub use worklist::Worklist;

pub use notepress_types::{Edge, NoteId};
