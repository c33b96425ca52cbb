//! ds3port - FromSoftware asset porting engine
//!
//! Converts character and object binders from Bloodborne, Sekiro and
//! Elden Ring into the Dark Souls III binary formats: animation event
//! tables are filtered and transcoded per source game, Havok clips are
//! downgraded through an external tool chain, and meshes are retargeted
//! against a target-generation material catalog.
//!
//! # Architecture
//!
//! - [`Pipeline`] - Per-run orchestrator, one conversion per source binder
//! - [`Profile`] - Everything game-specific, bundled as one strategy value
//! - [`AssetCodec`] - Seam to the host's binary format (de)serializers
//! - [`HavokDowngrader`] - Seam to the external clip downgrade tools

pub mod anim_id;
pub mod catalog;
pub mod codec;
pub mod container;
pub mod error;
pub mod event;
pub mod flver;
pub mod game;
pub mod havok;
pub mod options;
pub mod pipeline;
pub mod rules;
pub mod tae;

pub use catalog::{MaterialCatalog, MaterialDef};
pub use codec::TomlCodec;
pub use container::{AssetCodec, BinaryEntry, Container};
pub use error::PortError;
pub use event::{EditContext, EditOp, EditTable, Event};
pub use game::Game;
pub use havok::{HavokDowngrader, ToolDowngrader};
pub use options::{AssetKind, Options};
pub use pipeline::{ContainerKind, Emitted, Pipeline, Profile};
pub use rules::RuleSet;
pub use tae::{Animation, MiniHeader, Tae};
