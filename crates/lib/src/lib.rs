//! proto-lib: Core orchestration logic for proto
//!
//! This crate provides the bootstrap engine that installs the Parrot VM and
//! the Rakudo Perl 6 compiler on top of it:
//! - `config`: the human-editable settings file (load/save/create-default)
//! - `layout`: directory tree derivation from a single root path
//! - `version`: classification of version specs into acquisition strategies
//! - `pipeline`: the staged, resumable build orchestration for both targets

pub mod config;
pub mod consts;
pub mod layout;
pub mod net;
pub mod pipeline;
pub mod platform;
pub mod process;
pub mod util;
pub mod version;
