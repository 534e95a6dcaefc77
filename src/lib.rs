//! Metadata curation for soundtrack and game music libraries.
//!
//! The pure parsing pieces ([`catalog_number`], [`names`], [`roles`]) feed
//! the stateful [`discography`] merge engine and the [`ai`] reconciliation
//! step; [`tags`] and [`scanner`] read and write the files themselves.

pub mod ai;
pub mod cache;
pub mod catalog_number;
pub mod config;
pub mod context;
pub mod discography;
pub mod names;
pub mod normalize;
pub mod replacements;
pub mod roles;
pub mod scanner;
pub mod sources;
pub mod tag_inspector;
pub mod tags;

pub use context::AppContext;
