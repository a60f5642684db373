#![doc = "box-archiver-core: core logic library for box-archiver."]

//! This crate holds the archive-and-sync pipeline: period selection, zip
//! packaging, remote name resolution and the create-or-update upload decision.
//! The concrete storage client lives in the CLI crate and plugs in through
//! [`contract::ObjectStore`].
//!
//! # Usage
//! Build an [`period::ArchiveJob`] and a [`config::SyncConfig`], then call
//! [`synchronise::synchronise_period`] or [`synchronise::synchronise_file`].

pub mod archive;
pub mod catalog;
pub mod config;
pub mod contract;
pub mod error;
pub mod period;
pub mod reconcile;
pub mod select;
pub mod strategy;
pub mod synchronise;

pub use error::{Error, RemoteApiError, Result};
