//! taskvault - mail-to-task pipeline library
//!
//! Turns recent messages into task artifacts in a folder-backed vault,
//! moves them through lifecycle stages and keeps a shared Markdown
//! dashboard current.
//!
//! # Core Concepts
//!
//! - **Vault**: a directory tree; stages are subdirectories
//! - **Artifacts**: Note and Plan Markdown files, named by kind and time
//! - **Stages**: `Inbox` (reserved), `Needs_Action`, `Done` (terminal)
//! - **Dashboard**: an operator document with one machine-owned section
//!
//! # Module Organization
//!
//! - `artifact`: artifact kinds, rendering, title and task-id parsing
//! - `store`: unique naming, stage moves and per-stage counts
//! - `dashboard`: in-place rewrite of the `## Status Overview` section
//! - `cycle`: fetch, plan, advance and sync; continuous monitoring
//! - `mail`: mail source trait with demo and spool sources
//! - `planner`: planner trait and the static template planner
//! - `config`: configuration loading from `.taskvault.toml`
//! - `lock`: vault instance lock and atomic file replacement
//! - `cli`: command-line interface using clap

pub mod artifact;
pub mod cli;
pub mod clock;
pub mod config;
pub mod cycle;
pub mod dashboard;
pub mod error;
pub mod events;
pub mod lock;
pub mod mail;
pub mod output;
pub mod planner;
pub mod store;
pub mod vault;

pub use error::{Error, Result};
