//! Trim unused chunks from Minecraft Anvil worlds.
//!
//! Layers, innermost first: `domain` (container and NBT formats, criteria),
//! `application` (trimming service), `infrastructure` (filesystem, wiring)
//! and `cli`.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
