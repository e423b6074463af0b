// src/lib.rs
//! civet: a static analyzer for a PHP-flavored scripting language.
//! The workspace crates hold the analysis core; this crate wires them
//! into a CLI with a parallel two-pass driver.

pub mod cli;
pub mod commands;
pub mod driver;
