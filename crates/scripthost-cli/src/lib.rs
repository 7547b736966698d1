//! Scripthost CLI library.
//!
//! This crate provides the command-line driver for the dev-support client.

pub mod cli;
pub mod commands;
