//! # MBKM Dashboard Application
//!
//! HTTP API, CLI and configuration around [`mbkm_core`].
//!
//! - [`api`] - axum REST server
//! - [`cli`] - clap command-line interface
//! - [`config`] - TOML configuration file
//! - [`uploads`] - cleanup of stored payment proofs and reports

pub mod api;
pub mod cli;
pub mod config;
pub mod uploads;
