//! doclock - advisory edit locks for shared documents
//!
//! Command-line front end over `doclock-core`: resolves configuration and
//! agent identity, runs lock hooks, and prints results as text or JSON.

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::panic))]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod cli;
pub mod commands;
pub mod hooks;
pub mod identity;
