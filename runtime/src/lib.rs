// Copyright 2026 Reviewtrack Contributors
// SPDX-License-Identifier: Apache-2.0

//! reviewtrack runtime library: acquisition adapters, change detection
//! and the scheduling/reporting shell around them.
//!
//! This library crate exposes the modules to the binary and to the
//! integration tests.

pub mod acquisition;
pub mod cli;
pub mod config;
pub mod engine;
pub mod monitor;
pub mod renderer;
pub mod report;
pub mod rest;
pub mod scheduler;
