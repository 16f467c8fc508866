/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

//! Incremental Knuth-Morris-Pratt search over byte streams.
//!
//! The pattern keeps the precomputed failure table, the matcher keeps the
//! per-stream automaton state, so a single pattern can be shared by any
//! number of concurrently scanned streams.

mod pattern;
pub use pattern::KmpPattern;

mod matcher;
pub use matcher::KmpMatcher;
