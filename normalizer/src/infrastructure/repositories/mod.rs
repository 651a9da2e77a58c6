// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Storage adapters implementing the `normalizer_domain` repository
//! contracts. SQLite is the only backend today; `spec.md` does not
//! mandate a specific store, and sqlx is what the teacher repo already
//! uses for its own repositories.

pub mod sqlite;
