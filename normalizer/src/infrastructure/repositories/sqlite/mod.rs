// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! sqlx/SQLite adapters for every `normalizer_domain` repository trait,
//! plus schema bootstrap.

pub mod benchmark_repository;
pub mod catalog_repository;
pub mod code_tree_repository;
pub mod group_repository;
pub mod normalized_record_repository;
pub mod schema;
pub mod session_repository;
pub mod upload_repository;

pub use benchmark_repository::SqliteBenchmarkRepository;
pub use catalog_repository::SqliteCatalogRepository;
pub use code_tree_repository::SqliteCodeTreeRepository;
pub use group_repository::SqliteGroupRepository;
pub use normalized_record_repository::SqliteNormalizedRecordRepository;
pub use schema::{create_database_if_missing, ensure_schema, initialize_database};
pub use session_repository::SqliteSessionRepository;
pub use upload_repository::SqliteUploadRepository;
