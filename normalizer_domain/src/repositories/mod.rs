// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Repository contracts. The domain only sees traits; concrete sqlx
//! adapters live in the `normalizer` crate's infrastructure layer.

pub mod benchmark_repository;
pub mod catalog_repository;
pub mod code_tree_repository;
pub mod group_repository;
pub mod normalized_record_repository;
pub mod session_repository;
pub mod upload_repository;

pub use benchmark_repository::BenchmarkRepository;
pub use catalog_repository::CatalogRepository;
pub use code_tree_repository::CodeTreeRepository;
pub use group_repository::GroupRepository;
pub use normalized_record_repository::NormalizedRecordRepository;
pub use session_repository::SessionRepository;
pub use upload_repository::UploadRepository;
