//! Repository Module
//!
//! Provides data access for SurrealDB tables. 状态流转一律走单条
//! 条件 UPDATE（对 current status 做 CAS），同一订单上的并发
//! read-modify-write 不可能交错。

pub mod order;
pub mod pickup_drop;
pub mod user;

pub use order::{OrderRepository, StatusWrite};
pub use pickup_drop::{PickupRepository, PickupStatusWrite};
pub use user::UserRepository;

use surrealdb::{RecordId, Surreal};
use surrealdb::engine::local::Db;
use thiserror::Error;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<surrealdb::Error> for RepoError {
    fn from(err: surrealdb::Error) -> Self {
        RepoError::Database(err.to_string())
    }
}

impl From<RepoError> for crate::utils::AppError {
    fn from(err: RepoError) -> Self {
        use crate::utils::AppError;
        match err {
            RepoError::NotFound(msg) => AppError::NotFound(msg),
            RepoError::Conflict(msg) => AppError::Conflict(msg),
            RepoError::Validation(msg) => AppError::Validation(msg),
            RepoError::Database(msg) => AppError::Database(msg),
        }
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;

/// Common base holding the database handle
#[derive(Clone)]
pub struct BaseRepository {
    db: Surreal<Db>,
}

impl BaseRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &Surreal<Db> {
        &self.db
    }
}

// =============================================================================
// ID Convention: 全栈统一使用 "table:id" 格式
// =============================================================================

/// 解析 "table:id" 字符串并校验表名
///
/// 格式非法或表名不符都按 NotFound 处理（调用方不需要区分）。
pub fn parse_record_id(id: &str, table: &str) -> RepoResult<RecordId> {
    let record_id: RecordId = id
        .parse()
        .map_err(|_| RepoError::NotFound(format!("Invalid ID format: {}", id)))?;
    if record_id.table() != table {
        return Err(RepoError::NotFound(format!("Invalid {} ID: {}", table, id)));
    }
    Ok(record_id)
}
