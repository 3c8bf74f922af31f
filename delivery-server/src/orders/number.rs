//! Human-readable reference numbers
//!
//! 格式 `ORD-YYMMDD-NNNN`（跑腿任务 `PKP-` 前缀），NNNN 为 4 位
//! 随机数。创建时生成一次，之后永不重新生成。

use chrono::Utc;
use rand::Rng;

pub const ORDER_PREFIX: &str = "ORD";
pub const PICKUP_PREFIX: &str = "PKP";

/// Generate a reference number with the given prefix
pub fn generate(prefix: &str) -> String {
    let date = Utc::now().format("%y%m%d");
    let n: u32 = rand::thread_rng().gen_range(0..10_000);
    format!("{}-{}-{:04}", prefix, date, n)
}
