//! User Repository
//!
//! 用户记录由外部身份网关同步；核心只读身份字段，
//! 写入仅限骑手位置（单一写者，last-write-wins）。

use super::{BaseRepository, RepoResult};
use crate::db::models::User;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

use shared::order::GeoPoint;
use shared::util::now_millis;

const TABLE: &str = "user";

#[derive(Clone)]
pub struct UserRepository {
    base: BaseRepository,
}

impl UserRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    pub async fn find_by_id(&self, user_id: &str) -> RepoResult<Option<User>> {
        let user: Option<User> = self.base.db().select((TABLE, user_id)).await?;
        Ok(user)
    }

    /// 覆写骑手当前位置（记录不存在时创建）
    pub async fn set_location(&self, user_id: &str, location: GeoPoint) -> RepoResult<()> {
        self.base
            .db()
            .query(
                r#"UPSERT type::thing($table, $id) SET
                       current_location = $location,
                       location_updated_at = $updated_at"#,
            )
            .bind(("table", TABLE))
            .bind(("id", user_id.to_string()))
            .bind(("location", location))
            .bind(("updated_at", now_millis()))
            .await?;
        Ok(())
    }

    /// 骑手最近上报的位置（从未上报过返回 None）
    pub async fn location_of(&self, user_id: &str) -> RepoResult<Option<GeoPoint>> {
        Ok(self
            .find_by_id(user_id)
            .await?
            .and_then(|user| user.current_location))
    }
}
