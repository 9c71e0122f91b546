use chrono::{DateTime, SecondsFormat, Utc};
use sea_orm::{ActiveModelTrait, DatabaseConnection, DbErr, EntityTrait, QueryOrder, Set};
use serde::Serialize;

use crate::comment::{gravatar_url, CommentPage};
use crate::entity::{comments1, comments2};

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredComment {
    pub id: i32,
    pub content: String,
    pub name: String,
    pub web: Option<String>,
    pub mail: String,
    pub gravatar: Option<String>,
    pub ip: Option<String>,
    pub timestamp: Option<String>,
}

/// Submitted fields of a persisted comment.
#[derive(Clone, Debug, Default)]
pub struct CommentInput {
    pub content: String,
    pub name: String,
    pub web: Option<String>,
    pub mail: String,
    pub ip: Option<String>,
}

impl From<comments1::Model> for StoredComment {
    fn from(m: comments1::Model) -> Self {
        Self {
            id: m.id,
            content: m.content,
            name: m.name,
            web: m.web,
            mail: m.mail,
            gravatar: m.gravatar,
            ip: m.ip,
            timestamp: m.timestamp.map(to_rfc3339),
        }
    }
}

impl From<comments2::Model> for StoredComment {
    fn from(m: comments2::Model) -> Self {
        Self {
            id: m.id,
            content: m.content,
            name: m.name,
            web: m.web,
            mail: m.mail,
            gravatar: m.gravatar,
            ip: m.ip,
            timestamp: m.timestamp.map(to_rfc3339),
        }
    }
}

pub async fn find_all(
    db: &DatabaseConnection,
    page: CommentPage,
) -> Result<Vec<StoredComment>, DbErr> {
    let list = match page {
        CommentPage::Comments1 => comments1::Entity::find()
            .order_by_asc(comments1::Column::Id)
            .all(db)
            .await?
            .into_iter()
            .map(StoredComment::from)
            .collect(),
        CommentPage::Comments2 => comments2::Entity::find()
            .order_by_asc(comments2::Column::Id)
            .all(db)
            .await?
            .into_iter()
            .map(StoredComment::from)
            .collect(),
    };
    Ok(list)
}

pub async fn find(
    db: &DatabaseConnection,
    page: CommentPage,
    id: i32,
) -> Result<Option<StoredComment>, DbErr> {
    let found = match page {
        CommentPage::Comments1 => comments1::Entity::find_by_id(id)
            .one(db)
            .await?
            .map(StoredComment::from),
        CommentPage::Comments2 => comments2::Entity::find_by_id(id)
            .one(db)
            .await?
            .map(StoredComment::from),
    };
    Ok(found)
}

pub async fn insert(
    db: &DatabaseConnection,
    page: CommentPage,
    input: CommentInput,
) -> Result<i32, DbErr> {
    let gravatar = Some(gravatar_url(&input.mail));
    let now = Some(Utc::now());
    let id = match page {
        CommentPage::Comments1 => {
            comments1::ActiveModel {
                content: Set(input.content),
                name: Set(input.name),
                web: Set(input.web),
                mail: Set(input.mail),
                gravatar: Set(gravatar),
                ip: Set(input.ip),
                timestamp: Set(now),
                ..Default::default()
            }
            .insert(db)
            .await?
            .id
        }
        CommentPage::Comments2 => {
            comments2::ActiveModel {
                content: Set(input.content),
                name: Set(input.name),
                web: Set(input.web),
                mail: Set(input.mail),
                gravatar: Set(gravatar),
                ip: Set(input.ip),
                timestamp: Set(now),
                ..Default::default()
            }
            .insert(db)
            .await?
            .id
        }
    };
    Ok(id)
}

/// Saves edited fields with a fresh timestamp and gravatar. The stored ip is
/// kept. Returns false when the row does not exist.
pub async fn update(
    db: &DatabaseConnection,
    page: CommentPage,
    id: i32,
    input: CommentInput,
) -> Result<bool, DbErr> {
    let gravatar = Some(gravatar_url(&input.mail));
    let now = Some(Utc::now());
    let result = match page {
        CommentPage::Comments1 => comments1::ActiveModel {
            id: Set(id),
            content: Set(input.content),
            name: Set(input.name),
            web: Set(input.web),
            mail: Set(input.mail),
            gravatar: Set(gravatar),
            timestamp: Set(now),
            ..Default::default()
        }
        .update(db)
        .await
        .map(|_| ()),
        CommentPage::Comments2 => comments2::ActiveModel {
            id: Set(id),
            content: Set(input.content),
            name: Set(input.name),
            web: Set(input.web),
            mail: Set(input.mail),
            gravatar: Set(gravatar),
            timestamp: Set(now),
            ..Default::default()
        }
        .update(db)
        .await
        .map(|_| ()),
    };
    match result {
        Ok(()) => Ok(true),
        Err(DbErr::RecordNotUpdated) => Ok(false),
        Err(e) => Err(e),
    }
}

fn to_rfc3339(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_db;

    fn input(content: &str, mail: &str) -> CommentInput {
        CommentInput {
            content: content.to_string(),
            name: "Kalle".to_string(),
            web: None,
            mail: mail.to_string(),
            ip: Some("127.0.0.1".to_string()),
        }
    }

    #[actix_web::test]
    async fn pages_use_separate_tables() {
        let db = test_db().await;
        insert(&db, CommentPage::Comments1, input("ett", "a@b.se")).await.unwrap();
        insert(&db, CommentPage::Comments1, input("två", "a@b.se")).await.unwrap();
        insert(&db, CommentPage::Comments2, input("tre", "a@b.se")).await.unwrap();

        let first: Vec<_> = find_all(&db, CommentPage::Comments1)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.content)
            .collect();
        assert_eq!(first, vec!["ett", "två"]);
        assert_eq!(find_all(&db, CommentPage::Comments2).await.unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn update_recomputes_gravatar_and_keeps_ip() {
        let db = test_db().await;
        let id = insert(&db, CommentPage::Comments2, input("före", "old@example.com"))
            .await
            .unwrap();

        let updated = update(&db, CommentPage::Comments2, id, input("efter", "Foo@Example.com "))
            .await
            .unwrap();
        assert!(updated);

        let row = find(&db, CommentPage::Comments2, id).await.unwrap().unwrap();
        assert_eq!(row.content, "efter");
        assert_eq!(row.gravatar, Some(gravatar_url("foo@example.com")));
        assert_eq!(row.ip.as_deref(), Some("127.0.0.1"));
        assert!(row.timestamp.is_some());
    }

    #[actix_web::test]
    async fn update_of_missing_row_reports_false() {
        let db = test_db().await;
        let updated = update(&db, CommentPage::Comments1, 42, input("x", "a@b.se"))
            .await
            .unwrap();
        assert!(!updated);
        assert!(find(&db, CommentPage::Comments1, 42).await.unwrap().is_none());
    }
}
