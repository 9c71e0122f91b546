use serde::Serialize;

use crate::entity::user;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Deleted,
    Active,
    Inactive,
}

impl UserStatus {
    /// A soft-deleted user counts as deleted whatever its `active` stamp says.
    pub fn of(user: &user::Model) -> Self {
        match (user.deleted.is_some(), user.active.is_some()) {
            (true, _) => Self::Deleted,
            (false, true) => Self::Active,
            (false, false) => Self::Inactive,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DeleteKind {
    Delete,
    SoftDelete,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRowView {
    pub id: i32,
    pub id_link: String,
    pub acronym: String,
    pub name: Option<String>,
    pub status: UserStatus,
    pub edit_link: String,
    pub delete_link: String,
    pub delete_kind: DeleteKind,
}

#[derive(Clone, Debug, Serialize)]
pub struct Column {
    pub key: &'static str,
    pub title: &'static str,
}

#[derive(Clone, Debug, Serialize)]
pub struct UserTable {
    pub id: &'static str,
    pub columns: Vec<Column>,
    pub rows: Vec<UserRowView>,
}

/// Trashed rows link to the permanent delete, the rest to the soft delete.
pub fn user_row(user: &user::Model) -> UserRowView {
    let status = UserStatus::of(user);
    let (delete_link, delete_kind) = match status {
        UserStatus::Deleted => (format!("users/delete/{}", user.id), DeleteKind::Delete),
        _ => (format!("users/softDelete/{}", user.id), DeleteKind::SoftDelete),
    };
    UserRowView {
        id: user.id,
        id_link: format!("users/id/{}", user.id),
        acronym: user.acronym.clone(),
        name: user.name.clone(),
        status,
        edit_link: format!("users/update/{}", user.id),
        delete_link,
        delete_kind,
    }
}

pub fn user_table(users: &[user::Model]) -> UserTable {
    UserTable {
        id: "users",
        columns: vec![
            Column { key: "id", title: "Id" },
            Column { key: "acronym", title: "Akronym" },
            Column { key: "name", title: "Namn" },
            Column { key: "status", title: "Status" },
            Column { key: "edit", title: "Redigera" },
        ],
        rows: users.iter().map(user_row).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(id: i32, active: bool, deleted: bool) -> user::Model {
        user::Model {
            id,
            acronym: format!("u{}", id),
            email: None,
            name: Some(format!("User {}", id)),
            password: None,
            created: Some(Utc::now()),
            updated: None,
            deleted: deleted.then(Utc::now),
            active: active.then(Utc::now),
        }
    }

    #[test]
    fn status_is_tri_state() {
        assert_eq!(UserStatus::of(&user(1, true, false)), UserStatus::Active);
        assert_eq!(UserStatus::of(&user(1, false, false)), UserStatus::Inactive);
        assert_eq!(UserStatus::of(&user(1, true, true)), UserStatus::Deleted);
        assert_eq!(UserStatus::of(&user(1, false, true)), UserStatus::Deleted);
    }

    #[test]
    fn live_rows_offer_soft_delete() {
        let row = user_row(&user(4, true, false));
        assert_eq!(row.id_link, "users/id/4");
        assert_eq!(row.edit_link, "users/update/4");
        assert_eq!(row.delete_link, "users/softDelete/4");
        assert_eq!(row.delete_kind, DeleteKind::SoftDelete);
    }

    #[test]
    fn trashed_rows_offer_hard_delete() {
        let row = user_row(&user(5, false, true));
        assert_eq!(row.status, UserStatus::Deleted);
        assert_eq!(row.delete_link, "users/delete/5");
        assert_eq!(row.delete_kind, DeleteKind::Delete);
    }

    #[test]
    fn table_keeps_row_order() {
        let table = user_table(&[user(2, true, false), user(1, false, false)]);
        assert_eq!(table.id, "users");
        assert_eq!(table.columns.len(), 5);
        let ids: Vec<_> = table.rows.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2, 1]);
    }
}
