use std::collections::HashMap;

use actix_web::HttpResponse;
use bcrypt::hash;
use chrono::Utc;
use log::{error, info};
use sea_orm::{ActiveModelTrait, DatabaseConnection, DbErr, EntityTrait, Set};

use crate::entity::user;
use crate::error::AppError;
use crate::form::{CheckStatus, Field, Form, Rule};
use crate::response::redirect;
use crate::session::{SessionId, SessionStore};

pub const SAVE_FAILED: &str = "<p><i>Användaren kunde inte sparas i databasen!</i></p>";

pub fn hash_password(password: &str, cost: u32) -> Result<String, AppError> {
    hash(password, cost).map_err(|e| {
        error!("password hashing failed: {}", e);
        AppError::system_exception()
    })
}

fn is_unique_violation(err: &DbErr) -> bool {
    let msg = err.to_string();
    msg.contains("Duplicate") || msg.contains("UNIQUE")
}

/// Constraint violations are a failed save, anything else is a real error.
fn rejected_or(err: DbErr) -> Result<Option<String>, AppError> {
    if is_unique_violation(&err) || matches!(err, DbErr::RecordNotUpdated) {
        info!("user save rejected: {}", err);
        return Ok(None);
    }
    Err(err.into())
}

fn details_fields(form: Form, current: Option<&user::Model>) -> Form {
    form.field(
        Field::text("acronym", "Akronym")
            .required()
            .rules(&[Rule::NotEmpty])
            .value(current.map(|u| u.acronym.clone())),
    )
    .field(
        Field::text("name", "Namn")
            .required()
            .rules(&[Rule::NotEmpty])
            .value(current.and_then(|u| u.name.clone())),
    )
    .field(
        Field::text("email", "E-post")
            .required()
            .rules(&[Rule::NotEmpty, Rule::EmailAddress])
            .value(current.and_then(|u| u.email.clone())),
    )
}

fn readonly_fields(form: Form, current: &user::Model) -> Form {
    form.field(
        Field::text("acronym", "Akronym")
            .readonly()
            .value(Some(current.acronym.clone())),
    )
    .field(Field::text("name", "Namn").readonly().value(current.name.clone()))
}

/// Runs the shared part of the check cycle; `None` means the caller should
/// go on and save.
fn precheck(
    form: &mut Form,
    submitted: &HashMap<String, String>,
    store: &SessionStore,
    session: &SessionId,
) -> Option<HttpResponse> {
    match form.check(submitted) {
        CheckStatus::NotSubmitted => Some(redirect(&form.action)),
        CheckStatus::Invalid => Some(form.clone().fail(SAVE_FAILED, store, session)),
        CheckStatus::Valid => None,
    }
}

pub struct AddUser {
    bcrypt_cost: u32,
    pub form: Form,
}

impl AddUser {
    pub const ACTION: &'static str = "/users/add";

    pub fn new(bcrypt_cost: u32) -> Self {
        let form = details_fields(Form::new(Self::ACTION), None)
            .field(
                Field::password("password", "Lösenord")
                    .required()
                    .rules(&[Rule::NotEmpty]),
            )
            .field(Field::submit("Skapa"));
        Self { bcrypt_cost, form }
    }

    pub async fn submit(
        mut self,
        db: &DatabaseConnection,
        submitted: &HashMap<String, String>,
        store: &SessionStore,
        session: &SessionId,
    ) -> HttpResponse {
        if let Some(res) = precheck(&mut self.form, submitted, store, session) {
            return res;
        }
        let saved = self.callback_submit(db).await;
        self.form.settle(saved, SAVE_FAILED, store, session)
    }

    async fn callback_submit(&self, db: &DatabaseConnection) -> Result<Option<String>, AppError> {
        let password = self.form.value("password").unwrap_or_default();
        let now = Utc::now();
        let model = user::ActiveModel {
            acronym: Set(self.form.non_blank("acronym").unwrap_or_default()),
            name: Set(self.form.non_blank("name")),
            email: Set(self.form.non_blank("email")),
            password: Set(Some(hash_password(password, self.bcrypt_cost)?)),
            created: Set(Some(now)),
            active: Set(Some(now)),
            ..Default::default()
        };
        match model.insert(db).await {
            Ok(inserted) => {
                info!("user {} added as id {}", inserted.acronym, inserted.id);
                Ok(Some(format!("/users/id/{}", inserted.id)))
            }
            Err(e) => rejected_or(e),
        }
    }
}

pub struct UpdateUser {
    user: user::Model,
    bcrypt_cost: u32,
    pub form: Form,
}

impl UpdateUser {
    pub fn new(user: user::Model, bcrypt_cost: u32) -> Self {
        let form = details_fields(Form::new(format!("/users/update/{}", user.id)), Some(&user))
            .field(Field::password("password", "Nytt lösenord"))
            .field(Field::checkbox("active", "Aktiv", user.active.is_some()))
            .field(Field::submit("Uppdatera"));
        Self {
            user,
            bcrypt_cost,
            form,
        }
    }

    pub async fn submit(
        mut self,
        db: &DatabaseConnection,
        submitted: &HashMap<String, String>,
        store: &SessionStore,
        session: &SessionId,
    ) -> HttpResponse {
        if let Some(res) = precheck(&mut self.form, submitted, store, session) {
            return res;
        }
        let saved = self.callback_submit(db).await;
        self.form.settle(saved, SAVE_FAILED, store, session)
    }

    async fn callback_submit(&self, db: &DatabaseConnection) -> Result<Option<String>, AppError> {
        let now = Utc::now();
        let mut model = user::ActiveModel {
            id: Set(self.user.id),
            acronym: Set(self.form.non_blank("acronym").unwrap_or_default()),
            name: Set(self.form.non_blank("name")),
            email: Set(self.form.non_blank("email")),
            updated: Set(Some(now)),
            ..Default::default()
        };
        // a blank password keeps the stored hash
        if let Some(password) = self.form.value("password").filter(|p| !p.trim().is_empty()) {
            model.password = Set(Some(hash_password(password, self.bcrypt_cost)?));
        }
        model.active = Set(if self.form.is_checked("active") {
            self.user.active.or(Some(now))
        } else {
            None
        });

        match user::Entity::update(model).exec(db).await {
            Ok(_) => Ok(Some(format!("/users/id/{}", self.user.id))),
            Err(e) => rejected_or(e),
        }
    }
}

pub struct DeleteUser {
    id: i32,
    pub form: Form,
}

impl DeleteUser {
    pub fn new(user: &user::Model) -> Self {
        let form = readonly_fields(Form::new(format!("/users/delete/{}", user.id)), user)
            .field(Field::submit("Radera"));
        Self { id: user.id, form }
    }

    pub async fn submit(
        mut self,
        db: &DatabaseConnection,
        submitted: &HashMap<String, String>,
        store: &SessionStore,
        session: &SessionId,
    ) -> HttpResponse {
        if let Some(res) = precheck(&mut self.form, submitted, store, session) {
            return res;
        }
        let saved = self.callback_submit(db).await;
        self.form.settle(saved, SAVE_FAILED, store, session)
    }

    async fn callback_submit(&self, db: &DatabaseConnection) -> Result<Option<String>, AppError> {
        let result = user::Entity::delete_by_id(self.id).exec(db).await?;
        if result.rows_affected == 0 {
            return Ok(None);
        }
        info!("user {} deleted", self.id);
        Ok(Some("/users".to_string()))
    }
}

/// Moves a user to the trash, or back out of it when already there.
pub struct SoftDeleteUser {
    id: i32,
    restore: bool,
    pub form: Form,
}

impl SoftDeleteUser {
    pub fn new(user: &user::Model) -> Self {
        let restore = user.deleted.is_some();
        let label = if restore { "Återställ" } else { "Ta bort" };
        let form = readonly_fields(Form::new(format!("/users/softDelete/{}", user.id)), user)
            .field(Field::submit(label));
        Self {
            id: user.id,
            restore,
            form,
        }
    }

    pub async fn submit(
        mut self,
        db: &DatabaseConnection,
        submitted: &HashMap<String, String>,
        store: &SessionStore,
        session: &SessionId,
    ) -> HttpResponse {
        if let Some(res) = precheck(&mut self.form, submitted, store, session) {
            return res;
        }
        let saved = self.callback_submit(db).await;
        self.form.settle(saved, SAVE_FAILED, store, session)
    }

    async fn callback_submit(&self, db: &DatabaseConnection) -> Result<Option<String>, AppError> {
        let deleted = if self.restore { None } else { Some(Utc::now()) };
        let model = user::ActiveModel {
            id: Set(self.id),
            deleted: Set(deleted),
            ..Default::default()
        };
        match user::Entity::update(model).exec(db).await {
            Ok(_) => Ok(Some("/users".to_string())),
            Err(e) => rejected_or(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn model() -> user::Model {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        user::Model {
            id: 3,
            acronym: "doe".to_string(),
            email: Some("doe@example.com".to_string()),
            name: Some("John Doe".to_string()),
            password: None,
            created: Some(at),
            updated: None,
            deleted: None,
            active: Some(at),
        }
    }

    #[test]
    fn update_form_reflects_current_values() {
        let update = UpdateUser::new(model(), 4);
        assert_eq!(update.form.action, "/users/update/3");
        assert_eq!(update.form.value("acronym"), Some("doe"));
        assert_eq!(update.form.value("email"), Some("doe@example.com"));
        assert!(update.form.is_checked("active"));
        assert_eq!(update.form.value("password"), None);
    }

    #[test]
    fn soft_delete_offers_restore_for_trashed_users() {
        let live = SoftDeleteUser::new(&model());
        assert!(!live.restore);
        assert_eq!(live.form.value("submit"), Some("Ta bort"));

        let mut trashed = model();
        trashed.deleted = Some(Utc::now());
        let form = SoftDeleteUser::new(&trashed);
        assert!(form.restore);
        assert_eq!(form.form.value("submit"), Some("Återställ"));
        assert!(form.form.fields.iter().filter(|f| f.name != "submit").all(|f| f.readonly));
    }

    #[test]
    fn unique_violations_are_rejections() {
        let err = DbErr::Custom("UNIQUE constraint failed: user.acronym".to_string());
        assert!(matches!(rejected_or(err), Ok(None)));
        assert!(matches!(rejected_or(DbErr::RecordNotUpdated), Ok(None)));
        assert!(rejected_or(DbErr::Custom("disk I/O error".to_string())).is_err());
    }

    #[test]
    fn hashed_password_verifies() {
        let hashed = hash_password("hemligt", 4).unwrap();
        assert!(bcrypt::verify("hemligt", &hashed).unwrap());
    }
}
