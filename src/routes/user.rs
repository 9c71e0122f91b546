use std::collections::HashMap;

use actix_web::{web, HttpResponse};
use chrono::{SecondsFormat, Utc};
use log::{debug, info};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    Select, Set, TransactionTrait,
};
use serde::Serialize;
use serde_json::json;

use crate::config::AppConfig;
use crate::content;
use crate::db::recreate_user_table;
use crate::entity::user;
use crate::error::AppError;
use crate::form::Form;
use crate::forms::user::{hash_password, AddUser, DeleteUser, SoftDeleteUser, UpdateUser};
use crate::response::redirect;
use crate::session::{SessionId, SessionStore};
use crate::user_table::user_table;
use crate::view::{Page, Region};

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("").route(web::get().to(list)))
        .service(web::resource("/id/{id}").route(web::get().to(get_user)))
        .service(
            web::resource("/add")
                .route(web::get().to(view_add))
                .route(web::post().to(add)),
        )
        .service(
            web::resource("/update/{id}")
                .route(web::get().to(view_update))
                .route(web::post().to(update)),
        )
        .service(
            web::resource("/delete/{id}")
                .route(web::get().to(view_delete))
                .route(web::post().to(delete)),
        )
        .service(
            web::resource("/softDelete/{id}")
                .route(web::get().to(view_soft_delete))
                .route(web::post().to(soft_delete)),
        )
        .service(web::resource("/active").route(web::get().to(active)))
        .service(web::resource("/inactive").route(web::get().to(inactive)))
        .service(web::resource("/discarded").route(web::get().to(discarded)))
        .service(web::resource("/resetDb").route(web::get().to(reset_db)));
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UserDto {
    id: i32,
    acronym: String,
    email: Option<String>,
    name: Option<String>,
    created: Option<String>,
    updated: Option<String>,
    deleted: Option<String>,
    active: Option<String>,
}

type Submitted = web::Form<HashMap<String, String>>;

/// Looks the user up by the raw path id; `Err` carries the not-found page.
async fn find_user(
    db: &DatabaseConnection,
    raw_id: &str,
) -> Result<Result<user::Model, HttpResponse>, AppError> {
    let found = match raw_id.parse::<i32>() {
        Ok(id) => user::Entity::find_by_id(id).one(db).await?,
        Err(_) => None,
    };
    Ok(found.ok_or_else(|| {
        debug!("no user with id {}", raw_id);
        Page::error_info(
            "Användare",
            "Hittar ej användare",
            &format!("Hittar ej användare med id: {}", raw_id),
        )
        .into_response()
    }))
}

async fn form_page(config: &AppConfig, title: &str, form: &Form, info: &str) -> HttpResponse {
    let sidebar = content::load_filtered(config, &format!("users/{}.md", info)).await;
    Page::new()
        .title(title)
        .stylesheet("css/form.css")
        .add("users/form", json!({ "title": title, "form": form }), Region::Main)
        .add("default/article", json!({ "content": sidebar }), Region::Sidebar)
        .into_response()
}

async fn listing(
    db: &DatabaseConnection,
    query: Select<user::Entity>,
    title: &str,
) -> Result<HttpResponse, AppError> {
    let users: Vec<UserDto> = query
        .order_by_asc(user::Column::Id)
        .all(db)
        .await?
        .into_iter()
        .map(to_user_dto)
        .collect();
    let page = Page::new()
        .title(title)
        .add("users/index", json!({ "title": title, "users": users }), Region::Main)
        .add("users/userAdmin", json!({}), Region::Sidebar);
    Ok(page.into_response())
}

async fn list(db: web::Data<DatabaseConnection>) -> Result<HttpResponse, AppError> {
    let users = user::Entity::find()
        .order_by_asc(user::Column::Id)
        .all(db.get_ref())
        .await?;
    let title = "Visa alla användare";
    let page = Page::new()
        .title(title)
        .add(
            "users/index",
            json!({ "title": title, "content": user_table(&users) }),
            Region::Main,
        )
        .add("users/userAdmin", json!({}), Region::Sidebar);
    Ok(page.into_response())
}

async fn get_user(
    db: web::Data<DatabaseConnection>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let user = match find_user(db.get_ref(), &path).await? {
        Ok(user) => user,
        Err(res) => return Ok(res),
    };
    let page = Page::new()
        .title("Visa användare")
        .add("users/view", json!({ "user": to_user_dto(user) }), Region::Main)
        .add("users/userAdmin", json!({}), Region::Sidebar);
    Ok(page.into_response())
}

async fn view_add(
    config: web::Data<AppConfig>,
    store: web::Data<SessionStore>,
    session: SessionId,
) -> Result<HttpResponse, AppError> {
    let mut add = AddUser::new(config.bcrypt_cost);
    add.form.restore(&store, &session);
    Ok(form_page(&config, "Lägg till användare", &add.form, "addUserInfo").await)
}

async fn add(
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
    store: web::Data<SessionStore>,
    session: SessionId,
    form: Submitted,
) -> Result<HttpResponse, AppError> {
    let add = AddUser::new(config.bcrypt_cost);
    Ok(add.submit(db.get_ref(), &form, &store, &session).await)
}

async fn view_update(
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
    store: web::Data<SessionStore>,
    session: SessionId,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let user = match find_user(db.get_ref(), &path).await? {
        Ok(user) => user,
        Err(res) => return Ok(res),
    };
    let mut update = UpdateUser::new(user, config.bcrypt_cost);
    update.form.restore(&store, &session);
    Ok(form_page(&config, "Uppdatera användare", &update.form, "updateUserInfo").await)
}

async fn update(
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
    store: web::Data<SessionStore>,
    session: SessionId,
    path: web::Path<String>,
    form: Submitted,
) -> Result<HttpResponse, AppError> {
    let user = match find_user(db.get_ref(), &path).await? {
        Ok(user) => user,
        Err(res) => return Ok(res),
    };
    let update = UpdateUser::new(user, config.bcrypt_cost);
    Ok(update.submit(db.get_ref(), &form, &store, &session).await)
}

async fn view_delete(
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
    store: web::Data<SessionStore>,
    session: SessionId,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let user = match find_user(db.get_ref(), &path).await? {
        Ok(user) => user,
        Err(res) => return Ok(res),
    };
    let mut delete = DeleteUser::new(&user);
    delete.form.restore(&store, &session);
    Ok(form_page(&config, "Radera användare", &delete.form, "deleteUserInfo").await)
}

async fn delete(
    db: web::Data<DatabaseConnection>,
    store: web::Data<SessionStore>,
    session: SessionId,
    path: web::Path<String>,
    form: Submitted,
) -> Result<HttpResponse, AppError> {
    let user = match find_user(db.get_ref(), &path).await? {
        Ok(user) => user,
        Err(res) => return Ok(res),
    };
    let delete = DeleteUser::new(&user);
    Ok(delete.submit(db.get_ref(), &form, &store, &session).await)
}

async fn view_soft_delete(
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
    store: web::Data<SessionStore>,
    session: SessionId,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let user = match find_user(db.get_ref(), &path).await? {
        Ok(user) => user,
        Err(res) => return Ok(res),
    };
    let mut soft_delete = SoftDeleteUser::new(&user);
    soft_delete.form.restore(&store, &session);
    Ok(form_page(&config, "Ta bort användare", &soft_delete.form, "softDeleteUserInfo").await)
}

async fn soft_delete(
    db: web::Data<DatabaseConnection>,
    store: web::Data<SessionStore>,
    session: SessionId,
    path: web::Path<String>,
    form: Submitted,
) -> Result<HttpResponse, AppError> {
    let user = match find_user(db.get_ref(), &path).await? {
        Ok(user) => user,
        Err(res) => return Ok(res),
    };
    let soft_delete = SoftDeleteUser::new(&user);
    Ok(soft_delete.submit(db.get_ref(), &form, &store, &session).await)
}

async fn active(db: web::Data<DatabaseConnection>) -> Result<HttpResponse, AppError> {
    let query = user::Entity::find()
        .filter(user::Column::Active.is_not_null())
        .filter(user::Column::Deleted.is_null());
    listing(db.get_ref(), query, "Aktiva användare").await
}

async fn inactive(db: web::Data<DatabaseConnection>) -> Result<HttpResponse, AppError> {
    let query = user::Entity::find()
        .filter(user::Column::Active.is_null())
        .filter(user::Column::Deleted.is_null());
    listing(db.get_ref(), query, "Inaktiva användare").await
}

async fn discarded(db: web::Data<DatabaseConnection>) -> Result<HttpResponse, AppError> {
    let query = user::Entity::find().filter(user::Column::Deleted.is_not_null());
    listing(db.get_ref(), query, "Användare i papperskorgen").await
}

async fn reset_db(
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, AppError> {
    let password = hash_password("admin", config.bcrypt_cost)?;
    let now = Utc::now();
    let admin = user::ActiveModel {
        acronym: Set("admin".to_string()),
        email: Set(Some("admin@dbwebb.se".to_string())),
        name: Set(Some("Administrator".to_string())),
        password: Set(Some(password)),
        created: Set(Some(now)),
        active: Set(Some(now)),
        ..Default::default()
    };
    // rolled back on drop if any step fails, so the old table survives
    let txn = db.begin().await?;
    recreate_user_table(&txn).await?;
    admin.insert(&txn).await?;
    txn.commit().await?;
    info!("user table reset, admin seeded");
    Ok(redirect("/users"))
}

fn to_user_dto(model: user::Model) -> UserDto {
    UserDto {
        id: model.id,
        acronym: model.acronym,
        email: model.email,
        name: model.name,
        created: model.created.map(to_rfc3339),
        updated: model.updated.map(to_rfc3339),
        deleted: model.deleted.map(to_rfc3339),
        active: model.active.map(to_rfc3339),
    }
}

fn to_rfc3339(dt: chrono::DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, false)
}
