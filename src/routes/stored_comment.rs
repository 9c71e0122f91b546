use std::collections::HashMap;

use actix_web::{web, HttpRequest, HttpResponse};
use log::debug;
use sea_orm::DatabaseConnection;
use serde_json::json;

use crate::comment::{not_found_message, CommentPage};
use crate::error::AppError;
use crate::form::Form;
use crate::forms::comment::{AddComment, UpdateComment};
use crate::session::{SessionId, SessionStore};
use crate::stored_comment::{self, StoredComment};
use crate::view::{Page, Region};

use super::client_ip;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/{page_key}").route(web::get().to(list)))
        .service(
            web::resource("/{page_key}/add")
                .route(web::get().to(view_add))
                .route(web::post().to(add)),
        )
        .service(
            web::resource("/{page_key}/update/{id}")
                .route(web::get().to(view_update))
                .route(web::post().to(update)),
        );
}

fn missing_comment(page: CommentPage, raw_id: &str) -> HttpResponse {
    Page::error_info(page.title(), "Kommentaren saknas", &not_found_message(raw_id))
        .into_response()
}

fn form_page(page: CommentPage, form: &Form) -> HttpResponse {
    Page::new()
        .title(page.title())
        .stylesheet("css/form.css")
        .add("comments/form", json!({ "pageKey": page.key(), "form": form }), Region::Main)
        .into_response()
}

fn parse_page(page_key: &str) -> Result<CommentPage, AppError> {
    page_key
        .parse::<CommentPage>()
        .map_err(|e| AppError::not_found(e.to_string()))
}

/// Resolves the row behind `/{page_key}/update/{id}`; the inner `Err` is the
/// not-found page to send instead.
async fn lookup(
    db: &DatabaseConnection,
    page_key: &str,
    raw_id: &str,
) -> Result<Result<(CommentPage, StoredComment), HttpResponse>, AppError> {
    let page = parse_page(page_key)?;
    let Ok(id) = raw_id.parse::<i32>() else {
        return Ok(Err(missing_comment(page, raw_id)));
    };
    match stored_comment::find(db, page, id).await? {
        Some(comment) => Ok(Ok((page, comment))),
        None => {
            debug!("no stored comment {} on {}", id, page);
            Ok(Err(missing_comment(page, raw_id)))
        }
    }
}

async fn list(
    db: web::Data<DatabaseConnection>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let page = parse_page(&path)?;
    let comments = stored_comment::find_all(db.get_ref(), page).await?;
    let view = Page::new().title(page.title()).add(
        "comments/stored",
        json!({ "pageKey": page.key(), "comments": comments }),
        Region::Main,
    );
    Ok(view.into_response())
}

async fn view_add(
    req: HttpRequest,
    store: web::Data<SessionStore>,
    session: SessionId,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let page = parse_page(&path)?;
    let mut add = AddComment::new(page, client_ip(&req));
    add.form.restore(&store, &session);
    Ok(form_page(page, &add.form))
}

async fn add(
    req: HttpRequest,
    db: web::Data<DatabaseConnection>,
    store: web::Data<SessionStore>,
    session: SessionId,
    path: web::Path<String>,
    form: web::Form<HashMap<String, String>>,
) -> Result<HttpResponse, AppError> {
    let page = parse_page(&path)?;
    let add = AddComment::new(page, client_ip(&req));
    Ok(add.submit(db.get_ref(), &form, &store, &session).await)
}

async fn view_update(
    db: web::Data<DatabaseConnection>,
    store: web::Data<SessionStore>,
    session: SessionId,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, AppError> {
    let (page_key, raw_id) = path.into_inner();
    let (page, comment) = match lookup(db.get_ref(), &page_key, &raw_id).await? {
        Ok(found) => found,
        Err(res) => return Ok(res),
    };
    let mut update = UpdateComment::new(&comment, page);
    update.form.restore(&store, &session);
    Ok(form_page(page, &update.form))
}

async fn update(
    db: web::Data<DatabaseConnection>,
    store: web::Data<SessionStore>,
    session: SessionId,
    path: web::Path<(String, String)>,
    form: web::Form<HashMap<String, String>>,
) -> Result<HttpResponse, AppError> {
    let (page_key, raw_id) = path.into_inner();
    let (page, comment) = match lookup(db.get_ref(), &page_key, &raw_id).await? {
        Ok(found) => found,
        Err(res) => return Ok(res),
    };
    let update = UpdateComment::new(&comment, page);
    Ok(update.submit(db.get_ref(), &form, &store, &session).await)
}
