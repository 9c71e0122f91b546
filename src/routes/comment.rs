use actix_web::{guard, web, HttpRequest, HttpResponse, Resource};
use chrono::Utc;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::comment::{gravatar_url, not_found_message, page_title, Comment};
use crate::comment_store::CommentsInSession;
use crate::config::AppConfig;
use crate::error::AppError;
use crate::response::redirect;
use crate::session::{SessionId, SessionStore};
use crate::view::{Page, Region};

use super::client_ip;

pub fn config(cfg: &mut web::ServiceConfig) {
    // POST-guarded; a GET for these names falls through to the page view
    cfg.service(post_only("/add").route(web::post().to(add)))
        .service(post_only("/edit").route(web::post().to(edit)))
        .service(post_only("/delete").route(web::post().to(delete)))
        .service(post_only("/removeAll").route(web::post().to(remove_all)))
        .service(web::resource("/{page_key}").route(web::get().to(view)))
        .service(web::resource("/{page_key}/add").route(web::get().to(view_add)))
        .service(web::resource("/{page_key}/edit/{id}").route(web::get().to(view_edit)))
        .service(web::resource("/{page_key}/delete/{id}").route(web::get().to(view_delete)));
}

fn post_only(path: &str) -> Resource {
    web::resource(path).guard(guard::Post())
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct CommentSubmission {
    do_create: Option<String>,
    do_edit: Option<String>,
    do_delete: Option<String>,
    do_remove_all: Option<String>,
    redirect: Option<String>,
    page_key: Option<String>,
    id: Option<String>,
    content: Option<String>,
    name: Option<String>,
    web: Option<String>,
    mail: Option<String>,
}

impl CommentSubmission {
    fn id(&self) -> Option<u32> {
        self.id.as_deref().and_then(|v| v.trim().parse().ok())
    }

    fn page_key(&self) -> Option<&str> {
        self.page_key.as_deref().filter(|v| !v.is_empty())
    }

    fn to_comment(&self, page_key: &str, id: u32, ip: Option<String>) -> Comment {
        let mail = self.mail.clone().unwrap_or_default();
        Comment {
            id,
            content: self.content.clone().unwrap_or_default(),
            name: self.name.clone().unwrap_or_default(),
            web: self.web.clone().unwrap_or_default(),
            gravatar: gravatar_url(&mail),
            mail,
            timestamp: Utc::now().timestamp(),
            ip,
            page_key: page_key.to_string(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FormValues {
    mail: Option<String>,
    web: Option<String>,
    name: Option<String>,
    content: Option<String>,
    output: Option<String>,
    id: Option<u32>,
    page_key: String,
}

impl FormValues {
    fn new(page_key: &str, comment: Option<&Comment>, output: Option<String>, id: Option<u32>) -> Self {
        Self {
            mail: comment.map(|c| c.mail.clone()),
            web: comment.map(|c| c.web.clone()),
            name: comment.map(|c| c.name.clone()),
            content: comment.map(|c| c.content.clone()),
            output,
            id,
            page_key: page_key.to_string(),
        }
    }
}

/// A confirmation marker counts when it carries a truthy value.
fn is_posted(flag: Option<&str>) -> bool {
    matches!(flag, Some(v) if !v.is_empty() && v != "0")
}

fn form_page(page_key: &str, template: &'static str, values: FormValues) -> Page {
    let mut page = Page::new().stylesheet("css/form.css");
    if let Some(title) = page_title(page_key) {
        page = page
            .title(title)
            .add("comment/index", json!({ "pageTitle": title }), Region::Main);
    }
    page.add(template, values, Region::Main)
}

/// Looks the comment up for the edit and delete views; a miss blanks the id
/// and explains why in `output`.
fn lookup_values(comments: &CommentsInSession, page_key: &str, raw_id: &str) -> FormValues {
    let found = raw_id
        .parse::<u32>()
        .ok()
        .and_then(|id| comments.find_by_id(page_key, id));
    match found {
        Some(comment) => FormValues::new(page_key, Some(&comment), None, Some(comment.id)),
        None => FormValues::new(page_key, None, Some(not_found_message(raw_id)), None),
    }
}

async fn view(
    store: web::Data<SessionStore>,
    session: SessionId,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let page_key = path.into_inner();
    let all = CommentsInSession::new(&store, &session).find_all(&page_key);
    let page = Page::new().add(
        "comment/comments",
        json!({ "comments": all, "pageKey": page_key }),
        Region::Main,
    );
    Ok(page.into_response())
}

async fn view_add(path: web::Path<String>) -> Result<HttpResponse, AppError> {
    let page_key = path.into_inner();
    let values = FormValues::new(&page_key, None, None, None);
    Ok(form_page(&page_key, "comment/form", values).into_response())
}

async fn add(
    req: HttpRequest,
    config: web::Data<AppConfig>,
    store: web::Data<SessionStore>,
    session: SessionId,
    form: web::Form<CommentSubmission>,
) -> Result<HttpResponse, AppError> {
    let target = config.redirect_or_default(form.redirect.as_deref());
    if !is_posted(form.do_create.as_deref()) {
        debug!("add without doCreate, nothing stored");
        return Ok(redirect(target));
    }
    let Some(page_key) = form.page_key() else {
        warn!("comment submitted without pageKey");
        return Ok(redirect(target));
    };
    let comment = form.to_comment(page_key, 0, client_ip(&req));
    let id = CommentsInSession::new(&store, &session).add(comment);
    debug!("comment {} added to {}", id, page_key);
    Ok(redirect(target))
}

async fn view_edit(
    store: web::Data<SessionStore>,
    session: SessionId,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, AppError> {
    let (page_key, raw_id) = path.into_inner();
    let comments = CommentsInSession::new(&store, &session);
    let values = lookup_values(&comments, &page_key, &raw_id);
    Ok(form_page(&page_key, "comment/editForm", values).into_response())
}

async fn edit(
    req: HttpRequest,
    config: web::Data<AppConfig>,
    store: web::Data<SessionStore>,
    session: SessionId,
    form: web::Form<CommentSubmission>,
) -> Result<HttpResponse, AppError> {
    let target = config.redirect_or_default(form.redirect.as_deref());
    if !is_posted(form.do_edit.as_deref()) {
        debug!("edit without doEdit, nothing changed");
        return Ok(redirect(target));
    }
    if let (Some(page_key), Some(id)) = (form.page_key(), form.id()) {
        let comment = form.to_comment(page_key, id, client_ip(&req));
        if !CommentsInSession::new(&store, &session).edit(comment) {
            debug!("edit of missing comment {} on {}", id, page_key);
        }
    }
    Ok(redirect(target))
}

async fn view_delete(
    store: web::Data<SessionStore>,
    session: SessionId,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, AppError> {
    let (page_key, raw_id) = path.into_inner();
    let comments = CommentsInSession::new(&store, &session);
    let values = lookup_values(&comments, &page_key, &raw_id);
    Ok(form_page(&page_key, "comment/deleteForm", values).into_response())
}

async fn delete(
    config: web::Data<AppConfig>,
    store: web::Data<SessionStore>,
    session: SessionId,
    form: web::Form<CommentSubmission>,
) -> Result<HttpResponse, AppError> {
    let target = config.redirect_or_default(form.redirect.as_deref());
    if !is_posted(form.do_delete.as_deref()) {
        debug!("delete without doDelete, nothing removed");
        return Ok(redirect(target));
    }
    if let (Some(page_key), Some(id)) = (form.page_key(), form.id()) {
        CommentsInSession::new(&store, &session).delete(page_key, id);
    }
    Ok(redirect(target))
}

async fn remove_all(
    config: web::Data<AppConfig>,
    store: web::Data<SessionStore>,
    session: SessionId,
    form: web::Form<CommentSubmission>,
) -> Result<HttpResponse, AppError> {
    let target = config.redirect_or_default(form.redirect.as_deref());
    if !is_posted(form.do_remove_all.as_deref()) {
        debug!("removeAll without doRemoveAll, nothing removed");
        return Ok(redirect(target));
    }
    if let Some(page_key) = form.page_key() {
        let removed = CommentsInSession::new(&store, &session).delete_all(page_key);
        debug!("removed {} comments from {}", removed, page_key);
    }
    Ok(redirect(target))
}
