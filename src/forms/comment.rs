use std::collections::HashMap;

use actix_web::HttpResponse;
use sea_orm::DatabaseConnection;

use crate::comment::CommentPage;
use crate::error::AppError;
use crate::form::{CheckStatus, Field, Form, Rule};
use crate::response::redirect;
use crate::session::{SessionId, SessionStore};
use crate::stored_comment::{self, CommentInput, StoredComment};

pub const UPDATE_FAILED: &str = "<p><i>Kommentaren kunde inte uppdateras i databasen!</i></p>";
pub const ADD_FAILED: &str = "<p><i>Kommentaren kunde inte sparas i databasen!</i></p>";

fn comment_form(action: String, current: Option<&StoredComment>, submit: &'static str) -> Form {
    Form::new(action)
        .field(
            Field::textarea("content", "Kommentar")
                .required()
                .rules(&[Rule::NotEmpty])
                .value(current.map(|c| c.content.clone())),
        )
        .field(
            Field::text("name", "Namn")
                .required()
                .rules(&[Rule::NotEmpty])
                .value(current.map(|c| c.name.clone())),
        )
        .field(
            Field::text("web", "Hemsida")
                .rules(&[Rule::NotEmpty])
                .value(current.and_then(|c| c.web.clone())),
        )
        .field(
            Field::text("mail", "E-post")
                .required()
                .rules(&[Rule::NotEmpty, Rule::EmailAddress])
                .value(current.map(|c| c.mail.clone())),
        )
        .field(Field::submit(submit))
}

fn input_from(form: &Form, ip: Option<String>) -> CommentInput {
    CommentInput {
        content: form.value("content").unwrap_or_default().to_string(),
        name: form.value("name").unwrap_or_default().to_string(),
        web: form.non_blank("web"),
        mail: form.value("mail").unwrap_or_default().trim().to_string(),
        ip,
    }
}

fn page_location(page: CommentPage) -> String {
    format!("/comments/{}", page)
}

/// Edit form bound to one persisted comment.
pub struct UpdateComment {
    id: i32,
    page: CommentPage,
    pub form: Form,
}

impl UpdateComment {
    pub fn new(comment: &StoredComment, page: CommentPage) -> Self {
        Self {
            id: comment.id,
            page,
            form: comment_form(Self::action(page, comment.id), Some(comment), "Uppdatera"),
        }
    }

    pub fn action(page: CommentPage, id: i32) -> String {
        format!("/comments/{}/update/{}", page, id)
    }

    pub async fn submit(
        mut self,
        db: &DatabaseConnection,
        submitted: &HashMap<String, String>,
        store: &SessionStore,
        session: &SessionId,
    ) -> HttpResponse {
        match self.form.check(submitted) {
            CheckStatus::NotSubmitted => return redirect(&self.form.action),
            CheckStatus::Invalid => return self.form.fail(UPDATE_FAILED, store, session),
            CheckStatus::Valid => {}
        }
        let saved = self.callback_submit(db).await;
        self.form.settle(saved, UPDATE_FAILED, store, session)
    }

    async fn callback_submit(&self, db: &DatabaseConnection) -> Result<Option<String>, AppError> {
        let input = input_from(&self.form, None);
        let updated = stored_comment::update(db, self.page, self.id, input).await?;
        Ok(updated.then(|| page_location(self.page)))
    }
}

/// Create form for a persisted comment page.
pub struct AddComment {
    page: CommentPage,
    ip: Option<String>,
    pub form: Form,
}

impl AddComment {
    pub fn new(page: CommentPage, ip: Option<String>) -> Self {
        Self {
            page,
            ip,
            form: comment_form(Self::action(page), None, "Skicka"),
        }
    }

    pub fn action(page: CommentPage) -> String {
        format!("/comments/{}/add", page)
    }

    pub async fn submit(
        mut self,
        db: &DatabaseConnection,
        submitted: &HashMap<String, String>,
        store: &SessionStore,
        session: &SessionId,
    ) -> HttpResponse {
        match self.form.check(submitted) {
            CheckStatus::NotSubmitted => return redirect(&self.form.action),
            CheckStatus::Invalid => return self.form.fail(ADD_FAILED, store, session),
            CheckStatus::Valid => {}
        }
        let input = input_from(&self.form, self.ip.clone());
        let saved = stored_comment::insert(db, self.page, input)
            .await
            .map(|_| Some(page_location(self.page)))
            .map_err(AppError::from);
        self.form.settle(saved, ADD_FAILED, store, session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored() -> StoredComment {
        StoredComment {
            id: 7,
            content: "Hej".to_string(),
            name: "Kalle".to_string(),
            web: None,
            mail: "kalle@example.com".to_string(),
            gravatar: None,
            ip: None,
            timestamp: None,
        }
    }

    #[test]
    fn update_form_is_bound_to_comment() {
        let update = UpdateComment::new(&stored(), CommentPage::Comments2);
        assert_eq!(update.form.action, "/comments/comments2/update/7");
        assert_eq!(update.form.value("content"), Some("Hej"));
        assert_eq!(update.form.value("web"), None);
        assert_eq!(update.form.value("submit"), Some("Uppdatera"));

        let names: Vec<_> = update.form.fields.iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["content", "name", "web", "mail", "submit"]);
        let required: Vec<_> = update
            .form
            .fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name)
            .collect();
        assert_eq!(required, vec!["content", "name", "mail"]);
    }

    #[test]
    fn input_trims_mail_and_drops_blank_web() {
        let mut form = comment_form("/x".to_string(), None, "Skicka");
        let submitted: HashMap<String, String> = [
            ("content", "Hej"),
            ("name", "Kalle"),
            ("web", "  "),
            ("mail", " Foo@Example.com "),
            ("submit", "Skicka"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        assert_eq!(form.check(&submitted), CheckStatus::Valid);

        let input = input_from(&form, Some("10.0.0.1".to_string()));
        assert_eq!(input.mail, "Foo@Example.com");
        assert_eq!(input.web, None);
        assert_eq!(input.ip.as_deref(), Some("10.0.0.1"));
    }
}
