//! Declarative HTML forms: a field set with validation rules, a check cycle
//! over submitted values, and the session memory that carries values, errors
//! and output messages across the redirect that follows a failed submission.

use std::collections::HashMap;

use actix_web::HttpResponse;
use log::error;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::error::AppError;
use crate::response::redirect;
use crate::session::{SessionId, SessionStore};

/// Name of the button every form submits with.
pub const SUBMIT: &str = "submit";

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s.]+$").unwrap_or_else(|e| panic!("email regex: {}", e))
});

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Textarea,
    Password,
    Checkbox,
    Submit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Rule {
    #[serde(rename = "not_empty")]
    NotEmpty,
    #[serde(rename = "email_adress")]
    EmailAddress,
}

impl Rule {
    fn check(&self, value: &str) -> Result<(), &'static str> {
        match self {
            Self::NotEmpty if value.trim().is_empty() => Err("Fältet får inte vara tomt."),
            Self::EmailAddress if !EMAIL.is_match(value.trim()) => {
                Err("Fältet måste innehålla en giltig e-postadress.")
            }
            _ => Ok(()),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub name: &'static str,
    pub kind: FieldKind,
    pub label: &'static str,
    pub required: bool,
    pub readonly: bool,
    pub validation: Vec<Rule>,
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Field {
    fn new(name: &'static str, kind: FieldKind, label: &'static str) -> Self {
        Self {
            name,
            kind,
            label,
            required: false,
            readonly: false,
            validation: Vec::new(),
            value: None,
            error: None,
        }
    }

    pub fn text(name: &'static str, label: &'static str) -> Self {
        Self::new(name, FieldKind::Text, label)
    }

    pub fn textarea(name: &'static str, label: &'static str) -> Self {
        Self::new(name, FieldKind::Textarea, label)
    }

    pub fn password(name: &'static str, label: &'static str) -> Self {
        Self::new(name, FieldKind::Password, label)
    }

    pub fn checkbox(name: &'static str, label: &'static str, checked: bool) -> Self {
        Self::new(name, FieldKind::Checkbox, label).value(checked.then(|| "on".to_string()))
    }

    pub fn submit(label: &'static str) -> Self {
        Self::new(SUBMIT, FieldKind::Submit, "").value(Some(label.to_string()))
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn readonly(mut self) -> Self {
        self.readonly = true;
        self
    }

    pub fn rules(mut self, rules: &[Rule]) -> Self {
        self.validation = rules.to_vec();
        self
    }

    pub fn value(mut self, value: Option<String>) -> Self {
        self.value = value;
        self
    }

    fn accepts_input(&self) -> bool {
        !self.readonly && self.kind != FieldKind::Submit
    }

    fn validate(&mut self) -> bool {
        self.error = None;
        if !self.accepts_input() || self.kind == FieldKind::Checkbox {
            return true;
        }
        let value = self.value.as_deref().unwrap_or("");
        if value.trim().is_empty() {
            if self.required {
                self.error = Some("Fältet måste fyllas i.".to_string());
                return false;
            }
            return true;
        }
        for rule in &self.validation {
            if let Err(msg) = rule.check(value) {
                self.error = Some(msg.to_string());
                return false;
            }
        }
        true
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FormMemory {
    pub values: HashMap<String, String>,
    pub errors: HashMap<String, String>,
    pub output: Vec<String>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum CheckStatus {
    NotSubmitted,
    Invalid,
    Valid,
}

#[derive(Clone, Debug, Serialize)]
pub struct Form {
    pub action: String,
    pub fields: Vec<Field>,
    pub output: Vec<String>,
}

impl Form {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            fields: Vec::new(),
            output: Vec::new(),
        }
    }

    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn value(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .and_then(|f| f.value.as_deref())
    }

    /// Trimmed value, `None` when blank.
    pub fn non_blank(&self, name: &str) -> Option<String> {
        self.value(name)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    pub fn is_checked(&self, name: &str) -> bool {
        self.value(name).is_some()
    }

    pub fn add_output(&mut self, msg: impl Into<String>) {
        self.output.push(msg.into());
    }

    /// Binds submitted values and validates them.
    pub fn check(&mut self, submitted: &HashMap<String, String>) -> CheckStatus {
        if !submitted.contains_key(SUBMIT) {
            return CheckStatus::NotSubmitted;
        }
        for field in self.fields.iter_mut().filter(|f| f.accepts_input()) {
            field.value = match field.kind {
                FieldKind::Checkbox => submitted.get(field.name).map(|_| "on".to_string()),
                _ => submitted.get(field.name).cloned(),
            };
        }
        let mut valid = true;
        for field in self.fields.iter_mut() {
            valid &= field.validate();
        }
        if valid {
            CheckStatus::Valid
        } else {
            CheckStatus::Invalid
        }
    }

    fn memory(&self) -> FormMemory {
        let mut memory = FormMemory {
            output: self.output.clone(),
            ..Default::default()
        };
        for field in self.fields.iter().filter(|f| f.accepts_input()) {
            if let Some(error) = &field.error {
                memory.errors.insert(field.name.to_string(), error.clone());
            }
            if field.kind == FieldKind::Password {
                continue;
            }
            if let Some(value) = &field.value {
                memory.values.insert(field.name.to_string(), value.clone());
            }
        }
        memory
    }

    fn apply(&mut self, memory: FormMemory) {
        for field in self.fields.iter_mut().filter(|f| f.accepts_input()) {
            if field.kind != FieldKind::Password {
                field.value = memory.values.get(field.name).cloned();
            }
            field.error = memory.errors.get(field.name).cloned();
        }
        self.output.extend(memory.output);
    }

    /// Shows what the last failed submission of this form left behind, once.
    pub fn restore(&mut self, store: &SessionStore, session: &SessionId) {
        let key = self.action.clone();
        if let Some(memory) = store.existing(session, |data| data.forms.remove(&key)).flatten() {
            self.apply(memory);
        }
    }

    /// Failure path: keep the message and the submitted values for the next
    /// render and send the visitor back to the form.
    pub fn fail(
        mut self,
        msg: &str,
        store: &SessionStore,
        session: &SessionId,
    ) -> HttpResponse {
        self.add_output(msg);
        let memory = self.memory();
        store.with(session, |data| data.forms.insert(self.action.clone(), memory));
        redirect(&self.action)
    }

    /// Ends the cycle once the save callback has run: a location means
    /// success, anything else takes the failure path.
    pub fn settle(
        self,
        saved: Result<Option<String>, AppError>,
        fail_msg: &str,
        store: &SessionStore,
        session: &SessionId,
    ) -> HttpResponse {
        match saved {
            Ok(Some(location)) => redirect(location),
            Ok(None) => self.fail(fail_msg, store, session),
            Err(e) => {
                error!("saving form {} failed: {}", self.action, e);
                self.fail(fail_msg, store, session)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submitted(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn sample() -> Form {
        Form::new("/sample")
            .field(Field::text("name", "Namn").required().rules(&[Rule::NotEmpty]))
            .field(Field::text("web", "Hemsida").rules(&[Rule::NotEmpty]))
            .field(
                Field::text("mail", "E-post")
                    .required()
                    .rules(&[Rule::NotEmpty, Rule::EmailAddress]),
            )
            .field(Field::password("password", "Lösenord"))
            .field(Field::checkbox("active", "Aktiv", true))
            .field(Field::submit("Spara"))
    }

    #[test]
    fn without_submit_nothing_is_bound() {
        let mut form = sample();
        let status = form.check(&submitted(&[("name", "Kalle")]));
        assert_eq!(status, CheckStatus::NotSubmitted);
        assert_eq!(form.value("name"), None);
        assert!(form.is_checked("active"));
    }

    #[test]
    fn valid_submission_binds_values() {
        let mut form = sample();
        let status = form.check(&submitted(&[
            ("name", "Kalle"),
            ("mail", "kalle@example.com"),
            ("submit", "Spara"),
        ]));
        assert_eq!(status, CheckStatus::Valid);
        assert_eq!(form.value("name"), Some("Kalle"));
        assert_eq!(form.non_blank("web"), None);
        assert!(!form.is_checked("active"));
        assert_eq!(form.value(SUBMIT), Some("Spara"));
    }

    #[test]
    fn required_and_email_rules_reject() {
        let mut form = sample();
        let status = form.check(&submitted(&[
            ("name", "   "),
            ("mail", "not-an-address"),
            ("submit", "Spara"),
        ]));
        assert_eq!(status, CheckStatus::Invalid);
        let errors: Vec<_> = form
            .fields
            .iter()
            .filter_map(|f| f.error.as_ref().map(|_| f.name))
            .collect();
        assert_eq!(errors, vec!["name", "mail"]);
    }

    #[test]
    fn email_rule_shapes() {
        assert!(Rule::EmailAddress.check("a@b.se").is_ok());
        assert!(Rule::EmailAddress.check(" Foo@Example.com ").is_ok());
        assert!(Rule::EmailAddress.check("a@b").is_err());
        assert!(Rule::EmailAddress.check("a b@c.se").is_err());
        assert!(Rule::NotEmpty.check("\t").is_err());
    }

    #[test]
    fn failed_submission_is_remembered_once() {
        let store = SessionStore::new(10);
        let session = SessionId("s".to_string());

        let mut form = sample();
        form.check(&submitted(&[
            ("name", "Kalle"),
            ("mail", "nope"),
            ("password", "hemligt"),
            ("submit", "Spara"),
        ]));
        let res = form.fail("<p>fel</p>", &store, &session);
        assert_eq!(res.status(), actix_web::http::StatusCode::FOUND);

        let mut again = sample();
        again.restore(&store, &session);
        assert_eq!(again.value("name"), Some("Kalle"));
        assert_eq!(again.value("mail"), Some("nope"));
        assert_eq!(again.value("password"), None);
        assert_eq!(again.output, vec!["<p>fel</p>".to_string()]);
        assert!(again.fields.iter().any(|f| f.name == "mail" && f.error.is_some()));

        let mut third = sample();
        third.restore(&store, &session);
        assert!(third.output.is_empty());
    }

    #[test]
    fn settle_redirects_to_saved_location() {
        let store = SessionStore::new(10);
        let session = SessionId("s".to_string());

        let res = sample().settle(Ok(Some("/done".to_string())), "fel", &store, &session);
        assert_eq!(
            res.headers().get("location").and_then(|v| v.to_str().ok()),
            Some("/done")
        );

        let res = sample().settle(Err(AppError::system_exception()), "fel", &store, &session);
        assert_eq!(
            res.headers().get("location").and_then(|v| v.to_str().ok()),
            Some("/sample")
        );
        let mut again = sample();
        again.restore(&store, &session);
        assert_eq!(again.output, vec!["fel".to_string()]);
    }
}
