use actix_web::HttpResponse;
use log::error;
use serde::Serialize;

use crate::response::ResponseDto;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    Main,
    Sidebar,
}

#[derive(Debug, Serialize)]
pub struct ViewBlock {
    pub template: &'static str,
    pub region: Region,
    pub data: serde_json::Value,
}

/// Everything a page needs rendered: its title, extra stylesheets and the
/// template blocks per region, in the order they were added.
#[derive(Debug, Default, Serialize)]
pub struct Page {
    pub title: Option<String>,
    pub stylesheets: Vec<&'static str>,
    pub views: Vec<ViewBlock>,
}

impl Page {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn stylesheet(mut self, href: &'static str) -> Self {
        self.stylesheets.push(href);
        self
    }

    pub fn add(mut self, template: &'static str, data: impl Serialize, region: Region) -> Self {
        let data = serde_json::to_value(data).unwrap_or_else(|e| {
            error!("view data for {} not serializable: {}", template, e);
            serde_json::Value::Null
        });
        self.views.push(ViewBlock {
            template,
            region,
            data,
        });
        self
    }

    /// Message page shown in place of content that could not be found.
    pub fn error_info(title: &str, subtitle: &str, message: &str) -> Self {
        Self::new().add(
            "error/errorInfo",
            serde_json::json!({
                "title": title,
                "subtitle": subtitle,
                "message": message,
            }),
            Region::Main,
        )
    }

    pub fn into_response(self) -> HttpResponse {
        HttpResponse::Ok().json(ResponseDto::success(Some(self)))
    }
}
