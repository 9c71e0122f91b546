use actix_web::{error::UrlencodedError, http::header, HttpRequest, HttpResponse};
use serde::Serialize;

use crate::error::AppError;

#[derive(Serialize)]
pub struct ResponseDto<T: Serialize> {
    pub data: Option<T>,
    pub code: i32,
    pub msg: String,
}

impl<T: Serialize> ResponseDto<T> {
    pub fn success(data: Option<T>) -> Self {
        Self {
            data,
            code: 0,
            msg: "".to_string(),
        }
    }
}

pub fn form_error_handler(err: UrlencodedError, _req: &HttpRequest) -> actix_web::Error {
    log::debug!("rejected form payload: {}", err);
    AppError::param_error("ogiltiga parametrar").into()
}

pub fn response_from_error(err: &AppError) -> HttpResponse {
    HttpResponse::Ok().json(ResponseDto::<()> {
        data: None,
        code: err.code(),
        msg: err.msg().to_string(),
    })
}

/// `302 Found` towards `location`, the way every mutating action ends.
pub fn redirect(location: impl AsRef<str>) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, location.as_ref()))
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redirect_sets_location() {
        let res = redirect("/comment/comments1");
        assert_eq!(res.status(), actix_web::http::StatusCode::FOUND);
        assert_eq!(
            res.headers().get(header::LOCATION).and_then(|v| v.to_str().ok()),
            Some("/comment/comments1")
        );
    }

    #[test]
    fn success_envelope_has_zero_code() {
        let dto = ResponseDto::success(Some(3));
        let json = serde_json::to_value(&dto).unwrap();
        assert_eq!(json, serde_json::json!({"data": 3, "code": 0, "msg": ""}));
    }
}
