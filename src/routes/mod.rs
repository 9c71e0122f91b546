#[cfg(test)]
macro_rules! test_app {
    ($db:expr, $store:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new(
                    $crate::routes::test_support::test_config(),
                ))
                .app_data(actix_web::web::Data::new($db.clone()))
                .app_data($store.clone())
                .wrap(actix_web::middleware::from_fn(
                    $crate::session::session_handler,
                ))
                .configure($crate::routes::configure),
        )
    };
}

pub mod comment;
pub mod stored_comment;
pub mod user;

use actix_web::{web, HttpRequest};

use crate::response::form_error_handler;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::FormConfig::default().error_handler(form_error_handler))
        .service(web::scope("/comment").configure(comment::config))
        .service(web::scope("/comments").configure(stored_comment::config))
        .service(web::scope("/users").configure(user::config));
}

pub(crate) fn client_ip(req: &HttpRequest) -> Option<String> {
    req.peer_addr().map(|addr| addr.ip().to_string())
}
