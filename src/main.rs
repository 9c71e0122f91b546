mod comment;
mod comment_store;
mod config;
mod content;
mod db;
mod entity;
mod error;
mod form;
mod forms;
mod response;
mod routes;
mod session;
mod stored_comment;
mod user_table;
mod view;

use actix_web::{middleware, web, App, HttpServer};
use config::AppConfig;
use db::connect_db;
use log::info;
use session::{session_handler, spawn_purge, SessionStore};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();
    let config = AppConfig::from_env();
    let db = connect_db(&config).await;
    let store = web::Data::new(SessionStore::new(config.session_ttl_minutes));
    spawn_purge(store.clone());
    let server_port = config.server_port;

    let server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(config.clone()))
            .app_data(web::Data::new(db.clone()))
            .app_data(store.clone())
            .wrap(actix_web::middleware::from_fn(session_handler))
            .wrap(middleware::Logger::default())
            .configure(routes::configure)
    })
    .bind(("0.0.0.0", server_port))?;
    info!("server started at http://0.0.0.0:{}", server_port);
    server.run().await
}
