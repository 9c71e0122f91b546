use log::{error, info};
use sea_orm::sea_query::Table;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, Schema};
use std::fs::{self, OpenOptions};
use std::path::Path;

use crate::config::AppConfig;
use crate::entity::{comments1, comments2, user};

pub async fn connect_db(config: &AppConfig) -> DatabaseConnection {
    ensure_sqlite_path(config);
    let url = config.database_url();
    let mut options = ConnectOptions::new(url);
    if config.database_url().contains(":memory:") {
        // every pooled connection would otherwise see its own empty database
        options.max_connections(1).min_connections(1);
    }
    let db = Database::connect(options)
        .await
        .unwrap_or_else(|e| panic!("db connect failed: {}", e));
    if let Err(e) = init_schema(&db).await {
        error!("schema init failed: {}", e);
    }
    db
}

fn ensure_sqlite_path(config: &AppConfig) {
    let raw = config.database_url();
    if !raw.starts_with("sqlite:") || raw.contains(":memory:") {
        return;
    }
    let path = raw
        .strip_prefix("sqlite://")
        .or_else(|| raw.strip_prefix("sqlite:"))
        .unwrap_or(raw.as_str());
    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let _ = OpenOptions::new().create(true).write(true).open(path);
}

/// Creates every table that does not exist yet; existing data is left alone.
pub async fn init_schema<C: ConnectionTrait>(db: &C) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);
    for mut stmt in [
        schema.create_table_from_entity(user::Entity),
        schema.create_table_from_entity(comments1::Entity),
        schema.create_table_from_entity(comments2::Entity),
    ] {
        let stmt = stmt.if_not_exists().to_owned();
        db.execute(backend.build(&stmt)).await?;
    }
    info!("schema ready");
    Ok(())
}

/// Drops the `user` table when present and creates it again, empty.
pub async fn recreate_user_table<C: ConnectionTrait>(db: &C) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let drop = Table::drop().table(user::Entity).if_exists().to_owned();
    db.execute(backend.build(&drop)).await?;

    let create = Schema::new(backend).create_table_from_entity(user::Entity);
    db.execute(backend.build(&create)).await?;
    Ok(())
}

#[cfg(test)]
pub async fn test_db() -> DatabaseConnection {
    connect_db(&AppConfig::for_tests()).await
}
