use std::sync::{Arc, Mutex};

use anyhow::Result;
use dotenvy::dotenv;

mod api;
mod db;
mod error;
mod esp32;
mod monitor;
mod schema;
mod store;
mod utils;

#[actix_web::main]
async fn main() -> Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let backend = match std::env::var("DATABASE_URL") {
        Ok(url) => {
            log::info!("using sqlite store at {url}");
            store::Backend::Sqlite(db::Db::connect(&url)?)
        }
        Err(_) => {
            log::info!("DATABASE_URL not set, using in-memory store");
            store::Backend::Memory(store::MemStore::default())
        }
    };
    let monitor = Arc::new(Mutex::new(monitor::FaultMonitor::new(backend)));

    let esp32 = std::env::var("ESP32_IP")
        .ok()
        .map(|ip| esp32::spawn_poller(format!("http://{ip}")));

    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8081);
    log::info!("listening on 0.0.0.0:{port}");
    api::new_http_server(monitor, esp32, port).await?;
    Ok(())
}
