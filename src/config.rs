use std::env;

/// Runtime configuration, read once from the environment at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub upload_dir: String,
    pub max_connections: u32,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let bind_addr = match env::var("BIND_ADDR") {
            Ok(val) => val,
            Err(_) => {
                log::warn!("No BIND_ADDR set — using 127.0.0.1:8080");
                "127.0.0.1:8080".to_string()
            }
        };

        let upload_dir = match env::var("UPLOAD_DIR") {
            Ok(val) => val,
            Err(_) => {
                log::warn!("No UPLOAD_DIR set — using data/uploads");
                "data/uploads".to_string()
            }
        };

        let max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(8);

        Config {
            database_url,
            bind_addr,
            upload_dir,
            max_connections,
        }
    }
}
