use std::env;

/// Connection settings for the sales database.
///
/// The defaults mirror the current deployment (local MySQL, `coronel`
/// schema). A `.env` file or the process environment can override any
/// field without recompiling.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3306,
            user: "root".to_string(),
            password: String::new(),
            database: "coronel".to_string(),
        }
    }
}

pub fn load() -> DbConfig {
    // Best effort: a missing .env just means the defaults stand.
    dotenvy::dotenv().ok();

    let mut cfg = DbConfig::default();
    if let Ok(v) = env::var("SALES_DB_HOST") {
        cfg.host = v;
    }
    if let Ok(v) = env::var("SALES_DB_PORT") {
        match v.parse() {
            Ok(p) => cfg.port = p,
            Err(_) => tracing::warn!("ignoring non-numeric SALES_DB_PORT: {v}"),
        }
    }
    if let Ok(v) = env::var("SALES_DB_USER") {
        cfg.user = v;
    }
    if let Ok(v) = env::var("SALES_DB_PASSWORD") {
        cfg.password = v;
    }
    if let Ok(v) = env::var("SALES_DB_NAME") {
        cfg.database = v;
    }
    cfg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_local_mysql() {
        let cfg = DbConfig::default();
        assert_eq!(cfg.host, "127.0.0.1");
        assert_eq!(cfg.port, 3306);
        assert_eq!(cfg.database, "coronel");
    }
}
