//! Environment-driven configuration, following the same `from_env` +
//! local parsing-helper pattern the store service uses for its
//! optimization knobs.

#[derive(Debug, Clone)]
pub struct Config {
    pub pg_host: String,
    pub pg_name: String,
    pub pg_port: u16,
    pub pg_user: String,
    pub pg_password: String,

    /// Maximum LoD ever served; caller-requested depths are clamped to this.
    pub depth: u32,
    /// Whether to `ORDER BY morton` when sampling patches for a node.
    pub use_morton: bool,
    /// Accumulate points/sec counters.
    pub stats: bool,
    /// Override path for the root hierarchy cache file (used when
    /// `lod_min == 0`).
    pub root_hcy: Option<String>,
    /// Base directory for the on-disk hierarchy cache.
    pub cache_dir: String,
    /// Connection pool size; also bounds HierarchyEngine root fan-out width.
    pub pool_size: u32,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            pg_host: std::env::var("PG_HOST").unwrap_or_else(|_| "localhost".to_string()),
            pg_name: std::env::var("PG_NAME").unwrap_or_else(|_| "pointclouds".to_string()),
            pg_port: parse_u16("PG_PORT", 5432),
            pg_user: std::env::var("PG_USER").unwrap_or_else(|_| "postgres".to_string()),
            pg_password: std::env::var("PG_PASSWORD").unwrap_or_default(),

            depth: parse_u32("DEPTH", 12),
            use_morton: parse_bool("USE_MORTON", true),
            stats: parse_bool("STATS", false),
            root_hcy: std::env::var("ROOT_HCY").ok(),
            cache_dir: std::env::var("CACHE_DIR").unwrap_or_else(|_| "/tmp/pc-hierarchy-cache".to_string()),
            pool_size: parse_u32("POOL_SIZE", 8).clamp(1, 256),
        }
    }

    pub fn database_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.pg_user, self.pg_password, self.pg_host, self.pg_port, self.pg_name
        )
    }
}

fn parse_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .and_then(|v| match v.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}

fn parse_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn parse_u16(key: &str, default: u16) -> u16 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bool_accepts_common_spellings() {
        std::env::set_var("PC_TEST_FLAG", "yes");
        assert!(parse_bool("PC_TEST_FLAG", false));
        std::env::set_var("PC_TEST_FLAG", "0");
        assert!(!parse_bool("PC_TEST_FLAG", true));
        std::env::remove_var("PC_TEST_FLAG");
        assert!(parse_bool("PC_TEST_FLAG", true));
    }

    #[test]
    fn database_url_format() {
        let cfg = Config {
            pg_host: "db".into(),
            pg_name: "lidar".into(),
            pg_port: 5433,
            pg_user: "u".into(),
            pg_password: "p".into(),
            depth: 10,
            use_morton: true,
            stats: false,
            root_hcy: None,
            cache_dir: "/tmp".into(),
            pool_size: 4,
        };
        assert_eq!(cfg.database_url(), "postgres://u:p@db:5433/lidar");
    }
}
