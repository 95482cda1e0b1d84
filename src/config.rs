use dotenvy::dotenv;
use std::env;
#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub server_addr: String,

    /// Root directory of the payslip document store.
    pub document_root: String,
    /// Optional JSON file with versioned statutory rules; the built-in
    /// defaults apply when unset.
    pub statutory_rules_path: Option<String>,

    // Retry policy for the render/notify stages
    pub retry_max_attempts: u32,
    pub retry_base_delay_ms: u64,

    // Rate limiting
    pub rate_trigger_per_min: u32,
    pub rate_read_per_min: u32,

    pub api_prefix: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        Self {
            server_addr: env::var("SERVER_ADDR").expect("SERVER_ADDR must be set"),
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),

            document_root: env::var("DOCUMENT_ROOT").unwrap_or_else(|_| "documents".to_string()),
            statutory_rules_path: env::var("STATUTORY_RULES_PATH").ok(),

            retry_max_attempts: env::var("RETRY_MAX_ATTEMPTS")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .unwrap(),
            retry_base_delay_ms: env::var("RETRY_BASE_DELAY_MS")
                .unwrap_or_else(|_| "500".to_string())
                .parse()
                .unwrap(),

            rate_trigger_per_min: env::var("RATE_TRIGGER_PER_MIN")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .unwrap(),
            rate_read_per_min: env::var("RATE_READ_PER_MIN")
                .unwrap_or_else(|_| "600".to_string())
                .parse()
                .unwrap(),

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),
        }
    }
}
