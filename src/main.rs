//!
//! teller server binary
//! --------------------
//! Command-line entry point. Configuration comes from defaults, then `TELLER_*`
//! environment variables, then the flags below.

use std::env;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use teller::config::AppConfig;

const USAGE: &str = "teller\n\nUSAGE:\n  teller [--http-port N] [--db-path PATH] [--seed]\n\nOPTIONS:\n  --http-port N    HTTP API port (env: TELLER_HTTP_PORT, default 3030)\n  --db-path PATH   SQLite database file (env: TELLER_DB_PATH, default teller.db)\n  --seed           Provision the default admin (password from TELLER_SEED_ADMIN_PASSWORD)\n  -h, --help       Print this help\n\nREQUIRED ENV:\n  TELLER_JWT_SECRET  token signing secret, at least 32 bytes\n";

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter().position(|a| a == flag).and_then(|i| args.get(i + 1)).map(String::as_str)
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    if has_flag(&args, "--help") || has_flag(&args, "-h") {
        println!("{USAGE}");
        return Ok(());
    }

    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;
    fmt().with_env_filter(filter).init();

    let mut config = AppConfig::from_env().context("loading configuration from environment")?;
    if let Some(port) = flag_value(&args, "--http-port") {
        config.http_port = port.parse().with_context(|| format!("invalid --http-port '{port}'"))?;
    }
    if let Some(path) = flag_value(&args, "--db-path") {
        config.db_path = PathBuf::from(path);
    }
    config.validate()?;

    let seed_password = if has_flag(&args, "--seed") {
        match env::var("TELLER_SEED_ADMIN_PASSWORD") {
            Ok(pw) => Some(pw),
            Err(_) => bail!("--seed requires TELLER_SEED_ADMIN_PASSWORD"),
        }
    } else {
        None
    };

    info!(
        target: "startup",
        "teller starting: RUST_LOG='{}', http_port={}, db_path='{}', pool_size={}, token_ttl_secs={}",
        env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string()),
        config.http_port,
        config.db_path.display(),
        config.pool_size,
        config.token.ttl_secs
    );

    teller::server::run(config, seed_password).await
}
