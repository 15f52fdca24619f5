//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `schoolhub_core` linkage, config resolution and schema bootstrap.
//! - Keep output deterministic for quick local sanity checks.

use schoolhub_core::db::{migrations, open_db};
use schoolhub_core::{core_version, init_from_config, ping, BcryptHasher, CoreConfig};
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("schoolhub_cli error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), String> {
    let config = CoreConfig::from_env().map_err(|err| err.to_string())?;
    let file_logging = init_from_config(&config).map_err(|err| err.to_string())?;

    println!("schoolhub_core ping={}", ping());
    println!("schoolhub_core version={}", core_version());
    println!("schoolhub_core file_logging={file_logging}");
    println!(
        "schoolhub_core password_cost={}",
        BcryptHasher::from_config(&config).cost()
    );

    let conn = open_db(&config.db_path).map_err(|err| err.to_string())?;
    let schema_version = migrations::current_version(&conn).map_err(|err| err.to_string())?;
    log::info!(
        "event=cli_health module=cli status=ok schema_version={schema_version} db_path={}",
        config.db_path.display()
    );
    println!("schoolhub_core db_path={}", config.db_path.display());
    println!(
        "schoolhub_core schema_version={schema_version}/{}",
        migrations::latest_version()
    );
    Ok(())
}
