use chrono::Utc;
use env_logger::Env;
use log::error;
use log::warn;
use lostfound::command_line_interface::CliOptions;
use lostfound::database_init;
use lostfound::signed_cookie::CookieSigner;
use lostfound::warp_api;
use lostfound::warp_endpoints::AppState;
use std::io::Write;
use structopt::StructOpt;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(Env::default().filter_or("RUST_LOG", "info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] - {}",
                Utc::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .init();

    let cli_options = CliOptions::from_args();

    if cli_options.reset_database {
        database_init::reset(&cli_options.database).unwrap_or_else(|err| {
            error!("Failed to reset database, {}", err);
            std::process::exit(1);
        });
    }
    let pool = database_init::init(&cli_options.database).unwrap_or_else(|err| {
        error!("Failed to initialize database, {}", err);
        std::process::exit(1);
    });

    let signer = match &cli_options.secret_key {
        Some(secret) if !secret.is_empty() => CookieSigner::new(secret.as_bytes()),
        _ => {
            warn!("No secret key configured, generating a random one for this process");
            CookieSigner::random()
        }
    };

    let state = AppState {
        pool,
        uploads_dir: cli_options.uploads_dir.clone(),
        signer,
        max_upload_bytes: cli_options.max_upload_bytes,
    };

    // Start web framework
    warp_api::run_server(&cli_options, state).await;
}
