use lazy_static::lazy_static;
use std::net::IpAddr;
use std::path::PathBuf;
use structopt::clap::AppSettings;
use structopt::StructOpt;

#[derive(StructOpt, Debug, Clone)]
#[structopt(
    name = "Campus Lost & Found bulletin server.",
    setting = AppSettings::DeriveDisplayOrder,
    setting = AppSettings::UnifiedHelpMessage,
    version = VERSION.as_str(),
)]
pub struct CliOptions {
    /// Port to listen to.
    #[structopt(short, long, default_value = "5000", env = "LOSTFOUND_PORT")]
    pub port: u16,

    /// Network interface to listen on.
    /// The default only accepts connections from the same computer,
    /// use "0.0.0.0" to serve the whole network.
    #[structopt(
        short,
        long,
        default_value = "127.0.0.1",
        value_name = "NETWORK_INTERFACE",
        env = "LOSTFOUND_ADDRESS"
    )]
    pub address: IpAddr,

    /// SQLite database file holding all posted items.
    /// Created, together with its directory, if it does not exist.
    #[structopt(
        short,
        long,
        default_value = "./data/lost_and_found.db",
        value_name = "DATABASE_FILE",
        env = "LOSTFOUND_DATABASE"
    )]
    pub database: PathBuf,

    /// Directory where uploaded item photos are stored.
    #[structopt(
        short,
        long,
        default_value = "./data/uploads",
        value_name = "UPLOADS_DIR",
        env = "LOSTFOUND_UPLOADS_DIR"
    )]
    pub uploads_dir: PathBuf,

    /// Maximum size of a post submission in bytes, photo included.
    /// Larger submissions are refused before anything is stored.
    #[structopt(long, default_value = "16777216", env = "LOSTFOUND_MAX_UPLOAD_BYTES")]
    pub max_upload_bytes: u64,

    /// Secret used to sign the one-time post receipt and flash message cookies.
    /// If not specified, a random secret is generated on every start,
    /// which invalidates such cookies across restarts.
    #[structopt(long, value_name = "SECRET", env = "LOSTFOUND_SECRET_KEY", hide_env_values = true)]
    pub secret_key: Option<String>,

    /// File to read https public certificate from.
    /// https is used only if both this and `--tls-priv-key` are given.
    #[structopt(long, value_name = "CERTIFICATE_FILE")]
    pub tls_pub_crt: Option<PathBuf>,

    /// File to read https private key from.
    #[structopt(long, value_name = "KEY_FILE")]
    pub tls_priv_key: Option<PathBuf>,

    /// Delete the database file before starting, leaving an empty item list.
    /// Uploaded photos are not touched.
    #[structopt(long)]
    pub reset_database: bool,
}

lazy_static! {
    pub static ref VERSION: String = crate::internal_api::get_project_version().to_string();
}
