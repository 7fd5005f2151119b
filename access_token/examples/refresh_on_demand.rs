use access_token::{
    AccessTokenOptions, ClientId, ClientSecret, TokenManager, TokenRecord, ValidityCheck,
};
use clap::Parser;
use std::{path::PathBuf, time::Duration};

#[derive(Debug, Parser)]
struct Opts {
    /// Base URL of the authorization server
    #[arg(short, long, env)]
    site: String,

    /// The client ID of the client
    #[arg(short, long, env)]
    client_id: ClientId,

    /// The client secret used to identify the client to the authorization server
    #[arg(short = 'S', long, env, hide_env_values = true)]
    client_secret: ClientSecret,

    /// Path of the token endpoint
    #[arg(long, env)]
    token_path: Option<String>,

    /// Path of the user info endpoint
    #[arg(long, env)]
    user_info_path: Option<String>,

    /// Ask the user info endpoint instead of trusting the local expiry
    #[arg(short, long)]
    remote_check: bool,

    /// JSON file holding the token record; rewritten after a refresh
    #[arg(short = 'f', long, env, default_value = ".token.json")]
    token_file: PathBuf,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .pretty()
        .with_env_filter(tracing_subscriber::filter::EnvFilter::from_default_env())
        .init();

    let opts = Opts::parse();

    let mut options = AccessTokenOptions::new()
        .site(opts.site)
        .client_id(opts.client_id)
        .client_secret(opts.client_secret);
    options.token_path = opts.token_path;
    options.user_info_path = opts.user_info_path;
    let config = options.build()?;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()?;

    let manager = TokenManager::with_client(config, client);

    let data = tokio::fs::read_to_string(&opts.token_file).await?;
    let record: TokenRecord = serde_json::from_str(&data)?;
    let mut token = manager.wrap(record);

    let check = if opts.remote_check {
        ValidityCheck::Remote
    } else {
        ValidityCheck::Local
    };

    let obtained = token.get_with(check).await?;

    tracing::info!(
        ?obtained,
        token = format_args!("{:#?}", token.record().access_token()),
        expiry = token.record().expires_at().map(|e| e.0),
        "usable access token"
    );

    if obtained.was_refreshed() {
        let data = serde_json::to_string_pretty(token.record())?;
        tokio::fs::write(&opts.token_file, data).await?;
        tracing::info!(file = %opts.token_file.display(), "saved refreshed token");
    }

    Ok(())
}
