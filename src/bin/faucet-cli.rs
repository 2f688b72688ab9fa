use std::time::Duration;

use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::{json, Value};

use eth_faucet::security::auth::issue_token;

#[derive(Parser)]
#[command(name = "faucet-cli")]
#[command(about = "Management CLI for the token faucet", long_about = None)]
struct Cli {
    #[arg(short, long, env = "FAUCET_URL", default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the faucet address, network and payout
    Info,
    /// Request a payout, minting a short-lived token with the shared secret
    Fund {
        /// Recipient address
        address: String,

        #[arg(long, env = "FAUCET_SERVER_AUTH_SECRET")]
        secret: String,

        #[arg(long, default_value = "cli")]
        provider: String,

        #[arg(long, default_value = "operator")]
        username: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Info => {
            let res = client.get(format!("{}/api/info", cli.url)).send().await?;
            print_response(res).await?;
        }
        Commands::Fund {
            address,
            secret,
            provider,
            username,
        } => {
            let token = issue_token(&secret, &provider, &username, Duration::from_secs(60))?;
            let mut headers = HeaderMap::new();
            headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {}", token))?);

            let res = client
                .post(format!("{}/api/fund", cli.url))
                .headers(headers)
                .json(&json!({ "address": address }))
                .send()
                .await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    if !status.is_success() && serde_json::from_str::<Value>(&text).is_err() {
        eprintln!("Error: faucet returned status {}", status);
        eprintln!("Response: {}", text.trim_end());
        return Ok(());
    }

    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text),
    }
    Ok(())
}
