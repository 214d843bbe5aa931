use std::path::PathBuf;

use clap::{Parser, Subcommand};
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::Method;
use serde_json::Value;

use relay_gateway::config::load_config;
use relay_gateway::Gateway;

#[derive(Parser)]
#[command(name = "relay-cli")]
#[command(about = "Tooling for relay-gateway configurations and endpoints", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load, validate and compile a configuration file
    Check {
        config: PathBuf,
    },
    /// Send a request to a running gateway and print the response
    Call {
        #[arg(short, long, default_value = "http://localhost:8080")]
        url: String,

        #[arg(short = 'X', long, default_value = "GET")]
        method: String,

        /// Endpoint path, e.g. /users/42
        path: String,

        /// Request body
        #[arg(short, long)]
        data: Option<String>,

        #[arg(short, long, default_value = "application/json")]
        content_type: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check { config } => {
            let config = load_config(&config)?;
            let gateway = Gateway::compile(&config)?;
            println!(
                "OK: {} services, {} flows, {} endpoints",
                config.services.len(),
                config.flows.len(),
                gateway.endpoint_count()
            );
        }
        Commands::Call {
            url,
            method,
            path,
            data,
            content_type,
        } => {
            let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())?;
            let mut request = reqwest::Client::new().request(method, format!("{url}{path}"));
            if let Some(data) = data {
                request = request
                    .header(CONTENT_TYPE, HeaderValue::from_str(&content_type)?)
                    .body(data);
            }

            print_response(request.send().await?).await?;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;

    if !status.is_success() {
        eprintln!("Error: gateway returned status {}", status);
        eprintln!("Response: {}", text);
        return Ok(());
    }

    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text),
    }
    Ok(())
}
