use std::process::ExitCode;

use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, HOST};

#[derive(Parser)]
#[command(name = "proxy-cli")]
#[command(about = "Operator CLI for the vhost reverse proxy", long_about = None)]
struct Cli {
    /// Base URL of the proxy listener.
    #[arg(short, long, default_value = "http://localhost:3000")]
    url: String,

    /// Accept self-signed or otherwise invalid TLS certificates.
    #[arg(short = 'k', long)]
    insecure: bool,

    /// Name of the bypass header configured on the proxy.
    #[arg(long, default_value = "x-no-proxy")]
    bypass_header: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the proxy process is answering
    Status,
    /// Send a request for a virtual host and show the response
    Probe {
        /// Host header to send.
        #[arg(long)]
        host: String,
        /// Request path.
        #[arg(long, default_value = "/")]
        path: String,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::builder()
        .danger_accept_invalid_certs(cli.insecure)
        .http1_only()
        .no_proxy()
        .build()?;
    let base = cli.url.trim_end_matches('/');

    match cli.command {
        Commands::Status => {
            let res = client
                .get(format!("{}/status", base))
                .header(cli.bypass_header.as_str(), "true")
                .send()
                .await?;
            let status = res.status();
            let body = res.text().await?;
            println!("{} {}", status, body);
            Ok(if status.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Commands::Probe { host, path } => {
            let mut headers = HeaderMap::new();
            headers.insert(HOST, HeaderValue::from_str(&host)?);
            let path = if path.starts_with('/') {
                path
            } else {
                format!("/{}", path)
            };

            let res = client
                .get(format!("{}{}", base, path))
                .headers(headers)
                .send()
                .await?;

            println!("{:?} {}", res.version(), res.status());
            for (name, value) in res.headers() {
                println!("{}: {}", name, value.to_str().unwrap_or("<binary>"));
            }
            println!();
            println!("{}", res.text().await?);
            Ok(ExitCode::SUCCESS)
        }
    }
}
