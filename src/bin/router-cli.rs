use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "router-cli")]
#[command(about = "Management CLI for the service router", long_about = None)]
struct Cli {
    /// Admin API base URL
    #[arg(short, long, default_value = "http://localhost:8081")]
    url: String,

    /// Router base URL, used for the health endpoint
    #[arg(short, long, default_value = "http://localhost:8080")]
    router: String,

    /// Admin API key
    #[arg(short, long, default_value = "CHANGE_ME_IN_PRODUCTION")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check router status
    Status,
    /// Show aggregate service health
    Health {
        /// Health endpoint path
        #[arg(long, default_value = "/health")]
        path: String,
    },
    /// List services, targets, connections and breaker state
    Services,
    /// Force a service's circuit breaker closed
    Reset { service: String },
    /// Add a target to a service
    AddTarget { service: String, target: String },
    /// Remove a target from a service
    RemoveTarget { service: String, target: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let res = match cli.command {
        Commands::Status => {
            client
                .get(format!("{}/admin/status", cli.url))
                .headers(headers)
                .send()
                .await?
        }
        Commands::Health { path } => client.get(format!("{}{}", cli.router, path)).send().await?,
        Commands::Services => {
            client
                .get(format!("{}/admin/services", cli.url))
                .headers(headers)
                .send()
                .await?
        }
        Commands::Reset { service } => {
            client
                .post(format!("{}/admin/services/{}/reset", cli.url, service))
                .headers(headers)
                .send()
                .await?
        }
        Commands::AddTarget { service, target } => {
            client
                .post(format!("{}/admin/services/{}/targets", cli.url, service))
                .headers(headers)
                .json(&json!({ "target": target }))
                .send()
                .await?
        }
        Commands::RemoveTarget { service, target } => {
            client
                .delete(format!("{}/admin/services/{}/targets", cli.url, service))
                .headers(headers)
                .json(&json!({ "target": target }))
                .send()
                .await?
        }
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;

    // The health endpoint answers 503 with a full JSON body when degraded.
    let body = match serde_json::from_str::<Value>(&text) {
        Ok(json) => serde_json::to_string_pretty(&json)?,
        Err(_) => text,
    };

    if status.is_success() {
        println!("{}", body);
    } else {
        eprintln!("Error: router returned status {}", status);
        eprintln!("{}", body);
        std::process::exit(1);
    }
    Ok(())
}
