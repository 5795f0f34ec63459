use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "rpc-cli")]
#[command(about = "Management CLI for the RPC service", long_about = None)]
struct Cli {
    /// RPC endpoint base URL
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// Observability sidecar base URL
    #[arg(short, long, default_value = "http://localhost:53000")]
    observability_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Call an RPC method
    Call {
        method: String,
        /// Params as JSON (defaults to `{}`)
        params: Option<String>,
    },
    /// Check service status
    Status,
    /// Dump Prometheus metrics
    Metrics,
    /// Fetch a profile (e.g. goroutine, heap, profile)
    Profile {
        name: String,
        #[arg(short, long)]
        seconds: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Call { method, params } => {
            let params: Value = match params {
                Some(raw) => serde_json::from_str(&raw)?,
                None => Value::Object(Default::default()),
            };
            let body = serde_json::json!({ "method": method, "params": params, "id": 1 });
            let res = client
                .post(format!("{}/jsonrpc/v2", cli.url))
                .json(&body)
                .send()
                .await?;
            print_json(res).await?;
        }
        Commands::Status => {
            let res = client.get(format!("{}/", cli.observability_url)).send().await?;
            print_text(res).await?;
        }
        Commands::Metrics => {
            let res = client
                .get(format!("{}/metrics", cli.observability_url))
                .send()
                .await?;
            print_text(res).await?;
        }
        Commands::Profile { name, seconds } => {
            let mut req = client.get(format!("{}/debug/pprof/{}", cli.observability_url, name));
            if let Some(seconds) = seconds {
                req = req.query(&[("seconds", seconds)]);
            }
            print_text(req.send().await?).await?;
        }
    }

    Ok(())
}

async fn print_json(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: service returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

async fn print_text(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    if !status.is_success() {
        eprintln!("Error: service returned status {}", status);
        eprintln!("Response: {}", text);
        return Ok(());
    }

    print!("{}", text);
    Ok(())
}
