use std::io::{Read, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use reqwest::StatusCode;
use url::Url;

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Command-line client for the relay gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080", env = "GATEWAY_URL")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store a blob and print its id (reads stdin when no file is given)
    Put { file: Option<PathBuf> },
    /// Print a stored blob
    Get { id: String },
    /// GET an upstream URL through the gateway proxy
    Fetch {
        target: String,
        /// Extra request header, `Name: value`. `${NAME}` placeholders are
        /// resolved by the gateway.
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,
    },
}

/// `<base>/api/proxy/<target>`, with the target percent-encoded as a single
/// path segment.
fn proxy_url(base: &str, target: &str) -> Result<Url, Box<dyn std::error::Error>> {
    let mut url = Url::parse(base)?;
    url.path_segments_mut()
        .map_err(|()| format!("gateway URL '{base}' cannot carry a path"))?
        .pop_if_empty()
        .extend(["api", "proxy", target]);
    Ok(url)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    match cli.command {
        Commands::Put { file } => {
            let body = match file {
                Some(path) => std::fs::read(path)?,
                None => {
                    let mut buf = Vec::new();
                    std::io::stdin().read_to_end(&mut buf)?;
                    buf
                }
            };
            let res = client
                .post(format!("{base}/api/store/"))
                .body(body)
                .send()
                .await?;
            let status = res.status();
            let text = res.text().await?;
            match status {
                StatusCode::CREATED => println!("{text} (new)"),
                StatusCode::OK => println!("{text} (already stored)"),
                _ => return Err(format!("gateway returned {status}: {text}").into()),
            }
        }
        Commands::Get { id } => {
            let res = client.get(format!("{base}/api/store/{id}")).send().await?;
            let status = res.status();
            if !status.is_success() {
                return Err(format!("gateway returned {status}").into());
            }
            std::io::stdout().write_all(&res.bytes().await?)?;
        }
        Commands::Fetch { target, headers } => {
            let mut req = client.get(proxy_url(base, &target)?);
            for header in &headers {
                let (name, value) = header
                    .split_once(':')
                    .ok_or_else(|| format!("malformed header '{header}', expected 'Name: value'"))?;
                req = req.header(name.trim(), value.trim());
            }

            let res = req.send().await?;
            eprintln!("{}", res.status());
            std::io::stdout().write_all(&res.bytes().await?)?;
        }
    }

    Ok(())
}
