use clap::{Parser, Subcommand, ValueEnum};
use rand::Rng;
use reqwest::header::{HeaderMap, CONTENT_TYPE};

/// Certificate request as sent by Widevine players; license services reject it.
const CERT_CHALLENGE: &[u8] = b"0x02";

/// Real license challenges are a little over 2 KB.
const LICENSE_CHALLENGE_LEN: usize = 2500;

#[derive(Parser)]
#[command(name = "drm-proxy-cli")]
#[command(about = "Diagnostics for a running DRM proxy", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8000")]
    url: String,

    /// Skip certificate verification (self-signed local certs).
    #[arg(long)]
    insecure: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a certificate challenge and a random license challenge
    License {
        #[arg(long, value_enum, default_value_t = Scheme::Widevine)]
        scheme: Scheme,
    },
    /// Fetch a media path through the proxy
    Stream {
        /// Path below /stream, e.g. `dash.mpd`
        path: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Scheme {
    Widevine,
    Playready,
}

impl Scheme {
    fn path(self) -> &'static str {
        match self {
            Scheme::Widevine => "/license-proxy",
            Scheme::Playready => "/license-proxy/playready",
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::builder()
        .danger_accept_invalid_certs(cli.insecure)
        .timeout(std::time::Duration::from_secs(15))
        .build()?;
    let base = cli.url.trim_end_matches('/');

    match cli.command {
        Commands::License { scheme } => {
            let url = format!("{}{}", base, scheme.path());

            let mut challenge = vec![0u8; LICENSE_CHALLENGE_LEN];
            rand::thread_rng().fill(&mut challenge[..]);

            probe_license(&client, &url, "Certificate Test", CERT_CHALLENGE.to_vec()).await;
            probe_license(&client, &url, "License Test", challenge).await;
            println!("\n--- Diagnostics Complete ---");
        }
        Commands::Stream { path } => {
            let url = format!("{}/stream/{}", base, path.trim_start_matches('/'));
            let res = client.get(&url).send().await?;
            let status = res.status();
            print_headers(res.headers());
            let body = res.bytes().await?;
            println!("Status: {}", status);
            println!("Bytes received: {}", body.len());
            if !status.is_success() {
                println!("Body: {}", String::from_utf8_lossy(&body));
            }
        }
    }

    Ok(())
}

async fn probe_license(client: &reqwest::Client, url: &str, name: &str, challenge: Vec<u8>) {
    println!("\n--- Running Test: {} ---", name);
    println!("Request Size: {} bytes", challenge.len());

    let res = match client
        .post(url)
        .header(CONTENT_TYPE, "application/octet-stream")
        .body(challenge)
        .send()
        .await
    {
        Ok(res) => res,
        Err(e) if e.is_connect() => {
            println!("Result: CONNECTION ERROR. Is the proxy running at {}?", url);
            return;
        }
        Err(e) => {
            println!("Result: request failed: {}", e);
            return;
        }
    };

    let status = res.status();
    let body = match res.bytes().await {
        Ok(body) => body,
        Err(e) => {
            println!("Result: failed to read response: {}", e);
            return;
        }
    };
    println!("Response Status: {}", status);
    println!("Response Length: {} bytes", body.len());

    let preview: String = String::from_utf8_lossy(&body).chars().take(100).collect();
    if status.is_success() {
        if body.len() < 500 {
            println!("Result: success status but a short body, likely an error message");
            println!("   Content Preview: {}", preview.trim());
        } else {
            println!("Result: SUCCESS, license server returned a {} byte payload", body.len());
        }
    } else {
        println!("Result: FAILED, license server rejected the request");
        println!("   Error Hint: {}", preview.trim());
    }
}

fn print_headers(headers: &HeaderMap) {
    for (name, value) in headers {
        println!("{}: {}", name, value.to_str().unwrap_or("<binary>"));
    }
}
