// src/bin/service_probe.rs
use std::time::Duration;

#[tokio::main]
async fn main() {
    let base_url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "http://localhost:5000".to_string());
    let base_url = base_url.trim_end_matches('/');

    println!("Testing control service at {}...\n", base_url);

    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(2))
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            println!("✗ Failed to build HTTP client: {}", e);
            return;
        }
    };

    match client.get(format!("{}/", base_url)).send().await {
        Ok(response) if response.status().is_success() => {
            println!("✓ Service answered {}", response.status());
            match response.text().await {
                Ok(body) => println!("✓ Greeting: {}", body.trim()),
                Err(e) => println!("✗ Failed to read greeting: {}", e),
            }
        }
        Ok(response) => println!("✗ Service answered {}", response.status()),
        Err(e) => {
            println!("✗ Failed to reach service: {}", e);
            println!("\nPossible causes:");
            println!("1. Control service is not running");
            println!("2. Wrong host or port");
            println!("3. A firewall is blocking the connection");
        }
    }
}
