//! `gongbu serve` — Start the HTTP API.

pub async fn run(port: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = super::load_config()?;
    if let Some(port) = port {
        config.gateway.port = port;
    }

    println!("🌐 Gongbu API");
    println!("   Listening on http://{}:{}", config.gateway.host, config.gateway.port);
    println!("   Health:  GET  /health");
    println!("   Guides:  POST /v1/guides");
    println!("   Chat:    POST /v1/chat/sessions");
    println!("   Press Ctrl+C to stop.\n");

    gongbu_gateway::start(config).await
}
