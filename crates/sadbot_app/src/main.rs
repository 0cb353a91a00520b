mod platform;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| platform::DEFAULT_CONFIG_PATH.to_string());
    platform::run_app(&config_path).await
}
