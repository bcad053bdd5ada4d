#[tokio::main]
async fn main() -> anyhow::Result<()> {
    gitbridge::cli::run().await
}
