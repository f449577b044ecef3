use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    portal_cli::main_entry().await
}
