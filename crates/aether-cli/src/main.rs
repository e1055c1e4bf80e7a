//! Primary entrypoint for the `aether` CLI binary.

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    aether_cli::run().await
}
