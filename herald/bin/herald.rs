#[cfg(not(any(target_os = "macos", unix)))]
compile_error!("Only macos and unix are currently supported");

use herald::{Herald, HeraldConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = HeraldConfig::load()?;
    Herald::new(config).run().await
}
