#[tokio::main]
async fn main() {
    if let Err(e) = world_server::run_with_config().await {
        tracing::error!(error = %e, "world server stopped");
        std::process::exit(1);
    }
}
