use anyhow::Result;

use courtside::config::Config;

use super::build_coordinator;

/// Start the reservation API
pub async fn serve(config: Config) -> Result<()> {
    let coordinator = build_coordinator(&config)?;

    println!("Starting reservation API");
    println!("========================");
    println!("  Host: {}", config.server.host);
    println!("  Port: {}", config.server.port);
    println!("  Catalog: {}", config.booking.catalog_path.display());
    println!("  Trigger: {}", config.booking.trigger_time);
    println!();
    println!("Endpoints:");
    println!("  GET    /health         - Health check");
    println!("  POST   /runs           - Start a reservation run");
    println!("  GET    /jobs           - List live runs");
    println!("  DELETE /jobs/{{run_id}}  - Cancel a run");
    println!();

    courtside::server::serve(&config.server, coordinator).await
}
