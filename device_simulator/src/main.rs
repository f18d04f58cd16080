use device_simulator::api::rest::{create_api_routes, SharedAppState};
use device_simulator::config::settings::Settings;
use device_simulator::device::engine::DeviceSimulator;
use device_simulator::logging::init_logging;
use device_simulator::server::opcua::{build_server, run_device_loop, serve};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::time::Instant;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let start_time = Instant::now();

    // --- Load Configuration ---
    let config_path = std::env::var("SIMULATOR_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("simulator.toml"));
    let settings = Settings::load(&config_path)?;
    init_logging(&settings.log_level, None);
    info!("Simulated OPC UA Server starting...");

    // --- Build OPC UA Server ---
    let (server, context) = build_server(&settings)?;
    println!("Dummy OPC UA namespace index: {}", context.namespace_index);

    let mut simulator = DeviceSimulator::new(
        context.store(),
        settings.simulation.temperature,
        settings.simulation.pressure,
        settings.simulation.tick_interval(),
    );

    // --- Start Serving ---
    info!("Starting OPC UA server on {}", context.endpoint);
    let server_task = serve(server);

    // --- Start API Server ---
    if settings.api.enabled {
        let app_state = SharedAppState {
            store: context.store(),
            namespace_index: context.namespace_index,
            endpoint_url: settings.server.endpoint_url.clone(),
            tick_count: simulator.tick_counter(),
            start_time,
        };
        let app = create_api_routes().with_state(app_state);
        let addr: SocketAddr = settings.api.bind_address.parse()?;
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("API server listening on {}", addr);
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                error!("API server failed: {}", e);
            }
        });
    }

    // --- Device Loop ---
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Unable to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received.");
    };
    run_device_loop(&context, server_task, &mut simulator, shutdown).await?;
    Ok(())
}
