use std::env;
use std::fs;
use std::sync::Arc;
use std::time::Duration;

use solana_sdk::signature::read_keypair_file;

use lotkeeper::config::{seconds_until_daily_fire, KeeperConfig};
use lotkeeper::gateway::RpcGateway;
use lotkeeper::http::AdminServer;
use lotkeeper::monitor::HealthMonitor;
use lotkeeper::orchestrator::{unix_now, DrawOrchestrator};

#[tokio::main]
async fn main() {
    let mut config_path: Option<String> = None;
    let mut keypair_path: Option<String> = None;
    let mut listen_override: Option<String> = None;

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => config_path = args.next(),
            "--keypair" => keypair_path = args.next(),
            "--listen" => listen_override = args.next(),
            _ => {
                eprintln!("unknown arg {}", arg);
                return;
            }
        }
    }

    let config_path = config_path.expect("missing --config");
    let config_bytes = fs::read_to_string(&config_path).expect("read config");
    let config: KeeperConfig = serde_json::from_str(&config_bytes).expect("parse config json");

    let keypair_path = keypair_path.expect("missing --keypair");
    let authority = read_keypair_file(&keypair_path).expect("read authority keypair");

    let program_id = config.program_pubkey().expect("program_id");
    let oracle_queue = config.oracle_queue_pubkey().expect("oracle_queue");

    let gateway = Arc::new(RpcGateway::new(config.rpc_url.clone(), authority));
    let orchestrator = Arc::new(DrawOrchestrator::new(
        Arc::clone(&gateway),
        program_id,
        oracle_queue,
        config.poll_budget(),
    ));

    let listen_addr = listen_override.unwrap_or_else(|| config.http.listen_addr.clone());
    let server = Arc::new(AdminServer::new(
        Arc::clone(&orchestrator),
        Arc::clone(&gateway),
        config.http.draw_secret.clone(),
    ));
    tokio::spawn(async move {
        if let Err(err) = server.serve(listen_addr).await {
            eprintln!("http server stopped: {}", err);
        }
    });

    // One health sweep shortly after startup, then the regular cadence.
    let monitor = HealthMonitor::new(
        Arc::clone(&orchestrator),
        Arc::clone(&gateway),
        Duration::from_secs(config.schedule.health_interval_secs),
    );
    let startup_delay = config.schedule.startup_check_delay_secs;
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(startup_delay)).await;
        monitor.run().await;
    });

    let schedule = config.schedule.clone();
    loop {
        let wait = seconds_until_daily_fire(
            unix_now(),
            schedule.draw_hour,
            schedule.draw_minute,
            schedule.utc_offset_secs,
        );
        println!("next scheduled draw in {}s", wait);
        tokio::time::sleep(Duration::from_secs(wait)).await;
        orchestrator.run_scheduled().await;
    }
}
