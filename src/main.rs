use actix_web::{App, HttpServer, web};
use dotenvy::dotenv;
use log::{error, info};

use chain_attack_sim::api::{self, AppState};
use chain_attack_sim::blockchain::Ledger;
use chain_attack_sim::config::SimConfig;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let _ = dotenv();
    env_logger::init();

    let config = SimConfig::from_env().map_err(|e| {
        error!("{e}");
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;
    let simulator = config
        .simulator()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()))?;

    info!(
        "ledger difficulty={} reward={} {} hash_power={}",
        config.ledger.difficulty,
        config.ledger.reward_amount,
        config.ledger.reward_currency,
        simulator.hash_power()
    );
    println!(
        "⛓️ Starting attack simulator API at http://{}:{}",
        config.host, config.port
    );

    let state = web::Data::new(AppState::new(Ledger::new(config.ledger.clone()), simulator));

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(api::init_routes)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
