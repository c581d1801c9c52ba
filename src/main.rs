use std::net::SocketAddr;
use astralis_trivia::cards::{Deck, DeckError};
use astralis_trivia::config::Config;
use astralis_trivia::coordinator::CoordinatorHandle;
use astralis_trivia::server::{self, Server};
use log::{error, info};
use warp::Filter;

async fn load_deck(config: &Config) -> Result<Deck, DeckError> {
    match &config.deck_path {
        Some(path) => {
            info!("Loading card deck from {}", path.display());
            Deck::load(path).await
        }
        None => Deck::builtin(),
    }
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    let deck = match load_deck(&config).await {
        Ok(deck) => deck,
        Err(e) => {
            error!("Failed to load card deck: {e}");
            std::process::exit(1);
        }
    };
    info!("Loaded {} cards", deck.len());

    let server = Server::new(CoordinatorHandle::spawn(deck, config.game));

    let routes = server::ws_route(server)
        .or(warp::fs::dir(config.static_dir.clone()))
        .with(warp::cors().allow_any_origin());

    let address = SocketAddr::new(config.bind_address, config.port);

    if config.tls_available() {
        info!("Starting secure server (HTTPS/WSS) on {address}");
        warp::serve(routes)
            .tls()
            .cert_path(&config.tls_cert_path)
            .key_path(&config.tls_key_path)
            .run(address)
            .await;
    } else {
        info!("No TLS certificate found, starting HTTP/WS server on {address}");
        warp::serve(routes).run(address).await;
    }
}
