use actix_web::{web, App, HttpServer};
use chat_relay_service::{
    config, error, logging,
    presence::PresenceStore,
    redis_client::RedisClient,
    routes,
    state::AppState,
    websocket::{pubsub, ConnectionRegistry},
};
use tokio::task::JoinHandle;

#[tokio::main]
async fn main() -> Result<(), error::AppError> {
    logging::init_tracing();
    let cfg = config::Config::from_env()?;

    let redis = RedisClient::connect(&cfg.redis_url)
        .await
        .map_err(|e| error::AppError::StartServer(format!("redis: {e}")))?;
    let registry = ConnectionRegistry::new();
    let presence = PresenceStore::new(redis.clone());

    // Cross-process fan-out: every published chat message comes back through
    // this subscription, the sender's own included. If the subscription dies,
    // chat delivery for this process dies with it; connections stay up.
    let listener_registry = registry.clone();
    let listener_url = cfg.redis_url.clone();
    let _bus_listener: JoinHandle<()> = tokio::spawn(async move {
        if let Err(e) = pubsub::start_pubsub_listener(&listener_url, listener_registry).await {
            tracing::error!(error = %e, "chat pubsub listener failed");
        }
    });

    let state = AppState {
        registry,
        redis,
        presence,
    };

    let bind_addr = format!("0.0.0.0:{}", cfg.port);
    tracing::info!(%bind_addr, "starting chat-relay-service");

    HttpServer::new(move || {
        let cors = actix_cors::Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .wrap(cors)
            .app_data(web::Data::new(state.clone()))
            .service(routes::wsroute::ws_handler)
            .route("/health", web::get().to(|| async { "OK" }))
    })
    .bind(&bind_addr)
    .map_err(|e| error::AppError::StartServer(format!("bind: {e}")))?
    .run()
    .await
    .map_err(|e| error::AppError::StartServer(format!("run server: {e}")))
}
