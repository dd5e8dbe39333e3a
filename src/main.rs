use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "portfoliobuilder=debug,tower_http=debug,axum=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let port = std::env::var("SERVER_PORT")
        .unwrap_or("8080".to_string())
        .parse::<u16>()
        .expect("SERVER_PORT must be a valid port number");

    let app = portfoliobuilder::create_app();

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .expect("failed to bind server port");

    tracing::info!("listening on port {}", port);

    axum::serve(listener, app)
        .await
        .expect("server exited with an error");
}
