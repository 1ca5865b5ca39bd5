use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use baun_admin::{AppState, config, users::CredentialStore};

#[tokio::main]
async fn main() {
  tracing_subscriber::registry()
    .with(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "baun_admin=debug,tower_http=debug".into()),
    )
    .with(tracing_subscriber::fmt::layer())
    .init();

  let config = config::load().expect("Failed to load configuration");
  let users = CredentialStore::load(&config.users_file).expect("Failed to load users file");

  if users.is_empty() {
    tracing::warn!(
      "No admin users configured, visit {}/admin/create-user to create one",
      config.base_url
    );
  }

  let bind_addr = config.bind_addr();
  let app = baun_admin::app(AppState::new(config, users));

  let listener = tokio::net::TcpListener::bind(&bind_addr)
    .await
    .unwrap_or_else(|_| panic!("Failed to bind to {}", bind_addr));

  tracing::info!("Admin running on http://{}/admin", bind_addr);

  axum::serve(listener, app)
    .await
    .expect("Server failed to start");
}
