use axum::Router;
use axum::routing::{get, post};
use sqlx::PgPool;
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod auth;
mod config;
mod error;
mod handlers;
mod services;

use config::AppConfig;
use crm_db::repositories::org_repo::OrganizationRepository;
use crm_db::repositories::user_repo::UserRepository;
use services::activity_service::ActivityService;
use services::analytics_service::AnalyticsService;
use services::auth_service::AuthService;
use services::contact_service::ContactService;
use services::deal_service::DealService;
use services::permission::PermissionService;
use services::task_service::TaskService;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub pool: PgPool,
    pub users: UserRepository,
    pub orgs: OrganizationRepository,
    pub permissions: PermissionService,
    pub auth: AuthService,
    pub contacts: ContactService,
    pub deals: DealService,
    pub tasks: TaskService,
    pub activities: ActivityService,
    pub analytics: AnalyticsService,
}

impl AppState {
    fn new(config: AppConfig, pool: PgPool) -> Self {
        Self {
            users: UserRepository::new(pool.clone()),
            orgs: OrganizationRepository::new(pool.clone()),
            permissions: PermissionService::new(pool.clone()),
            auth: AuthService::new(pool.clone(), config.clone()),
            contacts: ContactService::new(pool.clone()),
            deals: DealService::new(pool.clone()),
            tasks: TaskService::new(pool.clone()),
            activities: ActivityService::new(pool.clone()),
            analytics: AnalyticsService::new(pool.clone()),
            config,
            pool,
        }
    }
}

fn api_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/api/v1/auth/register", post(handlers::auth::register))
        .route("/api/v1/auth/login", post(handlers::auth::login))
        .route("/api/v1/auth/refresh", post(handlers::auth::refresh))
        .route(
            "/api/v1/organizations/me",
            get(handlers::organizations::my_organizations),
        )
        .route(
            "/api/v1/contacts",
            get(handlers::contacts::list_contacts).post(handlers::contacts::create_contact),
        )
        .route(
            "/api/v1/contacts/{contact_id}",
            axum::routing::delete(handlers::contacts::delete_contact),
        )
        .route(
            "/api/v1/deals",
            get(handlers::deals::list_deals).post(handlers::deals::create_deal),
        )
        .route(
            "/api/v1/deals/{deal_id}",
            get(handlers::deals::get_deal)
                .patch(handlers::deals::patch_deal)
                .delete(handlers::deals::delete_deal),
        )
        .route(
            "/api/v1/deals/{deal_id}/activities",
            get(handlers::activities::list_activities)
                .post(handlers::activities::create_activity),
        )
        .route(
            "/api/v1/tasks",
            get(handlers::tasks::list_tasks).post(handlers::tasks::create_task),
        )
        .route(
            "/api/v1/analytics/deals/summary",
            get(handlers::analytics::deals_summary),
        )
        .route(
            "/api/v1/analytics/deals/funnel",
            get(handlers::analytics::deals_funnel),
        )
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "crm_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();
    let config = AppConfig::load()?;
    tracing::info!("CRM server starting...");

    let pool = crm_db::connect(&config.database_url).await?;
    let listen_port = config.listen_port;
    let state = AppState::new(config, pool);
    let app = api_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], listen_port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
