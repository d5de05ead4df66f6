mod ai;
mod auth;
mod config;
mod coupons;
mod db;
mod error;
mod extract;
mod identifiers;
mod insights;
mod notifications;
mod policies;
mod restaurants;
mod reviews;
mod seed;
mod validation;

use std::sync::Arc;

use axum::{
    extract::FromRef,
    routing::{get, post, put},
    Router,
};
use sqlx::PgPool;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::EnvFilter;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use ai::{GeminiClient, TextGenerator};
use auth::{IdentityResolver, TokenService, UserRepository};
use config::AppConfig;
use coupons::{CouponRepository, CouponService};
use insights::{InsightRepository, InsightService};
use notifications::{HttpMailer, JobRepository, NotificationWorker};
use policies::{PolicyRepository, PolicyService};
use restaurants::{RestaurantRepository, RestaurantService};
use reviews::{ReviewRepository, ReviewService};

/// Clock shared by every service; tests swap in a fixed one
pub type SharedClock = Arc<dyn mockable::Clock + Send + Sync>;

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        auth::handlers::get_me,
        auth::handlers::update_me,
        restaurants::handlers::get_public_restaurant,
        restaurants::handlers::list_restaurants,
        restaurants::handlers::create_restaurant,
        restaurants::handlers::get_restaurant,
        restaurants::handlers::update_restaurant,
        policies::handlers::list_policies,
        policies::handlers::set_policy,
        reviews::handlers::submit_review,
        reviews::handlers::list_reviews,
        reviews::handlers::list_review_page,
        coupons::handlers::redeem_public,
        coupons::handlers::verify_coupon,
        coupons::handlers::redeem_as_owner,
        insights::handlers::generate_insight,
        insights::handlers::get_insight,
    ),
    components(schemas(
        auth::User,
        auth::UpdateProfileRequest,
        restaurants::Restaurant,
        restaurants::EmailTone,
        restaurants::CreateRestaurantRequest,
        restaurants::UpdateRestaurantRequest,
        restaurants::PublicRestaurantView,
        policies::SentimentType,
        policies::CouponPolicy,
        policies::SetPolicyRequest,
        policies::SetPolicyResponse,
        reviews::LikedCategory,
        reviews::Review,
        reviews::SubmitReviewRequest,
        reviews::SubmitReviewResponse,
        reviews::ReviewPage,
        coupons::RedeemRequest,
        coupons::RedemptionStatus,
        coupons::RedemptionResult,
        coupons::VerificationStatus,
        coupons::VerificationResult,
        coupons::OwnerRedemption,
        insights::TimeRange,
        insights::Insight,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "identity", description = "Authenticated owner profile"),
        (name = "public", description = "Unauthenticated review-page lookups"),
        (name = "restaurants", description = "Restaurant registry"),
        (name = "coupon-policies", description = "Per-sentiment coupon offers"),
        (name = "reviews", description = "Review intake and listing"),
        (name = "coupons", description = "Coupon verification and redemption"),
        (name = "insights", description = "Generated feedback analysis")
    ),
    info(
        title = "Restostar API",
        version = "0.1.0",
        description = "Review collection, coupon issuance and redemption for restaurants"
    )
)]
struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub token_service: Arc<TokenService>,
    pub identity_resolver: IdentityResolver,
    pub restaurant_service: RestaurantService,
    pub policy_service: PolicyService,
    pub review_service: ReviewService,
    pub coupon_service: CouponService,
    pub insight_service: InsightService,
}

impl FromRef<AppState> for Arc<TokenService> {
    fn from_ref(state: &AppState) -> Self {
        state.token_service.clone()
    }
}

/// Wire repositories and services over one pool
fn build_state(
    db: PgPool,
    config: &AppConfig,
    generator: Arc<dyn TextGenerator>,
    clock: SharedClock,
) -> AppState {
    let restaurant_service =
        RestaurantService::new(RestaurantRepository::new(db.clone()), clock.clone());
    let policy_service = PolicyService::new(
        PolicyRepository::new(db.clone()),
        restaurant_service.clone(),
        clock.clone(),
    );
    let review_service = ReviewService::new(
        db.clone(),
        ReviewRepository::new(db.clone()),
        restaurant_service.clone(),
        policy_service.clone(),
        CouponRepository::new(db.clone()),
        JobRepository::new(db.clone()),
        clock.clone(),
    );
    let insight_service = InsightService::new(
        InsightRepository::new(db.clone()),
        ReviewRepository::new(db.clone()),
        restaurant_service.clone(),
        generator,
        clock.clone(),
    );

    AppState {
        token_service: Arc::new(TokenService::new(&config.auth_jwt_secret)),
        identity_resolver: IdentityResolver::new(UserRepository::new(db.clone()), clock.clone()),
        coupon_service: CouponService::new(CouponRepository::new(db.clone()), clock),
        restaurant_service,
        policy_service,
        review_service,
        insight_service,
        db,
    }
}

/// Creates and configures the application router
fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Public routes
        .route(
            "/api/public/restaurants/:public_id/:slug",
            get(restaurants::handlers::get_public_restaurant),
        )
        .route("/api/public/reviews", post(reviews::handlers::submit_review))
        .route("/api/public/coupons/redeem", post(coupons::handlers::redeem_public))
        // Owner routes
        .route(
            "/api/me",
            get(auth::handlers::get_me).put(auth::handlers::update_me),
        )
        .route(
            "/api/restaurants",
            get(restaurants::handlers::list_restaurants).post(restaurants::handlers::create_restaurant),
        )
        .route(
            "/api/restaurants/:id",
            get(restaurants::handlers::get_restaurant).patch(restaurants::handlers::update_restaurant),
        )
        .route(
            "/api/restaurants/:id/coupon-policies",
            get(policies::handlers::list_policies),
        )
        .route(
            "/api/restaurants/:id/coupon-policies/:sentiment",
            put(policies::handlers::set_policy),
        )
        .route("/api/restaurants/:id/reviews", get(reviews::handlers::list_reviews))
        .route(
            "/api/restaurants/:id/reviews/page",
            get(reviews::handlers::list_review_page),
        )
        .route(
            "/api/restaurants/:id/insights/:time_range",
            get(insights::handlers::get_insight).post(insights::handlers::generate_insight),
        )
        .route("/api/coupons/verify", get(coupons::handlers::verify_coupon))
        .route("/api/coupons/redeem", post(coupons::handlers::redeem_as_owner))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("restostar_api=info,tower_http=info")),
        )
        .with_target(false)
        .init();

    tracing::info!("Restostar API - Starting...");

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Connecting to database...");
    let db_pool = db::create_pool(&config.database_url)
        .await
        .expect("Failed to create database pool");
    db::run_migrations(&db_pool)
        .await
        .expect("Failed to run database migrations");

    let clock: SharedClock = Arc::new(mockable::DefaultClock);

    if config.seed_demo {
        seed::seed_demo(&db_pool, clock.utc())
            .await
            .expect("Failed to seed demo data");
    }

    let generator: Arc<dyn TextGenerator> =
        Arc::new(GeminiClient::new(&config.ai).expect("Failed to build text generation client"));
    let mailer = HttpMailer::new(config.mail.clone()).expect("Failed to build mail client");

    let worker = NotificationWorker::new(
        JobRepository::new(db_pool.clone()),
        CouponRepository::new(db_pool.clone()),
        Arc::new(mailer),
        generator.clone(),
        clock.clone(),
        config.notify.clone(),
    );
    tokio::spawn(worker.run());

    let app = create_router(build_state(db_pool, &config, generator, clock));

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Restostar API is running on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui", addr);

    axum::serve(listener, app).await.expect("Server error");
}

#[cfg(test)]
mod test_support;

#[cfg(test)]
mod tests;
