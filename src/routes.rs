use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, StatusCode},
    middleware::from_fn,
    response::{IntoResponse, Json},
    routing::{delete, get, post},
    Router,
};
use serde_json::{json, Value};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::config;
use crate::database::entity::TenantEntity;
use crate::database::manager::DatabaseManager;
use crate::database::models::mapping::{BkMk, CplBk, CplCpmk, KurikulumCpl, KurikulumMk, MappingPair, PlCpl, PlMk};
use crate::database::models::{BahanKajian, Cpl, Cpmk, Kurikulum, MataKuliah, ProfilLulusan};
use crate::handlers::protected::{self, catalog, cpl_mk, mapping, program_studi, roles, users};
use crate::handlers::public;
use crate::middleware::{
    jwt_auth_middleware, require_admin, require_curriculum_staff, validate_tenant_middleware,
    validate_user_middleware,
};

pub fn app() -> Router {
    let cfg = config();

    let mut router = Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .route("/auth/login", post(public::login_post))
        // Protected API
        .merge(session_routes())
        .merge(curriculum_routes())
        .merge(role_routes())
        .merge(administration_routes())
        // Global middleware
        .layer(DefaultBodyLimit::max(cfg.api.max_request_size_bytes))
        .layer(cors_layer(&cfg.security.cors_origins));

    if cfg.api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }
    router
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Any authenticated, active user
fn session_routes() -> Router {
    Router::new()
        .route("/api/auth/whoami", get(protected::whoami_get))
        .route("/api/auth/refresh", post(protected::refresh_post))
        .route_layer(from_fn(validate_user_middleware))
        .route_layer(from_fn(jwt_auth_middleware))
}

/// Layers run bottom-up: token, role gate, stored user, tenant scope
fn curriculum_routes() -> Router {
    Router::new()
        .merge(entity_routes::<ProfilLulusan>("/api/profil-lulusan"))
        .merge(entity_routes::<Cpl>("/api/cpl"))
        .merge(entity_routes::<Cpmk>("/api/cpmk"))
        .merge(entity_routes::<MataKuliah>("/api/mata-kuliah"))
        .merge(entity_routes::<BahanKajian>("/api/bahan-kajian"))
        .merge(entity_routes::<Kurikulum>("/api/kurikulum"))
        .merge(mapping_routes::<PlCpl>())
        .merge(mapping_routes::<CplCpmk>())
        .merge(mapping_routes::<CplBk>())
        .merge(mapping_routes::<BkMk>())
        .merge(mapping_routes::<KurikulumCpl>())
        .merge(mapping_routes::<KurikulumMk>())
        .merge(mapping_routes::<PlMk>())
        .route(
            "/api/mapping/cpl-mk",
            get(cpl_mk::list).post(cpl_mk::create).put(cpl_mk::replace),
        )
        .route("/api/mapping/cpl-mk/:id", delete(cpl_mk::delete).put(cpl_mk::update))
        .route_layer(from_fn(validate_tenant_middleware))
        .route_layer(from_fn(validate_user_middleware))
        .route_layer(from_fn(require_curriculum_staff))
        .route_layer(from_fn(jwt_auth_middleware))
}

fn role_routes() -> Router {
    Router::new()
        .route("/api/roles", get(roles::list))
        .route_layer(from_fn(validate_user_middleware))
        .route_layer(from_fn(require_curriculum_staff))
        .route_layer(from_fn(jwt_auth_middleware))
}

fn administration_routes() -> Router {
    Router::new()
        .route("/api/program-studi", get(program_studi::list).post(program_studi::create))
        .route(
            "/api/program-studi/:id",
            get(program_studi::get).put(program_studi::update).delete(program_studi::delete),
        )
        .route("/api/users", get(users::list).post(users::create))
        .route("/api/users/:id", get(users::get).put(users::update).delete(users::delete))
        .route_layer(from_fn(validate_user_middleware))
        .route_layer(from_fn(require_admin))
        .route_layer(from_fn(jwt_auth_middleware))
}

fn entity_routes<T: TenantEntity>(base: &str) -> Router {
    Router::new()
        .route(base, get(catalog::list::<T>).post(catalog::create::<T>))
        .route(
            &format!("{}/:id", base),
            get(catalog::get::<T>).put(catalog::update::<T>).delete(catalog::delete::<T>),
        )
}

fn mapping_routes<P: MappingPair>() -> Router {
    let base = format!("/api/mapping/{}", P::TABLE.slug);
    Router::new()
        .route(
            &base,
            get(mapping::list::<P>).post(mapping::create::<P>).put(mapping::replace::<P>),
        )
        .route(&format!("{}/:id", base), delete(mapping::delete::<P>))
}

async fn root() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "OBE API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Outcome-Based Education curriculum management",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "public_auth": "/auth/login (public - token acquisition)",
                "auth": "/api/auth/whoami, /api/auth/refresh (any role)",
                "curriculum": "/api/{profil-lulusan,cpl,cpmk,mata-kuliah,bahan-kajian,kurikulum}[/:id] (admin, prodi)",
                "mapping": "/api/mapping/{pl-cpl,cpl-cpmk,cpl-bk,bk-mk,kurikulum-cpl,kurikulum-mk,pl-mk,cpl-mk}[/:id] (admin, prodi)",
                "roles": "/api/roles (admin, prodi)",
                "administration": "/api/program-studi[/:id], /api/users[/:id] (admin)",
            }
        }
    }))
}

async fn health() -> impl IntoResponse {
    let now = chrono::Utc::now();

    match DatabaseManager::health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "database unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now
                    }
                })),
            )
        }
    }
}
