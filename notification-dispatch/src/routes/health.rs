//! Dockerflow-style health endpoints, following the platform convention the
//! teacher's deployment tooling expects regardless of what the service does.
use actix_web::HttpResponse;
use serde_json::json;

pub async fn health_route() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

pub async fn status_route() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

pub async fn lb_heartbeat_route() -> HttpResponse {
    HttpResponse::Ok().finish()
}

pub async fn version_route() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
