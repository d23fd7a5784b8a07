use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use obe_api::auth::{generate_jwt, Claims, Role, RoleSet};
use obe_api::routes::app;

fn token(roles: &[Role], program_studi_id: Option<Uuid>) -> String {
    let roles: RoleSet = roles.iter().copied().collect();
    let claims = Claims::new(Uuid::new_v4(), "someone@example.ac.id".into(), roles, program_studi_id);
    generate_jwt(&claims).unwrap()
}

async fn send(method: Method, uri: &str, bearer: Option<&str>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let response = app().oneshot(request.body(Body::empty()).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn missing_token_is_unauthorized_without_detail() {
    for uri in ["/api/cpl", "/api/mapping/pl-cpl", "/api/users", "/api/auth/whoami"] {
        let (status, body) = send(Method::GET, uri, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", uri);
        assert_eq!(body, json!({ "success": false, "error": "Unauthorized" }));
    }
}

#[tokio::test]
async fn garbage_and_expired_tokens_are_unauthorized() {
    let (status, _) = send(Method::GET, "/api/cpl", Some("not-a-jwt")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let mut claims = Claims::new(
        Uuid::new_v4(),
        "old@example.ac.id".into(),
        [Role::Admin].into_iter().collect(),
        None,
    );
    claims.exp = chrono::Utc::now().timestamp() - 3600;
    let expired = generate_jwt(&claims).unwrap();

    let (status, body) = send(Method::GET, "/api/cpl", Some(&expired)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "success": false, "error": "Unauthorized" }));
}

#[tokio::test]
async fn lecturers_and_students_cannot_reach_curriculum() {
    for role in [Role::Dosen, Role::Student] {
        let bearer = token(&[role], None);
        for (method, uri) in [
            (Method::GET, "/api/profil-lulusan"),
            (Method::POST, "/api/cpl"),
            (Method::PUT, "/api/mapping/cpl-cpmk"),
            (Method::DELETE, "/api/mapping/cpl-mk/00000000-0000-0000-0000-000000000000"),
            (Method::GET, "/api/roles"),
        ] {
            let (status, body) = send(method, uri, Some(&bearer)).await;
            assert_eq!(status, StatusCode::FORBIDDEN, "{:?} {}", role, uri);
            assert_eq!(body, json!({ "success": false, "error": "Forbidden" }));
        }
    }
}

#[tokio::test]
async fn only_admins_manage_program_studi_and_users() {
    let prodi = token(&[Role::Prodi], Some(Uuid::new_v4()));
    for uri in ["/api/program-studi", "/api/users"] {
        let (status, body) = send(Method::GET, uri, Some(&prodi)).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{}", uri);
        assert_eq!(body, json!({ "success": false, "error": "Forbidden" }));
    }
}
