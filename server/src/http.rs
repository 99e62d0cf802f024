use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
};

use anyhow::Context;
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::{self, HeaderName, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use platform_db::DbPool;
use products_hr::{Employee, EmployeePatch, HrError, OrgChart, Rejection, RepositoryError};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{error, info};

use crate::{config::AppConfig, graphql::SchemaType};

#[derive(Clone)]
pub struct AppState {
    pub chart: Arc<OrgChart>,
    pub schema: SchemaType,
    pub config: Arc<AppConfig>,
    /// Present when the roster lives in a database.
    pub pool: Option<DbPool>,
}

#[derive(Clone, Debug)]
pub struct ServeConfig {
    addr: SocketAddr,
}

impl ServeConfig {
    pub fn new(host: IpAddr, port: u16) -> Self {
        Self {
            addr: SocketAddr::from((host, port)),
        }
    }
}

pub async fn serve(config: ServeConfig, state: AppState) -> anyhow::Result<()> {
    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;

    info!(%config.addr, "org chart server listening");
    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;
    Ok(())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed = origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect::<Vec<_>>();
    let layer = CorsLayer::new()
        .allow_headers([http::header::CONTENT_TYPE])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE]);
    if allowed.is_empty() {
        layer.allow_origin(AllowOrigin::any())
    } else {
        layer
            .allow_credentials(true)
            .allow_origin(AllowOrigin::list(allowed))
    }
}

pub fn build_router(state: AppState) -> Router {
    let request_id = MakeRequestUuid;
    let header_name = HeaderName::from_static("x-request-id");
    Router::new()
        .route("/health", get(health_handler))
        .route("/graphql", post(graphql_handler))
        .route("/api/employees", get(list_employees).post(create_employee))
        .route(
            "/api/employees/{id}",
            put(update_employee).delete(delete_employee),
        )
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(header_name.clone(), request_id))
                .layer(PropagateRequestIdLayer::new(header_name))
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&state.config.cors_allowed_origins)),
        )
        .with_state(state)
}

async fn graphql_handler(
    State(state): State<AppState>,
    request: GraphQLRequest,
) -> GraphQLResponse {
    state.schema.execute(request.into_inner()).await.into()
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let db_ok = match &state.pool {
        Some(pool) => platform_db::ping(pool).await,
        None => true,
    };
    let roster_ok = state.chart.view(|directory| directory.error().is_none()).await;
    Json(HealthResponse {
        ok: db_ok && roster_ok,
        db_ok,
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    db_ok: bool,
    version: &'static str,
}

#[derive(Serialize)]
struct EmployeeList {
    employees: Vec<Employee>,
}

async fn list_employees(State(state): State<AppState>) -> Json<EmployeeList> {
    let employees = state.chart.view(|directory| directory.employees().to_vec()).await;
    Json(EmployeeList { employees })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateEmployeeBody {
    #[serde(default)]
    id: String,
    name: String,
    #[serde(default)]
    designation: String,
    #[serde(default)]
    team: String,
    #[serde(default)]
    manager_id: Option<String>,
    #[serde(default)]
    avatar: Option<String>,
}

impl From<CreateEmployeeBody> for Employee {
    fn from(value: CreateEmployeeBody) -> Self {
        let mut employee = Employee::new(
            value.id,
            value.name,
            value.designation,
            value.team,
            value.manager_id,
        );
        employee.avatar = value.avatar;
        employee
    }
}

async fn create_employee(
    State(state): State<AppState>,
    Json(body): Json<CreateEmployeeBody>,
) -> HttpResult<(StatusCode, Json<Employee>)> {
    if body.name.trim().is_empty() {
        return Err(HttpError::new(StatusCode::BAD_REQUEST, "name must not be blank"));
    }
    let created = state.chart.create_employee(body.into()).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_employee(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<EmployeePatch>,
) -> HttpResult<Json<Employee>> {
    let updated = state.chart.update_details(&id, patch).await?;
    Ok(Json(updated))
}

async fn delete_employee(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> HttpResult<StatusCode> {
    state.chart.remove_node(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

type HttpResult<T> = Result<T, HttpError>;

#[derive(Debug)]
struct HttpError {
    status: StatusCode,
    message: String,
}

impl HttpError {
    fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }
}

// Persistence failures were already logged by the org chart.
impl From<HrError> for HttpError {
    fn from(value: HrError) -> Self {
        match value {
            HrError::Rejected(Rejection::UnknownEmployee(_))
            | HrError::Repository(RepositoryError::NotFound(_)) => {
                Self::new(StatusCode::NOT_FOUND, "Employee not found")
            }
            HrError::Rejected(rejection) => {
                let status = match rejection {
                    Rejection::DuplicateId(_) => StatusCode::CONFLICT,
                    _ => StatusCode::UNPROCESSABLE_ENTITY,
                };
                Self::new(status, rejection.to_string())
            }
            HrError::Repository(err @ RepositoryError::Duplicate(_)) => {
                Self::new(StatusCode::CONFLICT, err.to_string())
            }
            HrError::Repository(_) => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to install CTRL+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    ctrl_c.await;

    #[cfg(unix)]
    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{graphql::build_schema, seed::demo_roster};
    use axum::body::Body;
    use http_body_util::BodyExt;
    use products_hr::InMemoryRepository;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    async fn app() -> Router {
        let repo = Arc::new(InMemoryRepository::with_records(demo_roster()));
        let chart = Arc::new(OrgChart::open(repo).await);
        build_router(AppState {
            schema: build_schema(chart.clone()),
            chart,
            config: Arc::new(AppConfig::in_memory()),
            pool: None,
        })
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = http::Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                request = request.header(http::header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let response = app
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn lists_the_roster_under_employees_key() {
        let app = app().await;
        let (status, body) = send(&app, Method::GET, "/api/employees", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["employees"].as_array().unwrap().len(), 10);
        assert_eq!(body["employees"][1]["managerId"], json!("emp-1"));
    }

    #[tokio::test]
    async fn create_update_delete_round_trip() {
        let app = app().await;
        let (status, created) = send(
            &app,
            Method::POST,
            "/api/employees",
            Some(json!({
                "name": "Tom",
                "designation": "Employee",
                "team": "General",
                "managerId": "emp-3"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = created["id"].as_str().unwrap().to_string();
        assert!(id.starts_with("emp-"));

        let (status, updated) = send(
            &app,
            Method::PUT,
            &format!("/api/employees/{id}"),
            Some(json!({"managerId": "emp-2"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["managerId"], json!("emp-2"));

        let uri = format!("/api/employees/{id}");
        let (status, _) = send(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, body) = send(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"error": "Employee not found"}));
    }

    #[tokio::test]
    async fn missing_employee_update_is_not_found() {
        let app = app().await;
        let (status, _) = send(
            &app,
            Method::PUT,
            "/api/employees/emp-404",
            Some(json!({"name": "Nobody"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn cyclic_update_is_unprocessable() {
        let app = app().await;
        let (status, body) = send(
            &app,
            Method::PUT,
            "/api/employees/emp-2",
            Some(json!({"managerId": "emp-5"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].as_str().unwrap().contains("cycle"));
    }

    #[tokio::test]
    async fn unknown_manager_is_unprocessable_not_missing() {
        let app = app().await;
        let (status, body) = send(
            &app,
            Method::PUT,
            "/api/employees/emp-5",
            Some(json!({"managerId": "emp-404"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body, json!({"error": "manager emp-404 not found"}));
    }

    #[tokio::test]
    async fn blank_name_is_a_bad_request() {
        let app = app().await;
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/employees",
            Some(json!({"name": " ", "managerId": "emp-1"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "name must not be blank"}));
        let (_, list) = send(&app, Method::GET, "/api/employees", None).await;
        assert_eq!(list["employees"].as_array().unwrap().len(), 10);
    }

    #[tokio::test]
    async fn health_reports_ok_for_memory_storage() {
        let app = app().await;
        let (status, body) = send(&app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], json!(true));
    }
}
