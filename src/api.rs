pub mod error;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, FromRequestParts, Path, Query, State},
    http::{header, request::Parts, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use utoipa::{IntoParams, OpenApi, ToSchema};

use crate::auth::{Role, Session};
use crate::db::{VehicleDetails, VehicleInput, VehicleRecord};
use crate::importers::{SheetBatch, SheetRow, XLSX_CONTENT_TYPE};
use crate::services::{AuthService, LocalityService, SyncReport, VehicleService};

pub use error::{ApiError, ErrorBody};

#[derive(Clone)]
pub struct AppState {
    pub vehicle_service: VehicleService,
    pub auth_service: AuthService,
    pub locality_service: LocalityService,
    pub max_upload_bytes: usize,
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub login: String,
    pub password: String,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    /// Case-insensitive substring of the frame number or client
    pub q: Option<String>,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CitiesQuery {
    pub province: Option<String>,
}

/// Session attached to the request by its bearer token
pub struct CurrentSession(pub Session);

impl CurrentSession {
    pub fn role(&self) -> Role {
        self.0.role
    }
}

impl FromRequestParts<AppState> for CurrentSession {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(ApiError::Unauthorized("Missing bearer token"))?;

        let session = state
            .auth_service
            .resolve(token)
            .await
            .ok_or(ApiError::Unauthorized("Session expired or unknown"))?;

        Ok(CurrentSession(session))
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        login,
        logout,
        list_vehicles,
        create_vehicle,
        export_vehicles,
        get_vehicle,
        update_vehicle,
        delete_vehicle,
        export_vehicle,
        preview_import,
        import_sheet,
        import_template,
        list_provinces,
        list_cities,
    ),
    components(schemas(
        HealthResponse,
        LoginRequest,
        Session,
        Role,
        VehicleRecord,
        VehicleDetails,
        VehicleInput,
        SheetBatch,
        SheetRow,
        SyncReport,
        ErrorBody,
    )),
    modifiers(&BearerAuth),
    tags((name = "moto-inventory", description = "Motorcycle inventory API"))
)]
pub struct ApiDoc;

struct BearerAuth;

impl utoipa::Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};

        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

pub fn generate_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

pub fn create_router(state: AppState) -> Router {
    let upload_limit = DefaultBodyLimit::max(state.max_upload_bytes);

    let api_routes = Router::new()
        .route("/health", get(health))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/vehicles", get(list_vehicles).post(create_vehicle))
        .route("/vehicles/export", get(export_vehicles))
        .route(
            "/vehicles/{frame_number}",
            get(get_vehicle).put(update_vehicle).delete(delete_vehicle),
        )
        .route("/vehicles/{frame_number}/export", get(export_vehicle))
        .route("/imports/preview", post(preview_import))
        .route("/imports", post(import_sheet))
        .route("/imports/template", get(import_template))
        .route("/provinces", get(list_provinces))
        .route("/cities", get(list_cities))
        .layer(upload_limit)
        .with_state(state);

    Router::new().nest("/api/v1", api_routes)
}

fn xlsx_response(filename: &str, bytes: Vec<u8>) -> Response {
    let safe: String = filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{safe}\""))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    (
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(XLSX_CONTENT_TYPE)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response()
}

#[utoipa::path(
    get,
    path = "/api/v1/health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
#[instrument(skip(_state))]
async fn health(State(_state): State<AppState>) -> impl IntoResponse {
    debug!("Health check requested");
    let response = HealthResponse {
        status: "healthy".to_string(),
    };
    (StatusCode::OK, Json(response))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session opened", body = Session),
        (status = 401, description = "Invalid credentials", body = ErrorBody)
    )
)]
#[instrument(skip(state, request), fields(login = %request.login))]
async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<Session>, ApiError> {
    let session = state
        .auth_service
        .login(&request.login, &request.password)
        .await?;
    Ok(Json(session))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    responses(
        (status = 204, description = "Session closed"),
        (status = 401, description = "No valid session", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
#[instrument(skip(state, session), fields(login = %session.0.login))]
async fn logout(State(state): State<AppState>, session: CurrentSession) -> StatusCode {
    state.auth_service.logout(&session.0.token).await;
    info!("Logged out");
    StatusCode::NO_CONTENT
}

#[utoipa::path(
    get,
    path = "/api/v1/vehicles",
    params(ListQuery),
    responses(
        (status = 200, description = "Vehicles ordered by frame number", body = [VehicleRecord]),
        (status = 401, description = "No valid session", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
#[instrument(skip(state, _session, query), fields(q = ?query.q))]
async fn list_vehicles(
    State(state): State<AppState>,
    _session: CurrentSession,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<VehicleRecord>>, ApiError> {
    let records = state
        .vehicle_service
        .list_records(query.q.as_deref())
        .await?;
    info!("Retrieved {} vehicles", records.len());
    Ok(Json(records))
}

#[utoipa::path(
    post,
    path = "/api/v1/vehicles",
    request_body = VehicleInput,
    responses(
        (status = 201, description = "Vehicle created", body = VehicleRecord),
        (status = 403, description = "Read-only role", body = ErrorBody),
        (status = 409, description = "Frame number already exists", body = ErrorBody),
        (status = 422, description = "Invalid field", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
#[instrument(skip(state, session, input), fields(login = %session.0.login))]
async fn create_vehicle(
    State(state): State<AppState>,
    session: CurrentSession,
    Json(input): Json<VehicleInput>,
) -> Result<(StatusCode, Json<VehicleRecord>), ApiError> {
    let record = state
        .vehicle_service
        .create_record(session.role(), input)
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

#[utoipa::path(
    get,
    path = "/api/v1/vehicles/export",
    responses(
        (status = 200, description = "Inventory spreadsheet"),
        (status = 401, description = "No valid session", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
#[instrument(skip(state, session), fields(login = %session.0.login))]
async fn export_vehicles(
    State(state): State<AppState>,
    session: CurrentSession,
) -> Result<Response, ApiError> {
    let bytes = state.vehicle_service.export_all().await?;
    info!("Exported inventory ({} bytes)", bytes.len());
    Ok(xlsx_response("motorcycles.xlsx", bytes))
}

#[utoipa::path(
    get,
    path = "/api/v1/vehicles/{frame_number}",
    params(("frame_number" = String, Path, description = "Chassis number")),
    responses(
        (status = 200, description = "Vehicle found", body = VehicleRecord),
        (status = 404, description = "Vehicle not found", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
#[instrument(skip(state, _session))]
async fn get_vehicle(
    State(state): State<AppState>,
    _session: CurrentSession,
    Path(frame_number): Path<String>,
) -> Result<Json<VehicleRecord>, ApiError> {
    let record = state.vehicle_service.get_record(&frame_number).await?;
    Ok(Json(record))
}

#[utoipa::path(
    put,
    path = "/api/v1/vehicles/{frame_number}",
    params(("frame_number" = String, Path, description = "Chassis number")),
    request_body = VehicleInput,
    responses(
        (status = 200, description = "Vehicle updated", body = VehicleRecord),
        (status = 403, description = "Read-only role", body = ErrorBody),
        (status = 404, description = "Vehicle not found", body = ErrorBody),
        (status = 422, description = "Invalid field", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
#[instrument(skip(state, session, input), fields(login = %session.0.login))]
async fn update_vehicle(
    State(state): State<AppState>,
    session: CurrentSession,
    Path(frame_number): Path<String>,
    Json(input): Json<VehicleInput>,
) -> Result<Json<VehicleRecord>, ApiError> {
    let record = state
        .vehicle_service
        .update_record(session.role(), &frame_number, input)
        .await?;
    info!("Updated vehicle {}", frame_number);
    Ok(Json(record))
}

#[utoipa::path(
    delete,
    path = "/api/v1/vehicles/{frame_number}",
    params(("frame_number" = String, Path, description = "Chassis number")),
    responses(
        (status = 204, description = "Vehicle deleted"),
        (status = 403, description = "Read-only role", body = ErrorBody),
        (status = 404, description = "Vehicle not found", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
#[instrument(skip(state, session), fields(login = %session.0.login))]
async fn delete_vehicle(
    State(state): State<AppState>,
    session: CurrentSession,
    Path(frame_number): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .vehicle_service
        .delete_record(session.role(), &frame_number)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/v1/vehicles/{frame_number}/export",
    params(("frame_number" = String, Path, description = "Chassis number")),
    responses(
        (status = 200, description = "Single-vehicle spreadsheet"),
        (status = 404, description = "Vehicle not found", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
#[instrument(skip(state, _session))]
async fn export_vehicle(
    State(state): State<AppState>,
    _session: CurrentSession,
    Path(frame_number): Path<String>,
) -> Result<Response, ApiError> {
    let bytes = state.vehicle_service.export_record(&frame_number).await?;
    Ok(xlsx_response(&format!("{frame_number}.xlsx"), bytes))
}

#[utoipa::path(
    post,
    path = "/api/v1/imports/preview",
    request_body(content = Vec<u8>, content_type = "application/octet-stream", description = "Delivery sheet"),
    responses(
        (status = 200, description = "Extracted batch, nothing stored", body = SheetBatch),
        (status = 400, description = "Unreadable spreadsheet", body = ErrorBody),
        (status = 403, description = "Read-only role", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
#[instrument(skip(state, session, body), fields(login = %session.0.login, size = body.len()))]
async fn preview_import(
    State(state): State<AppState>,
    session: CurrentSession,
    body: Bytes,
) -> Result<Json<SheetBatch>, ApiError> {
    let batch = state
        .vehicle_service
        .preview_import(session.role(), body.to_vec())
        .await?;
    Ok(Json(batch))
}

#[utoipa::path(
    post,
    path = "/api/v1/imports",
    request_body(content = Vec<u8>, content_type = "application/octet-stream", description = "Delivery sheet"),
    responses(
        (status = 200, description = "Batch stored", body = SyncReport),
        (status = 400, description = "Unreadable spreadsheet", body = ErrorBody),
        (status = 403, description = "Read-only role", body = ErrorBody),
        (status = 409, description = "A frame number was rejected; earlier rows stay stored", body = ErrorBody),
        (status = 422, description = "Invalid batch", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
#[instrument(skip(state, session, body), fields(login = %session.0.login, size = body.len()))]
async fn import_sheet(
    State(state): State<AppState>,
    session: CurrentSession,
    body: Bytes,
) -> Result<Json<SyncReport>, ApiError> {
    let report = state
        .vehicle_service
        .import_batch(session.role(), body.to_vec())
        .await?;
    info!("Imported {} vehicles", report.accepted_count);
    Ok(Json(report))
}

#[utoipa::path(
    get,
    path = "/api/v1/imports/template",
    responses(
        (status = 200, description = "Sample delivery sheet")
    ),
    security(("bearer" = []))
)]
#[instrument(skip(state, _session))]
async fn import_template(
    State(state): State<AppState>,
    _session: CurrentSession,
) -> Result<Response, ApiError> {
    let bytes = state.vehicle_service.template().await?;
    Ok(xlsx_response("delivery_template.xlsx", bytes))
}

#[utoipa::path(
    get,
    path = "/api/v1/provinces",
    responses((status = 200, description = "Known provinces", body = [String])),
    security(("bearer" = []))
)]
#[instrument(skip(state, _session))]
async fn list_provinces(
    State(state): State<AppState>,
    _session: CurrentSession,
) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(state.locality_service.list_provinces().await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/cities",
    params(CitiesQuery),
    responses(
        (status = 200, description = "Cities of the province", body = [String]),
        (status = 400, description = "Missing province", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
#[instrument(skip(state, _session, query), fields(province = ?query.province))]
async fn list_cities(
    State(state): State<AppState>,
    _session: CurrentSession,
    Query(query): Query<CitiesQuery>,
) -> Result<Json<Vec<String>>, ApiError> {
    let province = query
        .province
        .ok_or_else(|| ApiError::BadRequest("province query parameter is required".to_string()))?;
    Ok(Json(state.locality_service.list_cities(&province).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_vehicle_routes() {
        let spec = generate_openapi_spec();

        assert!(spec.paths.paths.contains_key("/api/v1/vehicles"));
        assert!(spec.paths.paths.contains_key("/api/v1/vehicles/{frame_number}"));
        assert!(spec.paths.paths.contains_key("/api/v1/imports"));
    }

    #[test]
    fn test_xlsx_response_sanitizes_filename() {
        let response = xlsx_response("A\"B/C.xlsx", vec![1, 2, 3]);

        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"A_B_C.xlsx\""
        );
        assert_eq!(response.headers()[header::CONTENT_TYPE], XLSX_CONTENT_TYPE);
    }
}
