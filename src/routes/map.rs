use actix_web::{http::StatusCode, web, HttpResponse, Responder};
use validator::Validate;
use crate::core::{
    normalize_coordinates, CoordinateError, DistanceUnit, EligibilityMode, LocationError,
    LocationRequest, LocationResolver, MapBuilder, Session, SessionContext,
};
use crate::models::{
    AddressLocationRequest, CreateSessionRequest, DeviceReportRequest, ErrorResponse,
    HealthResponse, IpFallbackRequest, LocationResponse, MapSnapshot, NormalizeRequest,
    NormalizeResponse, RadiusRequest, SessionResponse,
};
use crate::services::{DirectorySource, ReportedPosition, SessionStore};
use std::sync::Arc;
use uuid::Uuid;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub directory: Arc<dyn DirectorySource>,
    pub resolver: LocationResolver,
    pub sessions: SessionStore,
    pub map_builder: MapBuilder,
    pub default_radius: Option<f64>,
    pub default_unit: DistanceUnit,
}

/// Configure all map-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/coordinates/normalize", web::post().to(normalize))
        .route("/location/device-options", web::get().to(device_options))
        .route("/sessions", web::post().to(create_session))
        .route("/sessions/{id}/map", web::get().to(get_map))
        .route("/sessions/{id}/radius", web::put().to(set_radius))
        .route("/sessions/{id}/filter", web::put().to(set_filter))
        .route("/sessions/{id}/location", web::delete().to(clear_location))
        .route("/sessions/{id}/location/address", web::post().to(locate_address))
        .route("/sessions/{id}/location/device", web::post().to(locate_device))
        .route("/sessions/{id}/location/ip", web::post().to(locate_ip));
}

fn error_response(status: StatusCode, error: &str, message: impl Into<String>) -> HttpResponse {
    HttpResponse::build(status).json(ErrorResponse {
        error: error.to_string(),
        message: message.into(),
        status_code: status.as_u16(),
        ip_fallback_offered: false,
    })
}

fn validation_error(errors: validator::ValidationErrors) -> HttpResponse {
    error_response(StatusCode::BAD_REQUEST, "Validation failed", errors.to_string())
}

fn coordinate_error_response(err: &CoordinateError) -> HttpResponse {
    let code = match err {
        CoordinateError::InvalidFormat => "invalid_format",
        CoordinateError::OutOfRange => "out_of_range",
    };
    error_response(StatusCode::UNPROCESSABLE_ENTITY, code, err.to_string())
}

fn location_error_response(err: &LocationError, ip_fallback_offered: bool) -> HttpResponse {
    let (status, code) = match err {
        LocationError::PermissionDenied => (StatusCode::FORBIDDEN, "permission_denied"),
        LocationError::Unavailable => (StatusCode::SERVICE_UNAVAILABLE, "unavailable"),
        LocationError::Timeout => (StatusCode::GATEWAY_TIMEOUT, "timeout"),
        LocationError::NotFound => (StatusCode::NOT_FOUND, "not_found"),
        LocationError::ServiceError(_) => (StatusCode::BAD_GATEWAY, "service_error"),
    };

    HttpResponse::build(status).json(ErrorResponse {
        error: code.to_string(),
        message: err.to_string(),
        status_code: status.as_u16(),
        ip_fallback_offered,
    })
}

async fn find_session(state: &AppState, id: &Uuid) -> Result<Arc<Session>, HttpResponse> {
    state.sessions.get(id).await.ok_or_else(|| {
        error_response(
            StatusCode::NOT_FOUND,
            "Session not found",
            format!("No session with id {}", id),
        )
    })
}

/// Recompute the map from the latest directory snapshot and session context
async fn render(state: &AppState, context: &SessionContext) -> Result<MapSnapshot, HttpResponse> {
    let directory = state.directory.snapshot().await.map_err(|e| {
        tracing::error!("Failed to load directory: {}", e);
        error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to load directory", e.to_string())
    })?;

    Ok(state.map_builder.build(&directory, context))
}

async fn render_session(state: &AppState, session: &Session) -> HttpResponse {
    match render(state, &session.context()).await {
        Ok(map) => HttpResponse::Ok().json(map),
        Err(response) => response,
    }
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let healthy = state.directory.health_check().await;

    let status = if healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Normalize editor coordinates
///
/// POST /api/v1/coordinates/normalize
///
/// Request body:
/// ```json
/// { "latitude": "39.75", "longitude": "84.19" }
/// ```
async fn normalize(
    state: web::Data<AppState>,
    req: web::Json<NormalizeRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(errors);
    }

    match normalize_coordinates(&req.latitude, &req.longitude, state.resolver.policy()) {
        Ok(normalized) => HttpResponse::Ok().json(NormalizeResponse {
            point: normalized.point,
            far_from_region: normalized.far_from_region,
        }),
        Err(e) => coordinate_error_response(&e),
    }
}

/// Options the client must use for its device location request
async fn device_options(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(state.resolver.device_options())
}

/// Open a map session
///
/// POST /api/v1/sessions
///
/// Request body (all optional):
/// ```json
/// { "radius": 10.0, "unit": "miles" }
/// ```
async fn create_session(
    state: web::Data<AppState>,
    req: Option<web::Json<CreateSessionRequest>>,
) -> impl Responder {
    let req = req.map(|r| r.into_inner()).unwrap_or_default();
    if let Err(errors) = req.validate() {
        return validation_error(errors);
    }

    let context = SessionContext::new(
        req.radius.or(state.default_radius),
        req.unit.unwrap_or(state.default_unit),
    );
    let (session_id, session) = state.sessions.create(context).await;

    tracing::info!("Opened session {}", session_id);

    match render(&state, &session.context()).await {
        Ok(map) => HttpResponse::Created().json(SessionResponse { session_id, map }),
        Err(response) => response,
    }
}

/// Current map snapshot for a session
async fn get_map(state: web::Data<AppState>, path: web::Path<Uuid>) -> impl Responder {
    let session = match find_session(&state, &path).await {
        Ok(session) => session,
        Err(response) => return response,
    };

    render_session(&state, &session).await
}

/// Change or remove the radius
async fn set_radius(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    req: web::Json<RadiusRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(errors);
    }
    let session = match find_session(&state, &path).await {
        Ok(session) => session,
        Err(response) => return response,
    };

    session.set_radius(req.radius);
    tracing::debug!("Session {} radius set to {:?}", path, req.radius);

    render_session(&state, &session).await
}

/// Change the collaboration filter
///
/// Request body: `{"mode": "all" | "active" | "none"}` or
/// `{"mode": "specific", "collaborationId": "..."}`
async fn set_filter(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    req: web::Json<EligibilityMode>,
) -> impl Responder {
    let session = match find_session(&state, &path).await {
        Ok(session) => session,
        Err(response) => return response,
    };

    session.set_mode(req.into_inner());

    render_session(&state, &session).await
}

/// Forget the reference point
async fn clear_location(state: web::Data<AppState>, path: web::Path<Uuid>) -> impl Responder {
    let session = match find_session(&state, &path).await {
        Ok(session) => session,
        Err(response) => return response,
    };

    session.clear_reference();
    tracing::debug!("Session {} reference cleared", path);

    render_session(&state, &session).await
}

/// Run one resolution against a session and answer with the new map
async fn resolve_into_session(
    state: &AppState,
    session: &Session,
    request: LocationRequest<'_>,
    ticket: crate::core::ResolutionTicket,
) -> HttpResponse {
    let is_device = matches!(request, LocationRequest::Device(_));

    match state.resolver.resolve(request).await {
        Ok(reference) => {
            let applied = session.apply_resolution(ticket, reference);
            if !applied {
                tracing::info!(
                    "Location from generation {} superseded (session now at {})",
                    ticket.generation(),
                    session.generation()
                );
            }
            let context = session.context();
            match render(state, &context).await {
                Ok(map) => HttpResponse::Ok().json(LocationResponse {
                    applied,
                    reference: context.reference,
                    map,
                }),
                Err(response) => response,
            }
        }
        Err(e) => {
            let offered = is_device && session.record_device_failure(ticket);
            location_error_response(&e, offered)
        }
    }
}

/// Locate by free-text address
async fn locate_address(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    req: web::Json<AddressLocationRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(errors);
    }
    let session = match find_session(&state, &path).await {
        Ok(session) => session,
        Err(response) => return response,
    };

    let ticket = session.begin_resolution();
    resolve_into_session(&state, &session, LocationRequest::Address(&req.query), ticket).await
}

/// Apply the client's device location outcome
///
/// Request body: `{"latitude": .., "longitude": ..}` on success, or
/// `{"errorCode": 1|2|3, "errorMessage": ".."}` on failure. A failure offers
/// the IP estimate, which the user must confirm separately.
async fn locate_device(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    req: web::Json<DeviceReportRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(errors);
    }
    let session = match find_session(&state, &path).await {
        Ok(session) => session,
        Err(response) => return response,
    };

    let req = req.into_inner();
    let reported = match (req.latitude, req.longitude, req.error_code) {
        (Some(latitude), Some(longitude), None) => ReportedPosition::position(latitude, longitude),
        (_, _, Some(code)) => ReportedPosition::failure(code, req.error_message),
        // Ruled out by validation
        _ => ReportedPosition::failure(0, Some("Incomplete device report".to_string())),
    };

    let ticket = session.begin_resolution();
    resolve_into_session(&state, &session, LocationRequest::Device(&reported), ticket).await
}

/// Use the IP estimate after a device failure
///
/// Only honored once per device failure and only with `{"confirm": true}`.
async fn locate_ip(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    req: web::Json<IpFallbackRequest>,
) -> impl Responder {
    if !req.confirm {
        return error_response(
            StatusCode::BAD_REQUEST,
            "confirmation_required",
            "The approximate IP location must be explicitly confirmed",
        );
    }
    let session = match find_session(&state, &path).await {
        Ok(session) => session,
        Err(response) => return response,
    };

    let Some(ticket) = session.take_ip_fallback() else {
        return error_response(
            StatusCode::CONFLICT,
            "ip_fallback_not_offered",
            "The approximate IP location is only available after device location fails",
        );
    };

    resolve_into_session(&state, &session, LocationRequest::IpApproximate, ticket).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_error_statuses() {
        let response = location_error_response(&LocationError::PermissionDenied, true);
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = location_error_response(&LocationError::NotFound, false);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = location_error_response(&LocationError::ServiceError("x".into()), false);
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_coordinate_error_status() {
        let response = coordinate_error_response(&CoordinateError::OutOfRange);
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
