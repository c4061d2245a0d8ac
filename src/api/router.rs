//! Route table for the practice API.
//!
//! Three surfaces share one listener:
//! - `/api` public: health probe and the session endpoints.
//! - `/api` protected: typed JSON reads, rejected with 401 when no
//!   session cookie verifies.
//! - `/acciones` protected: mutations that always answer HTTP 200 with
//!   an [`ActionResult`](super::types::ActionResult) envelope; anonymous
//!   callers are redirected to the login page instead.

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use super::endpoints::{
    alimentos, auth, consultas, health, mediciones, pacientes, perfiles, planes,
};
use super::middleware::auth::{require_session_accion, require_session_api};
use super::types::ApiContext;

/// Build the full application router.
///
/// The context is both handler state and a request extension: handlers
/// extract it with `State`, the session middleware reads it back out of
/// the extensions, so the `Extension` layer has to sit outside the
/// `from_fn` layers.
pub fn app_router(ctx: ApiContext) -> Router {
    let publico = Router::new()
        .route("/health", get(health::check))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .with_state(ctx.clone());

    // Reads. Note: axum 0.7 uses `:param` syntax for path parameters.
    let protegido = Router::new()
        .route("/pacientes", get(pacientes::listado))
        .route("/pacientes/:id", get(pacientes::detalle))
        .route("/pacientes/:id/perfil", get(perfiles::detalle))
        .route("/pacientes/:id/consultas", get(consultas::por_paciente))
        .route("/pacientes/:id/planes", get(planes::por_paciente))
        .route("/mediciones/:paciente_id", get(mediciones::por_paciente))
        .route("/consultas", get(consultas::agenda))
        .route("/planes/:id", get(planes::detalle))
        .route("/alimentos", get(alimentos::catalogo))
        .route("/alimentos/:id", get(alimentos::detalle))
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(require_session_api));

    // Mutations. Static segments like `crear` sit beside the `:id`
    // routes; matchit gives static segments priority.
    let acciones = Router::new()
        .route("/pacientes/crear", post(pacientes::crear))
        .route("/pacientes/:id/actualizar", post(pacientes::actualizar))
        .route("/pacientes/:id/activar", post(pacientes::activar))
        .route("/pacientes/:id/eliminar", post(pacientes::eliminar))
        .route("/pacientes/:id/perfil", post(perfiles::guardar))
        .route("/mediciones/crear", post(mediciones::crear))
        .route("/mediciones/:id/actualizar", post(mediciones::actualizar))
        .route("/mediciones/:id/eliminar", post(mediciones::eliminar))
        .route("/consultas/crear", post(consultas::crear))
        .route("/consultas/:id/actualizar", post(consultas::actualizar))
        .route("/consultas/:id/eliminar", post(consultas::eliminar))
        .route("/planes/crear", post(planes::crear))
        .route("/planes/:id/actualizar", post(planes::actualizar))
        .route("/planes/:id/eliminar", post(planes::eliminar))
        .route("/alimentos/crear", post(alimentos::crear))
        .route("/alimentos/:id/actualizar", post(alimentos::actualizar))
        .route("/alimentos/:id/eliminar", post(alimentos::eliminar))
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(require_session_accion));

    Router::new()
        .nest("/api", publico)
        .nest("/api", protegido)
        .nest("/acciones", acciones)
        .layer(axum::Extension(ctx))
        .layer(TraceLayer::new_for_http())
}
