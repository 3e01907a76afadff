pub mod account_handlers;
pub mod audit_handlers;
pub mod auth_handlers;
pub mod permission_handlers;
pub mod role_handlers;
pub mod settings_handlers;
pub mod system_handlers;
pub mod transfer_handlers;
pub mod user_handlers;

use actix_web::{HttpResponse, ResponseError, middleware::from_fn, web};
use sqlx::SqlitePool;

use crate::audit::record_operations;
use crate::auth::middleware::{require_admin, require_auth, require_permission};
use crate::auth::token::TokenCodec;
use crate::errors::AppError;
use crate::models::permission::{
    PERMISSION_READ, PERMISSION_WRITE, ROLE_READ, ROLE_WRITE, USER_READ, USER_WRITE,
};

/// Malformed JSON bodies answer with the regular error envelope.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        let app_err = AppError::Validation(format!("invalid request body: {err}"));
        actix_web::error::InternalError::from_response(err, app_err.error_response()).into()
    })
}

/// Path parameters that fail to parse (e.g. a non-numeric id) answer the same way.
pub fn path_config() -> web::PathConfig {
    web::PathConfig::default().error_handler(|err, _req| {
        let app_err = AppError::Validation(format!("invalid path parameter: {err}"));
        actix_web::error::InternalError::from_response(err, app_err.error_response()).into()
    })
}

pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| {
        let app_err = AppError::Validation(format!("invalid query string: {err}"));
        actix_web::error::InternalError::from_response(err, app_err.error_response()).into()
    })
}

/// Largest CSV document accepted by the import routes.
const MAX_IMPORT_BYTES: usize = 4 * 1024 * 1024;

/// Shared state plus every route. Used by `main` and by the HTTP tests.
pub fn app_config(pool: SqlitePool, codec: TokenCodec) -> impl FnOnce(&mut web::ServiceConfig) {
    system_handlers::started_at();
    move |cfg| {
        cfg.app_data(web::Data::new(pool))
            .app_data(web::Data::new(codec))
            .app_data(json_config())
            .app_data(path_config())
            .app_data(query_config())
            .app_data(web::PayloadConfig::new(MAX_IMPORT_BYTES));
        configure(cfg);
    }
}

/// Unmatched paths answer 404 in the envelope, with or without a token.
async fn route_not_found() -> Result<HttpResponse, AppError> {
    Err(AppError::NotFound("route"))
}

// `wrap` order is inside-out: require_auth runs first, then the operation log,
// then any narrower gate.
macro_rules! authenticated {
    ($service:expr) => {
        $service
            .wrap(from_fn(record_operations))
            .wrap(from_fn(require_auth))
    };
}

macro_rules! admin_only {
    ($service:expr) => {
        authenticated!($service.wrap(from_fn(require_admin)))
    };
}

/// A single route that additionally needs `permission`.
macro_rules! gated {
    ($path:expr, $permission:expr, $route:expr) => {
        web::resource($path)
            .wrap(from_fn(require_permission($permission)))
            .route($route)
    };
}

/// Route tree. `/health` is public; everything else lives under `/api`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(system_handlers::health));
    cfg.service(
        web::scope("/api")
            .service(
                web::scope("/auth")
                    .route("/register", web::post().to(auth_handlers::register))
                    .route("/login", web::post().to(auth_handlers::login))
                    .route("/logout", web::post().to(auth_handlers::logout)),
            )
            .route("/config/public", web::get().to(settings_handlers::public))
            .route("/system/monitor", web::get().to(system_handlers::monitor))
            .service(authenticated!(
                web::resource("/me")
                    .route(web::get().to(account_handlers::me))
                    .route(web::put().to(account_handlers::update_profile))
            ))
            .service(authenticated!(
                web::resource("/change-password").route(web::post().to(account_handlers::change_password))
            ))
            .service(authenticated!(
                web::resource("/my-permissions").route(web::get().to(account_handlers::my_permissions))
            ))
            .service(authenticated!(
                web::resource("/system/info").route(web::get().to(system_handlers::info))
            ))
            .service(admin_only!(
                web::scope("/users")
                    .route("", web::get().to(user_handlers::list))
                    .route("", web::post().to(user_handlers::create))
                    .route("/{id}", web::get().to(user_handlers::read))
                    .route("/{id}", web::put().to(user_handlers::update))
                    .route("/{id}", web::delete().to(user_handlers::delete))
                    .route("/{id}/roles", web::get().to(user_handlers::roles))
                    .route("/{id}/roles", web::post().to(user_handlers::assign_roles))
            ))
            .service(admin_only!(
                web::scope("/roles")
                    .route("", web::get().to(role_handlers::list))
                    .route("", web::post().to(role_handlers::create))
                    .route("/{id}", web::get().to(role_handlers::read))
                    .route("/{id}", web::put().to(role_handlers::update))
                    .route("/{id}", web::delete().to(role_handlers::delete))
            ))
            .service(admin_only!(
                web::scope("/permissions")
                    .route("", web::get().to(permission_handlers::list))
                    .route("/assign", web::post().to(permission_handlers::assign))
            ))
            // /logs/stats and /logs/batch-delete BEFORE /logs/{id}
            .service(admin_only!(
                web::scope("/logs")
                    .route("", web::get().to(audit_handlers::list))
                    .route("/stats", web::get().to(audit_handlers::stats))
                    .route("/batch-delete", web::post().to(audit_handlers::batch_delete))
                    .route("/clear-old", web::delete().to(audit_handlers::clear_old))
                    .route("/{id}", web::get().to(audit_handlers::read))
                    .route("/{id}", web::delete().to(audit_handlers::delete))
            ))
            .service(admin_only!(
                web::scope("/config")
                    .route("", web::get().to(settings_handlers::list))
                    .route("", web::post().to(settings_handlers::create))
                    .route("/batch", web::post().to(settings_handlers::batch_update))
                    .route("/{key}", web::get().to(settings_handlers::read))
                    .route("/{key}", web::put().to(settings_handlers::update))
                    .route("/{key}", web::delete().to(settings_handlers::delete))
                    .route("/{key}/reset", web::post().to(settings_handlers::reset))
            ))
            .service(admin_only!(
                web::scope("/export")
                    .service(gated!("/users", USER_READ, web::get().to(transfer_handlers::export_users)))
                    .service(gated!("/roles", ROLE_READ, web::get().to(transfer_handlers::export_roles)))
                    .service(gated!(
                        "/permissions",
                        PERMISSION_READ,
                        web::get().to(transfer_handlers::export_permissions)
                    ))
            ))
            .service(admin_only!(
                web::scope("/import")
                    .service(gated!("/users", USER_WRITE, web::post().to(transfer_handlers::import_users)))
                    .service(gated!("/roles", ROLE_WRITE, web::post().to(transfer_handlers::import_roles)))
                    .service(gated!(
                        "/permissions",
                        PERMISSION_WRITE,
                        web::post().to(transfer_handlers::import_permissions)
                    ))
            )),
    );
    cfg.default_service(web::to(route_not_found));
}
