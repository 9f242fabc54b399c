use actix_web::error::JsonPayloadError;
use actix_web::web;
use actix_web_httpauth::middleware::HttpAuthentication;
use serde_json::error::Category;

use crate::errors::AppError;
use crate::handlers::{self, activity, auth, leaderboard, team, user, workout};
use crate::utils::jwt::validator;

/// Well-formed JSON holding a value of the wrong shape is a validation failure;
/// anything else wrong with the body is a plain bad request.
fn json_error(err: JsonPayloadError) -> AppError {
    match err {
        JsonPayloadError::Deserialize(e) if e.classify() == Category::Data => {
            AppError::field("non_field_errors", &e.to_string())
        }
        other => AppError::BadRequest(other.to_string()),
    }
}

/// Registers every API route. Shared by the server and the test suite.
///
/// Users, teams and the leaderboard are readable anonymously; their write
/// handlers demand a `Caller`. Activities and workouts sit behind the bearer
/// middleware entirely.
pub fn configure(cfg: &mut web::ServiceConfig) {
    let json_config = web::JsonConfig::default().error_handler(|err, _req| json_error(err).into());
    let query_config = web::QueryConfig::default()
        .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into());
    let path_config = web::PathConfig::default()
        .error_handler(|_err, _req| AppError::NotFound("Not found".to_string()).into());

    cfg.app_data(json_config)
        .app_data(query_config)
        .app_data(path_config)
        .route("/api/", web::get().to(handlers::api_root))
        .service(
            web::scope("/api/auth")
                .route("/register/", web::post().to(auth::register))
                .route("/login/", web::post().to(auth::login)),
        )
        .service(
            web::scope("/api/users")
                .service(
                    web::resource("/")
                        .route(web::get().to(user::list_users))
                        .route(web::post().to(user::create_user)),
                )
                .service(web::resource("/me/").route(web::get().to(user::me)))
                .service(
                    web::resource("/{id}/")
                        .route(web::get().to(user::get_user))
                        .route(web::put().to(user::replace_user))
                        .route(web::patch().to(user::patch_user))
                        .route(web::delete().to(user::delete_user)),
                ),
        )
        .service(
            web::scope("/api/teams")
                .service(
                    web::resource("/")
                        .route(web::get().to(team::list_teams))
                        .route(web::post().to(team::create_team)),
                )
                .service(
                    web::resource("/{id}/")
                        .route(web::get().to(team::get_team))
                        .route(web::put().to(team::replace_team))
                        .route(web::patch().to(team::patch_team))
                        .route(web::delete().to(team::delete_team)),
                )
                .service(web::resource("/{id}/add_member/").route(web::post().to(team::add_member)))
                .service(
                    web::resource("/{id}/remove_member/").route(web::post().to(team::remove_member)),
                ),
        )
        .service(
            web::scope("/api/activities")
                .wrap(HttpAuthentication::with_fn(validator))
                .service(
                    web::resource("/")
                        .route(web::get().to(activity::list_activities))
                        .route(web::post().to(activity::create_activity)),
                )
                .service(web::resource("/by_type/").route(web::get().to(activity::activities_by_type)))
                .service(
                    web::resource("/{id}/")
                        .route(web::get().to(activity::get_activity))
                        .route(web::put().to(activity::replace_activity))
                        .route(web::patch().to(activity::patch_activity))
                        .route(web::delete().to(activity::delete_activity)),
                ),
        )
        .service(
            web::scope("/api/leaderboard")
                .service(web::resource("/").route(web::get().to(leaderboard::list_leaderboard)))
                .service(web::resource("/by_team/").route(web::get().to(leaderboard::by_team)))
                .service(web::resource("/{id}/").route(web::get().to(leaderboard::get_entry))),
        )
        .service(
            web::scope("/api/workouts")
                .wrap(HttpAuthentication::with_fn(validator))
                .service(
                    web::resource("/")
                        .route(web::get().to(workout::list_workouts))
                        .route(web::post().to(workout::create_workout)),
                )
                .service(
                    web::resource("/{id}/")
                        .route(web::get().to(workout::get_workout))
                        .route(web::put().to(workout::replace_workout))
                        .route(web::patch().to(workout::patch_workout))
                        .route(web::delete().to(workout::delete_workout)),
                )
                .service(
                    web::resource("/{id}/mark_completed/").route(web::post().to(workout::mark_completed)),
                ),
        );
}
