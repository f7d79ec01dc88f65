//! # rf-api
//!
//! The web routing and orchestration layer for Rusty-Forum.

pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;

use actix_web::web;
use handlers::Votable;

/// Configures the JSON API routes.
///
/// # Developer Note
/// Everything lives under `/api` so the binary can mount other services
/// (static files, health checks) beside it.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            // Magazines
            .service(
                web::resource("/magazines")
                    .route(web::get().to(handlers::list_magazines))
                    .route(web::post().to(handlers::create_magazine)),
            )
            .service(
                web::resource("/magazines/{id}")
                    .route(web::get().to(handlers::get_magazine))
                    .route(web::delete().to(handlers::delete_magazine)),
            )
            .route("/magazines/{id}/threads", web::get().to(handlers::magazine_threads))
            .service(
                web::resource("/magazines/{id}/subscription")
                    .route(web::post().to(handlers::subscribe))
                    .route(web::delete().to(handlers::unsubscribe)),
            )
            // Threads
            .service(
                web::resource("/threads")
                    .route(web::get().to(handlers::list_threads))
                    .route(web::post().to(handlers::create_thread)),
            )
            .service(
                web::resource("/threads/{id}")
                    .route(web::get().to(handlers::get_thread))
                    .route(web::patch().to(handlers::update_thread))
                    .route(web::delete().to(handlers::delete_thread)),
            )
            .service(
                web::resource("/threads/{id}/boost")
                    .route(web::post().to(handlers::boost_thread))
                    .route(web::delete().to(handlers::unboost_thread)),
            )
            .service(
                web::resource("/threads/{id}/comments")
                    .route(web::get().to(handlers::thread_comments))
                    .route(web::post().to(handlers::post_comment)),
            )
            .service(vote_resource("/threads/{id}/{vote:like|dislike}", Votable::Thread))
            // Comments
            .service(
                web::resource("/comments/{id}")
                    .route(web::get().to(handlers::get_comment))
                    .route(web::patch().to(handlers::update_comment))
                    .route(web::delete().to(handlers::delete_comment)),
            )
            .route("/comments/{id}/replies", web::get().to(handlers::comment_replies))
            .service(vote_resource("/comments/{id}/{vote:like|dislike}", Votable::Comment))
            // Replies
            .service(
                web::resource("/replies/{id}")
                    .route(web::get().to(handlers::get_reply))
                    .route(web::patch().to(handlers::update_reply))
                    .route(web::delete().to(handlers::delete_reply)),
            )
            .service(vote_resource("/replies/{id}/{vote:like|dislike}", Votable::Reply))
            // Search & profiles
            .route("/search", web::get().to(handlers::search))
            .route("/users/{id}", web::get().to(handlers::get_user))
            .route("/users/{id}/threads", web::get().to(handlers::user_threads))
            .route("/users/{id}/comments", web::get().to(handlers::user_comments))
            .route("/users/{id}/boosts", web::get().to(handlers::user_boosts)),
    );
}

fn vote_resource(path: &str, kind: Votable) -> actix_web::Resource {
    web::resource(path)
        .app_data(web::Data::new(kind))
        .route(web::post().to(handlers::cast_vote))
        .route(web::delete().to(handlers::retract_vote))
}

#[cfg(test)]
mod tests;
