//! # rf-api Handlers
//!
//! This module coordinates the flow between HTTP requests and the forum service.
//! Listing handlers load the session's sticky preferences, let the service
//! resolve them, and store them back before answering. Every thread, comment
//! and reply in a response carries the caller's own vote and boost marks.

use actix_web::{web, HttpRequest, HttpResponse};
use rf_core::models::{NewMagazine, NewPost, NewThread, ThreadEdit, VoteTarget, VoteType};
use rf_core::traits::{IdentityProvider, SessionStore};
use rf_services::ForumService;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::extract::{authenticate, optional_principal, Session};

/// State shared across all Actix-web workers.
pub struct AppState {
    pub forum: ForumService,
    pub identity: Arc<dyn IdentityProvider>,
    pub sessions: Arc<dyn SessionStore>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ThreadListQuery {
    pub filter: Option<String>,
    pub order_by: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct OrderQuery {
    pub order_by: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MagazineListQuery {
    pub orderby: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub query: String,
    pub order_by: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BodyEdit {
    pub body: String,
}

// ── Magazines ───────────────────────────────────────────────────────────────

pub async fn list_magazines(
    data: web::Data<AppState>,
    query: web::Query<MagazineListQuery>,
) -> ApiResult {
    let magazines = data.forum.list_magazines(query.orderby.as_deref()).await?;
    Ok(HttpResponse::Ok().json(magazines))
}

pub async fn create_magazine(
    data: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<NewMagazine>,
) -> ApiResult {
    let actor = authenticate(&data, &req).await?;
    let magazine = data.forum.create_magazine(&actor, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(magazine))
}

pub async fn get_magazine(data: web::Data<AppState>, path: web::Path<Uuid>) -> ApiResult {
    let magazine = data.forum.magazine(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(magazine))
}

pub async fn delete_magazine(
    data: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> ApiResult {
    let actor = authenticate(&data, &req).await?;
    data.forum.delete_magazine(&actor, path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn magazine_threads(
    data: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    query: web::Query<ThreadListQuery>,
) -> ApiResult {
    let viewer = optional_principal(&data, &req).await?;
    let session = Session::from_request(&req);
    let mut prefs = data.sessions.load(session.key()).await?;
    let threads = data
        .forum
        .magazine_threads(&mut prefs, path.into_inner(), query.filter.as_deref(), query.order_by.as_deref())
        .await?;
    data.sessions.save(session.key(), prefs).await?;
    let threads = data.forum.for_viewer(viewer.as_ref(), threads).await?;
    Ok(session.respond(HttpResponse::Ok()).json(threads))
}

pub async fn subscribe(
    data: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> ApiResult {
    let actor = authenticate(&data, &req).await?;
    let subscription = data.forum.subscribe(&actor, path.into_inner()).await?;
    Ok(HttpResponse::Created().json(subscription))
}

pub async fn unsubscribe(
    data: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> ApiResult {
    let actor = authenticate(&data, &req).await?;
    data.forum.unsubscribe(&actor, path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

// ── Threads ─────────────────────────────────────────────────────────────────

pub async fn list_threads(
    data: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<ThreadListQuery>,
) -> ApiResult {
    let viewer = optional_principal(&data, &req).await?;
    let session = Session::from_request(&req);
    let mut prefs = data.sessions.load(session.key()).await?;
    let threads = data
        .forum
        .list_threads(&mut prefs, query.filter.as_deref(), query.order_by.as_deref())
        .await?;
    data.sessions.save(session.key(), prefs).await?;
    let threads = data.forum.for_viewer(viewer.as_ref(), threads).await?;
    Ok(session.respond(HttpResponse::Ok()).json(threads))
}

pub async fn create_thread(
    data: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<NewThread>,
) -> ApiResult {
    let actor = authenticate(&data, &req).await?;
    let thread = data.forum.create_thread(&actor, body.into_inner()).await?;
    let thread = data.forum.for_viewer(Some(&actor), thread).await?;
    Ok(HttpResponse::Created().json(thread))
}

pub async fn get_thread(data: web::Data<AppState>, req: HttpRequest, path: web::Path<Uuid>) -> ApiResult {
    let viewer = optional_principal(&data, &req).await?;
    let thread = data.forum.thread(path.into_inner()).await?;
    let thread = data.forum.for_viewer(viewer.as_ref(), thread).await?;
    Ok(HttpResponse::Ok().json(thread))
}

pub async fn update_thread(
    data: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    body: web::Json<ThreadEdit>,
) -> ApiResult {
    let actor = authenticate(&data, &req).await?;
    let thread = data
        .forum
        .update_thread(&actor, path.into_inner(), body.into_inner())
        .await?;
    let thread = data.forum.for_viewer(Some(&actor), thread).await?;
    Ok(HttpResponse::Ok().json(thread))
}

pub async fn delete_thread(
    data: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> ApiResult {
    let actor = authenticate(&data, &req).await?;
    data.forum.delete_thread(&actor, path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn boost_thread(
    data: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> ApiResult {
    let actor = authenticate(&data, &req).await?;
    let boost = data.forum.boost(&actor, path.into_inner()).await?;
    Ok(HttpResponse::Created().json(boost))
}

pub async fn unboost_thread(
    data: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> ApiResult {
    let actor = authenticate(&data, &req).await?;
    data.forum.unboost(&actor, path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn thread_comments(
    data: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    query: web::Query<OrderQuery>,
) -> ApiResult {
    let viewer = optional_principal(&data, &req).await?;
    let session = Session::from_request(&req);
    let mut prefs = data.sessions.load(session.key()).await?;
    let comments = data
        .forum
        .thread_comments(&mut prefs, path.into_inner(), query.order_by.as_deref())
        .await?;
    data.sessions.save(session.key(), prefs).await?;
    let comments = data.forum.for_viewer(viewer.as_ref(), comments).await?;
    Ok(session.respond(HttpResponse::Ok()).json(comments))
}

pub async fn post_comment(
    data: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    body: web::Json<NewPost>,
) -> ApiResult {
    let actor = authenticate(&data, &req).await?;
    let posted = data
        .forum
        .post_comment(&actor, path.into_inner(), body.into_inner())
        .await?;
    let posted = data.forum.for_viewer(Some(&actor), posted).await?;
    Ok(HttpResponse::Created().json(posted))
}

// ── Comments and replies ────────────────────────────────────────────────────

pub async fn get_comment(data: web::Data<AppState>, req: HttpRequest, path: web::Path<Uuid>) -> ApiResult {
    let viewer = optional_principal(&data, &req).await?;
    let comment = data.forum.comment(path.into_inner()).await?;
    let comment = data.forum.for_viewer(viewer.as_ref(), comment).await?;
    Ok(HttpResponse::Ok().json(comment))
}

pub async fn update_comment(
    data: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    body: web::Json<BodyEdit>,
) -> ApiResult {
    let actor = authenticate(&data, &req).await?;
    let comment = data
        .forum
        .update_comment(&actor, path.into_inner(), body.into_inner().body)
        .await?;
    let comment = data.forum.for_viewer(Some(&actor), comment).await?;
    Ok(HttpResponse::Ok().json(comment))
}

pub async fn delete_comment(
    data: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> ApiResult {
    let actor = authenticate(&data, &req).await?;
    data.forum.delete_comment(&actor, path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn comment_replies(data: web::Data<AppState>, req: HttpRequest, path: web::Path<Uuid>) -> ApiResult {
    let viewer = optional_principal(&data, &req).await?;
    let replies = data.forum.replies_of(path.into_inner()).await?;
    let replies = data.forum.for_viewer(viewer.as_ref(), replies).await?;
    Ok(HttpResponse::Ok().json(replies))
}

pub async fn get_reply(data: web::Data<AppState>, req: HttpRequest, path: web::Path<Uuid>) -> ApiResult {
    let viewer = optional_principal(&data, &req).await?;
    let reply = data.forum.reply(path.into_inner()).await?;
    let reply = data.forum.for_viewer(viewer.as_ref(), reply).await?;
    Ok(HttpResponse::Ok().json(reply))
}

pub async fn update_reply(
    data: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    body: web::Json<BodyEdit>,
) -> ApiResult {
    let actor = authenticate(&data, &req).await?;
    let reply = data
        .forum
        .update_reply(&actor, path.into_inner(), body.into_inner().body)
        .await?;
    let reply = data.forum.for_viewer(Some(&actor), reply).await?;
    Ok(HttpResponse::Ok().json(reply))
}

pub async fn delete_reply(
    data: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> ApiResult {
    let actor = authenticate(&data, &req).await?;
    data.forum.delete_reply(&actor, path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

// ── Votes ───────────────────────────────────────────────────────────────────

/// Which kind of entity a vote route addresses.
#[derive(Debug, Clone, Copy)]
pub enum Votable {
    Thread,
    Comment,
    Reply,
}

impl Votable {
    fn target(self, id: Uuid) -> VoteTarget {
        match self {
            Votable::Thread => VoteTarget::Thread(id),
            Votable::Comment => VoteTarget::Comment(id),
            Votable::Reply => VoteTarget::Reply(id),
        }
    }
}

/// POST toggles: same direction again removes, the other direction flips.
pub async fn cast_vote(
    data: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<(Uuid, String)>,
    kind: web::Data<Votable>,
) -> ApiResult {
    let actor = authenticate(&data, &req).await?;
    let (id, direction) = path.into_inner();
    let action: VoteType = direction.parse()?;
    let outcome = data.forum.vote(&actor, kind.target(id), action).await?;
    Ok(HttpResponse::Ok().json(outcome))
}

/// DELETE removes the caller's vote only when it has the named direction.
pub async fn retract_vote(
    data: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<(Uuid, String)>,
    kind: web::Data<Votable>,
) -> ApiResult {
    let actor = authenticate(&data, &req).await?;
    let (id, direction) = path.into_inner();
    let direction: VoteType = direction.parse()?;
    data.forum.retract_vote(&actor, kind.target(id), direction).await?;
    Ok(HttpResponse::NoContent().finish())
}

// ── Search and profiles ─────────────────────────────────────────────────────

pub async fn search(data: web::Data<AppState>, req: HttpRequest, query: web::Query<SearchQuery>) -> ApiResult {
    let viewer = optional_principal(&data, &req).await?;
    let threads = data.forum.search(&query.query, query.order_by.as_deref()).await?;
    let threads = data.forum.for_viewer(viewer.as_ref(), threads).await?;
    Ok(HttpResponse::Ok().json(threads))
}

pub async fn user_threads(
    data: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    query: web::Query<ThreadListQuery>,
) -> ApiResult {
    let viewer = optional_principal(&data, &req).await?;
    let session = Session::from_request(&req);
    let mut prefs = data.sessions.load(session.key()).await?;
    let threads = data
        .forum
        .user_threads(&mut prefs, path.into_inner(), query.filter.as_deref(), query.order_by.as_deref())
        .await?;
    data.sessions.save(session.key(), prefs).await?;
    let threads = data.forum.for_viewer(viewer.as_ref(), threads).await?;
    Ok(session.respond(HttpResponse::Ok()).json(threads))
}

pub async fn user_comments(
    data: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    query: web::Query<OrderQuery>,
) -> ApiResult {
    let viewer = optional_principal(&data, &req).await?;
    let session = Session::from_request(&req);
    let mut prefs = data.sessions.load(session.key()).await?;
    let activity = data
        .forum
        .user_activity(&mut prefs, path.into_inner(), query.order_by.as_deref())
        .await?;
    data.sessions.save(session.key(), prefs).await?;
    let activity = data.forum.for_viewer(viewer.as_ref(), activity).await?;
    Ok(session.respond(HttpResponse::Ok()).json(activity))
}

pub async fn get_user(data: web::Data<AppState>, path: web::Path<Uuid>) -> ApiResult {
    let info = data.forum.user_info(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(info))
}

pub async fn user_boosts(data: web::Data<AppState>, req: HttpRequest, path: web::Path<Uuid>) -> ApiResult {
    let viewer = optional_principal(&data, &req).await?;
    let threads = data.forum.boosted_threads(path.into_inner()).await?;
    let threads = data.forum.for_viewer(viewer.as_ref(), threads).await?;
    Ok(HttpResponse::Ok().json(threads))
}
