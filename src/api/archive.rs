use actix_web::{
    HttpResponse,
    http::header::{ContentDisposition, DispositionParam, DispositionType},
    web,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use sqlx::MySqlPool;
use tracing::info;
use utoipa::IntoParams;

use crate::{
    api::{PageQuery, ok, paginated},
    auth::auth::AuthUser,
    config::Config,
    error::{AppError, AppResult},
    model::archive::FinalStatus,
    pdf::render_archive_pdf,
    service::archive,
};

#[derive(Debug, Deserialize, IntoParams)]
pub struct ArchiveQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    /// approved or denied
    pub final_status: Option<FinalStatus>,
}

/// List archived leave requests
#[utoipa::path(
    get,
    path = "/api/archives",
    params(ArchiveQuery),
    responses((status = 200, description = "Paginated archives in the caller's scope", body = [crate::model::archive::LeaveArchive])),
    tag = "Archive",
    security(("bearer_auth" = []))
)]
pub async fn list_archives(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<ArchiveQuery>,
) -> AppResult<HttpResponse> {
    let (page, per_page, offset) = PageQuery {
        page: query.page,
        per_page: query.per_page,
    }
    .limits();
    let status = query.final_status.map(|s| s.to_string());

    let (archives, total) =
        archive::list(pool.get_ref(), &auth.actor, status.as_deref(), per_page, offset).await?;
    Ok(paginated("Archives", archives, page, per_page, total))
}

/// Archive every approved or denied request
#[utoipa::path(
    post,
    path = "/api/archives/archive-all",
    responses(
        (status = 200, description = "Counts of archived and failed requests", body = crate::model::archive::ArchiveBatchSummary),
        (status = 403, description = "HR only")
    ),
    tag = "Archive",
    security(("bearer_auth" = []))
)]
pub async fn archive_all(auth: AuthUser, pool: web::Data<MySqlPool>) -> AppResult<HttpResponse> {
    let summary = archive::archive_all_processed(pool.get_ref(), &auth.actor, Utc::now()).await?;
    Ok(ok(&summary.message(), summary))
}

/// Get archive by ID
#[utoipa::path(
    get,
    path = "/api/archives/{archive_id}",
    params(("archive_id", Path, description = "Archive ID")),
    responses(
        (status = 200, description = "Archive", body = crate::model::archive::LeaveArchive),
        (status = 403, description = "Archive of another department"),
        (status = 404, description = "Archive not found")
    ),
    tag = "Archive",
    security(("bearer_auth" = []))
)]
pub async fn get_archive(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let archive = archive::get(pool.get_ref(), &auth.actor, path.into_inner()).await?;
    Ok(ok("Archive", archive))
}

/// Delete archive
#[utoipa::path(
    delete,
    path = "/api/archives/{archive_id}",
    params(("archive_id", Path, description = "Archive ID")),
    responses(
        (status = 200, description = "Archive deleted"),
        (status = 403, description = "HR only"),
        (status = 404, description = "Archive not found")
    ),
    tag = "Archive",
    security(("bearer_auth" = []))
)]
pub async fn delete_archive(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    archive::delete(pool.get_ref(), &auth.actor, path.into_inner()).await?;
    Ok(ok("Archive deleted", Value::Null))
}

/// Download the archive as an "Application for Leave" PDF
#[utoipa::path(
    get,
    path = "/api/archives/{archive_id}/pdf",
    params(("archive_id", Path, description = "Archive ID")),
    responses(
        (status = 200, description = "PDF document", body = String, content_type = "application/pdf"),
        (status = 404, description = "Archive not found")
    ),
    tag = "Archive",
    security(("bearer_auth" = []))
)]
pub async fn archive_pdf(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let archive = archive::get(pool.get_ref(), &auth.actor, path.into_inner()).await?;
    let archive_id = archive.id;

    // layout and font loading are blocking
    let config = config.into_inner();
    let bytes = web::block(move || render_archive_pdf(&archive, &config))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("PDF worker failed: {e}")))??;

    info!(archive_id, size = bytes.len(), "Archive PDF generated");
    Ok(HttpResponse::Ok()
        .content_type("application/pdf")
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(format!(
                "leave_archive_{archive_id}.pdf"
            ))],
        })
        .body(bytes))
}
