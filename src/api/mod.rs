pub mod archive;
pub mod dashboard;
pub mod dean;
pub mod department;
pub mod employee;
pub mod kiosk;
pub mod leave_report;
pub mod leave_request;
pub mod position;
pub mod user;

use actix_web::{HttpResponse, http::StatusCode};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Serialize)]
struct Envelope<'a, T> {
    success: bool,
    message: &'a str,
    data: T,
}

/// `{"success": true, "message": …, "data": …}` with the given status.
pub fn respond<T: Serialize>(status: StatusCode, message: &str, data: T) -> HttpResponse {
    HttpResponse::build(status).json(Envelope {
        success: true,
        message,
        data,
    })
}

pub fn ok<T: Serialize>(message: &str, data: T) -> HttpResponse {
    respond(StatusCode::OK, message, data)
}

pub fn created<T: Serialize>(message: &str, data: T) -> HttpResponse {
    respond(StatusCode::CREATED, message, data)
}

#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct PageQuery {
    /// Pagination page number (starts at 1)
    #[schema(example = 1)]
    pub page: Option<u32>,
    /// Items per page (max 100)
    #[schema(example = 20)]
    pub per_page: Option<u32>,
}

impl PageQuery {
    /// `(page, per_page, offset)`
    pub fn limits(&self) -> (u32, u32, u32) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self.per_page.unwrap_or(20).clamp(1, 100);
        (page, per_page, (page - 1).saturating_mul(per_page))
    }
}

#[derive(Serialize)]
struct PageEnvelope<'a, T> {
    success: bool,
    message: &'a str,
    data: Vec<T>,
    page: u32,
    per_page: u32,
    total: i64,
}

/// Envelope plus the pagination fields next to `data`.
pub fn paginated<T: Serialize>(
    message: &str,
    data: Vec<T>,
    page: u32,
    per_page: u32,
    total: i64,
) -> HttpResponse {
    HttpResponse::Ok().json(PageEnvelope {
        success: true,
        message,
        data,
        page,
        per_page,
        total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;
    use serde_json::{Value, json};

    #[test]
    fn page_limits_are_clamped() {
        assert_eq!(PageQuery::default().limits(), (1, 20, 0));
        assert_eq!(PageQuery { page: Some(0), per_page: Some(500) }.limits(), (1, 100, 0));
        assert_eq!(PageQuery { page: Some(3), per_page: Some(10) }.limits(), (3, 10, 20));
    }

    #[test]
    fn huge_page_saturates_the_offset() {
        let query = PageQuery { page: Some(u32::MAX), per_page: Some(100) };
        assert_eq!(query.limits(), (u32::MAX, 100, u32::MAX));
    }

    #[actix_web::test]
    async fn success_envelope_shape() {
        let resp = created("Leave application submitted", json!({ "remaining_days": 10 }));
        assert_eq!(resp.status(), StatusCode::CREATED);

        let body = to_bytes(resp.into_body()).await.unwrap();
        let value: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["message"], "Leave application submitted");
        assert_eq!(value["data"]["remaining_days"], 10);
    }

    #[actix_web::test]
    async fn paginated_envelope_shape() {
        let resp = paginated("Employees", vec![1, 2], 2, 2, 5);
        let body = to_bytes(resp.into_body()).await.unwrap();
        let value: Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(value["data"], json!([1, 2]));
        assert_eq!(value["page"], 2);
        assert_eq!(value["total"], 5);
    }
}
