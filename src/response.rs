use actix_web::HttpResponse;
use serde::Serialize;

/// Uniform `{code, message, data}` envelope used for every JSON response.
#[derive(Serialize, Debug)]
pub struct ApiResponse<T: Serialize> {
    pub code: u16,
    pub message: String,
    pub data: Option<T>,
}

pub fn success<T: Serialize>(data: T) -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse {
        code: 200,
        message: "success".to_string(),
        data: Some(data),
    })
}

/// Success with only an acknowledgement message in `data.message`.
pub fn acknowledged(message: &str) -> HttpResponse {
    success(serde_json::json!({ "message": message }))
}

/// Paged list payload used by the operation log listing.
#[derive(Serialize, Debug, Clone)]
pub struct Page<T: Serialize> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    pub pages: i64,
}

impl<T: Serialize> Page<T> {
    pub fn new(items: Vec<T>, total: i64, page: i64, page_size: i64) -> Self {
        let pages = if page_size > 0 { (total + page_size - 1) / page_size } else { 0 };
        Page { items, total, page, page_size, pages }
    }
}
