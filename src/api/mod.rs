//! REST API module.
//!
//! Public read routes plus the PSK-guarded admin routes.

mod comments;
mod messages;
mod posts;
mod tags;

pub use comments::*;
pub use messages::*;
pub use posts::*;
pub use tags::*;

use axum::{
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::pager::Pager;

/// Success response envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Response type that can be either success or error.
pub type ApiResult<T> = Result<ApiResponse<T>, AppError>;

/// Create a successful API response.
pub fn success<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(ApiResponse {
        success: true,
        data,
    })
}

/// One page of a listing with its pager.
#[derive(Debug, Serialize)]
pub struct Page<T: Serialize> {
    pub items: Vec<T>,
    pub pager: Pager,
}

impl<T: Serialize> Page<T> {
    /// Wrap a listing, turning an out-of-range page into NotFound.
    pub fn checked((items, pager): (Vec<T>, Pager)) -> Result<Self, AppError> {
        if !pager.is_valid {
            return Err(AppError::NotFound("Page not found".to_string()));
        }
        Ok(Self { items, pager })
    }
}

/// `?page=` query; pages start at 1.
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "first_page")]
    pub page: i64,
}

fn first_page() -> i64 {
    1
}

/// Remote address and user agent of the caller, as reported by headers.
pub(crate) fn client_info(headers: &HeaderMap) -> (String, String) {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .unwrap_or("")
            .to_string()
    };

    let forwarded = header("x-forwarded-for");
    let ip = match forwarded.split(',').next().map(str::trim) {
        Some(first) if !first.is_empty() => first.to_string(),
        _ => header("x-real-ip"),
    };
    (ip, header("user-agent"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_client_info_from_headers() {
        let mut headers = HeaderMap::new();
        assert_eq!(client_info(&headers), (String::new(), String::new()));

        headers.insert("x-real-ip", HeaderValue::from_static("10.1.1.1"));
        headers.insert("user-agent", HeaderValue::from_static("curl/8"));
        assert_eq!(client_info(&headers).0, "10.1.1.1");

        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.2"),
        );
        assert_eq!(
            client_info(&headers),
            ("203.0.113.7".to_string(), "curl/8".to_string())
        );
    }

    #[test]
    fn test_out_of_range_page_is_not_found() {
        let pager = Pager::compute(3, 10, 5);
        let err = Page::<i64>::checked((Vec::new(), pager)).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
