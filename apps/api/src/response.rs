//! Response envelope shared by every endpoint.
//!
//! ```json
//! { "success": true, "data": { ... }, "message": "Category created" }
//! ```
//!
//! Listings put their rows under a resource-named key next to the
//! pagination block:
//!
//! ```json
//! { "success": true,
//!   "data": { "categories": [ ... ],
//!             "pagination": { "currentPage": 1, "totalPages": 3,
//!                             "totalItems": 27, "itemsPerPage": 10 } } }
//! ```

use axum::extract::FromRequest;
use axum::http::StatusCode;
use axum::Json;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use stockroom_core::{PageRequest, Pagination};

use crate::error::ApiError;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// 200 with data.
pub fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        data: Some(data),
        message: None,
    })
}

/// 200 with data and a message.
pub fn ok_with_message<T: Serialize>(data: T, message: impl Into<String>) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        data: Some(data),
        message: Some(message.into()),
    })
}

/// 200 with only a message.
pub fn message(message: impl Into<String>) -> Json<ApiResponse<()>> {
    Json(ApiResponse {
        success: true,
        data: None,
        message: Some(message.into()),
    })
}

/// 201 with data and a message.
pub fn created<T: Serialize>(
    data: T,
    message: impl Into<String>,
) -> (StatusCode, Json<ApiResponse<T>>) {
    (StatusCode::CREATED, ok_with_message(data, message))
}

// =============================================================================
// Pagination
// =============================================================================

/// `?page=&limit=` query parameters.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl PageQuery {
    pub fn request(&self) -> PageRequest {
        PageRequest::new(self.page, self.limit)
    }
}

/// One page of rows under a resource-named key.
#[derive(Debug)]
pub struct Page<T> {
    key: &'static str,
    rows: Vec<T>,
    pagination: Pagination,
}

impl<T> Page<T> {
    pub fn new(key: &'static str, rows: Vec<T>, request: PageRequest, total: u64) -> Self {
        Page {
            key,
            rows,
            pagination: Pagination::new(request, total),
        }
    }
}

impl<T: Serialize> Serialize for Page<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry(self.key, &self.rows)?;
        map.serialize_entry("pagination", &self.pagination)?;
        map.end()
    }
}

// =============================================================================
// Request body
// =============================================================================

/// `Json` whose rejection renders the error envelope.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_serializes_under_key() {
        let page = Page::new("stores", vec!["a", "b"], PageRequest::new(Some(1), Some(2)), 5);
        let value = serde_json::to_value(&page).unwrap();
        assert_eq!(value["stores"], serde_json::json!(["a", "b"]));
        assert_eq!(value["pagination"]["totalPages"], 3);
        assert_eq!(value["pagination"]["itemsPerPage"], 2);
    }

    #[test]
    fn test_envelope_skips_empty_fields() {
        let value = serde_json::to_value(message("Logged out").0).unwrap();
        assert_eq!(value, serde_json::json!({"success": true, "message": "Logged out"}));
    }
}
