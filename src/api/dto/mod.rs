//! API request/response DTOs.

pub mod response;
pub mod urls;

pub use response::{ApiResponse, ListResponse, Meta, PaginationMeta};
pub use urls::{
    BulkDeleteRequest, BulkDeleteResponse, CheckAliasParams, CheckAliasResponse,
    CreateUrlRequest, CreatedUrlResponse, DeleteUrlResponse, ListUrlsParams,
    UpdateExpiryRequest, UpdatedExpiryResponse, UrlInfoResponse, UrlSummary,
};
