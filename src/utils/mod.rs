pub mod extract;
pub mod pagination;
pub mod response;
pub mod validators;

pub use extract::{ApiPath, ApiQuery, ValidatedJson};
pub use pagination::{PageParams, Paginated, Pagination};
pub use response::ApiResponse;
