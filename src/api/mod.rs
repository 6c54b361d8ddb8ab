pub mod handlers;
pub mod requests;

pub use handlers::{
    handle_delete_duplicates, handle_execute_sync, handle_find_duplicates, handle_merge_venues,
    ApiResponse,
};
pub use requests::{DeleteDuplicatesRequest, MergeVenuesRequest};
