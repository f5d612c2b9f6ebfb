mod middleware;
mod public;

pub use middleware::{REQUEST_ID_HEADER, RequestContext};
pub use public::{HttpState, build_router, request_origin};
