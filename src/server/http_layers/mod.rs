mod random_slowdown;
mod rate_limit;
mod requests_logging;

#[cfg(feature = "slowdown")]
pub use random_slowdown::slowdown_request;
pub use rate_limit::{with_login_rate_limit, IpKeyExtractor, LOGIN_PER_MINUTE};
pub use requests_logging::{log_requests, RequestsLoggingLevel};
