//! Shared constants for end-to-end tests
//!
//! When test data changes (user credentials, limits, etc.), update only this file.

// ============================================================================
// Test User Credentials
// ============================================================================

/// Gabbai test user handle, may edit the board
pub const GABBAI_USER: &str = "gabbai";

/// Gabbai test user password
pub const GABBAI_PASS: &str = "gabbaipass123";

/// Viewer test user handle, read-only
pub const VIEWER_USER: &str = "viewer";

/// Viewer test user password
pub const VIEWER_PASS: &str = "viewerpass123";

// ============================================================================
// Limits
// ============================================================================

/// Upload size limit of the test server, kept small so oversized bodies are cheap
#[allow(dead_code)]
pub const TEST_MAX_UPLOAD_BYTES: usize = 16 * 1024;

// ============================================================================
// Timeouts
// ============================================================================

/// Maximum time to wait for the server to become ready
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Polling interval while waiting for the server
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 20;

/// Timeout of every test request
pub const REQUEST_TIMEOUT_SECS: u64 = 10;
