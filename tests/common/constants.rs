//! Shared constants for end-to-end tests
//!
//! When test data changes (images, canned replies, timeouts),
//! update only this file.

// ============================================================================
// Test Images
// ============================================================================

/// A 1x1 transparent PNG.
pub const TINY_PNG_BASE64: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

/// Same image as a data URL, the way browsers send it.
pub const TINY_PNG_DATA_URL: &str =
    "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

/// Location prefix the test server reports stored drawings under.
pub const TEST_LOCATION_PREFIX: &str = "s3://oruby-test-bucket";

// ============================================================================
// Canned Model Replies
// ============================================================================

/// Evaluation reply wrapped in prose, as chat models tend to answer.
#[allow(dead_code)]
pub const EVALUATION_REPLY_WITH_PROSE: &str = r#"Here is my evaluation:
{"score": 88, "evaluation": "A lively Oruby with a {sparkling} gem.", "breakdown": {"composition": 85, "complexity": 80, "completeness": 90}}
Hope this helps!"#;

#[allow(dead_code)]
pub const ADVICE_REPLY: &str = r#"{"main_advice": "Make the gem shine", "improvement_tips": ["Add a highlight to the gem", "Round the body a little more"]}"#;

// ============================================================================
// Timeouts
// ============================================================================

/// Maximum time to wait for server to become ready (milliseconds)
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Polling interval when waiting for server readiness (milliseconds)
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 50;

/// Request timeout for HTTP client (seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;
