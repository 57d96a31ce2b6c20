use bon::Builder;
use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Default number of nodes actioned per wave
pub const DEFAULT_CHUNK_SIZE: usize = 30;
/// Default cap on outstanding child-list fetches during collection
pub const DEFAULT_FETCH_CONCURRENCY: usize = 16;
/// Default lifetime of a cached permission decision
pub const DEFAULT_PERMISSION_TTL_DAYS: u32 = 28;

/// Tuning knobs for a mopper instance
///
/// ```
/// use mopper_common::options::MopOptions;
///
/// let opts = MopOptions::builder().chunk_size(10).build();
/// assert_eq!(opts.chunk_size(), 10);
/// assert_eq!(opts.fetch_concurrency(), 16);
///
/// let opts = MopOptions::from_json(r#"{"lock_post_instead": true}"#).unwrap();
/// assert!(opts.lock_post_instead);
/// assert_eq!(opts.chunk_size(), 30);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Builder)]
#[serde(default)]
pub struct MopOptions {
    /// Nodes per action wave. Also the ceiling on concurrent mutating calls.
    #[builder(default = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,
    /// Ceiling on concurrent child-list fetches while collecting
    #[builder(default = DEFAULT_FETCH_CONCURRENCY)]
    pub fetch_concurrency: usize,
    /// Days a permission decision stays cached
    #[builder(default = DEFAULT_PERMISSION_TTL_DAYS)]
    pub permission_ttl_days: u32,
    /// When only lock is requested on a post, lock the post itself instead of
    /// every comment under it
    #[builder(default)]
    pub lock_post_instead: bool,
    /// `details` field written to audit entries
    #[builder(default = SmolStr::new_static("comment-mop app"))]
    pub audit_details: SmolStr,
}

impl Default for MopOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl MopOptions {
    /// Parse options from JSON, filling unspecified fields with defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Effective chunk size, never zero
    pub fn chunk_size(&self) -> usize {
        self.chunk_size.max(1)
    }

    /// Effective fetch concurrency, never zero
    pub fn fetch_concurrency(&self) -> usize {
        self.fetch_concurrency.max(1)
    }

    /// Permission cache lifetime
    pub fn permission_ttl(&self) -> TimeDelta {
        TimeDelta::days(i64::from(self.permission_ttl_days))
    }
}
