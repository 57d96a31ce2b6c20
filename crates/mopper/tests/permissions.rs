mod common;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use common::{COMMUNITY, MockPlatform};
use mopper::permissions::cache_key;
use mopper::{
    KvStore, MemoryKvStore, MopOptions, PermissionCache, PermissionDecision, RosterAction, RosterEvent,
    StoreError,
};

fn cache(platform: &MockPlatform, store: Arc<dyn KvStore>) -> PermissionCache {
    PermissionCache::new(Arc::new(platform.clone()), store, COMMUNITY)
}

#[tokio::test]
async fn second_call_is_served_from_cache() {
    let platform = MockPlatform::default();
    platform.moderator("t2_mod", "tidy_mod", &["posts"]).await;
    let store = Arc::new(MemoryKvStore::new());
    let cache = cache(&platform, store.clone());

    assert_eq!(cache.authorize("t2_mod").await, PermissionDecision::Allowed);
    assert_eq!(cache.authorize("t2_mod").await, PermissionDecision::Allowed);
    assert_eq!(platform.lookups().await, 1);

    let entry = store.entry(&cache_key("t2_mod")).await.unwrap();
    assert_eq!(entry.value, "true");
    let ttl = entry.expire_at - Utc::now();
    assert!(ttl > TimeDelta::days(27) && ttl <= TimeDelta::days(28));
}

#[tokio::test]
async fn all_scope_is_allowed_and_others_denied() {
    let platform = MockPlatform::default();
    platform.moderator("t2_all", "root_mod", &["all"]).await;
    let store = Arc::new(MemoryKvStore::new());
    let cache = cache(&platform, store.clone());
    assert_eq!(cache.authorize("t2_all").await, PermissionDecision::Allowed);

    platform
        .moderator("t2_wiki", "wiki_mod", &["wiki", "flair"])
        .await;
    assert_eq!(cache.authorize("t2_wiki").await, PermissionDecision::Denied);
    assert_eq!(cache.authorize("t2_wiki").await, PermissionDecision::Denied);
    assert_eq!(platform.lookups().await, 2);
    assert_eq!(
        store.get(&cache_key("t2_wiki")).await.unwrap().as_deref(),
        Some("false")
    );
}

#[tokio::test]
async fn expired_decisions_are_looked_up_again() {
    let platform = MockPlatform::default();
    platform.moderator("t2_mod", "tidy_mod", &["posts"]).await;
    let cache = cache(&platform, Arc::new(MemoryKvStore::new())).with_ttl(TimeDelta::zero());

    cache.authorize("t2_mod").await;
    cache.authorize("t2_mod").await;

    assert_eq!(platform.lookups().await, 2);
}

#[tokio::test]
async fn ttl_comes_from_options() {
    let platform = MockPlatform::default();
    platform.moderator("t2_mod", "tidy_mod", &["posts"]).await;
    let store = Arc::new(MemoryKvStore::new());
    let options = MopOptions::builder().permission_ttl_days(2).build();
    let cache = cache(&platform, store.clone()).with_options(&options);

    cache.authorize("t2_mod").await;

    let entry = store.entry(&cache_key("t2_mod")).await.unwrap();
    let ttl = entry.expire_at - Utc::now();
    assert!(ttl > TimeDelta::days(1) && ttl <= TimeDelta::days(2));
}

#[tokio::test]
async fn roster_change_forces_a_fresh_lookup() {
    let platform = MockPlatform::default();
    platform.moderator("t2_mod", "tidy_mod", &["posts"]).await;
    let cache = cache(&platform, Arc::new(MemoryKvStore::new()));
    assert_eq!(cache.authorize("t2_mod").await, PermissionDecision::Allowed);

    platform
        .state
        .lock()
        .await
        .scopes
        .insert("t2_mod".into(), vec!["wiki".into()]);
    let handled = cache
        .on_roster_change_event(&RosterEvent::new("removemoderator", "t2_mod"))
        .await;

    assert_eq!(handled, Some(RosterAction::RemoveModerator));
    assert_eq!(cache.authorize("t2_mod").await, PermissionDecision::Denied);
    assert_eq!(platform.lookups().await, 2);
}

#[tokio::test]
async fn unrelated_events_keep_the_cache() {
    let platform = MockPlatform::default();
    platform.moderator("t2_mod", "tidy_mod", &["posts"]).await;
    let cache = cache(&platform, Arc::new(MemoryKvStore::new()));
    cache.authorize("t2_mod").await;

    for event in [
        RosterEvent::new("banuser", "t2_mod"),
        RosterEvent::new("permissions", "t2_other"),
        RosterEvent::default(),
    ] {
        cache.on_roster_change_event(&event).await;
    }
    cache.authorize("t2_mod").await;

    assert_eq!(platform.lookups().await, 1);
}

#[tokio::test]
async fn falls_back_to_the_moderator_roster() {
    let platform = MockPlatform::default();
    platform.moderator("t2_app", "app_account", &["all"]).await;
    platform.state.lock().await.current_user = None;
    let cache = cache(&platform, Arc::new(MemoryKvStore::new()));

    assert_eq!(cache.authorize("t2_app").await, PermissionDecision::Allowed);
    let state = platform.state.lock().await;
    assert_eq!(state.current_user_calls, 1);
    assert_eq!(state.roster_calls, 1);
}

#[tokio::test]
async fn unresolvable_user_is_undetermined_and_not_cached() {
    let platform = MockPlatform::default();
    platform.state.lock().await.fail_roster = true;
    let store = Arc::new(MemoryKvStore::new());
    let cache = cache(&platform, store.clone());

    assert_eq!(
        cache.authorize("t2_ghost").await,
        PermissionDecision::Undetermined
    );
    assert!(store.entry(&cache_key("t2_ghost")).await.is_none());
}

#[tokio::test]
async fn scope_lookup_failure_is_undetermined() {
    let platform = MockPlatform::default();
    platform.moderator("t2_mod", "tidy_mod", &["posts"]).await;
    platform.state.lock().await.fail_scopes = true;
    let store = Arc::new(MemoryKvStore::new());
    let cache = cache(&platform, store.clone());

    assert_eq!(
        cache.authorize("t2_mod").await,
        PermissionDecision::Undetermined
    );
    assert!(store.entry(&cache_key("t2_mod")).await.is_none());
}

#[tokio::test]
async fn empty_user_id_is_undetermined() {
    let platform = MockPlatform::default();
    let cache = cache(&platform, Arc::new(MemoryKvStore::new()));
    assert_eq!(cache.authorize("").await, PermissionDecision::Undetermined);
    assert_eq!(platform.state.lock().await.current_user_calls, 0);
}

#[tokio::test]
async fn garbage_cache_entries_are_replaced() {
    let platform = MockPlatform::default();
    platform.moderator("t2_mod", "tidy_mod", &["posts"]).await;
    let store = Arc::new(MemoryKvStore::new());
    store
        .set(
            &cache_key("t2_mod"),
            "maybe".into(),
            Utc::now() + TimeDelta::days(1),
        )
        .await
        .unwrap();
    let cache = cache(&platform, store.clone());

    assert_eq!(cache.authorize("t2_mod").await, PermissionDecision::Allowed);
    assert_eq!(
        store.get(&cache_key("t2_mod")).await.unwrap().as_deref(),
        Some("true")
    );
}

struct BrokenStore;

#[async_trait]
impl KvStore for BrokenStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Err(StoreError::Other("connection refused".into()))
    }
    async fn set(
        &self,
        _key: &str,
        _value: String,
        _expire_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        Err(StoreError::Other("connection refused".into()))
    }
    async fn delete(&self, _key: &str) -> Result<(), StoreError> {
        Err(StoreError::Other("connection refused".into()))
    }
}

#[tokio::test]
async fn store_failures_never_authorize() {
    let platform = MockPlatform::default();
    platform.moderator("t2_mod", "tidy_mod", &["all"]).await;
    let cache = cache(&platform, Arc::new(BrokenStore));

    assert_eq!(
        cache.authorize("t2_mod").await,
        PermissionDecision::Undetermined
    );
    assert!(cache.invalidate("t2_mod").await.is_err());
    // a failed invalidation is logged, not propagated
    let handled = cache
        .on_roster_change_event(&RosterEvent::new("addmoderator", "t2_mod"))
        .await;
    assert_eq!(handled, Some(RosterAction::AddModerator));
}
