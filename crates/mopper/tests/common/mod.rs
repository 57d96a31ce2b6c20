#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use mopper::{
    AuditEntry, AuditSink, AuthorizationSource, ContentProvider, Node, ProviderError,
    ProviderResult, SmolStr, User,
};
use tokio::sync::Mutex;

pub const COMMUNITY: &str = "rust";

#[derive(Default)]
pub struct State {
    pub nodes: HashMap<SmolStr, Node>,
    pub children: HashMap<SmolStr, Vec<SmolStr>>,
    /// ("remove" | "lock", id) in completion order
    pub mutations: Vec<(&'static str, SmolStr)>,
    pub fetches: usize,
    /// Mutating calls started but not yet finished, and the highest it got
    pub in_flight: usize,
    pub peak_in_flight: usize,
    pub fail_mutation: HashSet<SmolStr>,
    pub fail_fetch: HashSet<SmolStr>,

    /// `None` makes `current_user` fail
    pub current_user: Option<User>,
    pub moderators: Vec<User>,
    pub scopes: HashMap<SmolStr, Vec<SmolStr>>,
    pub fail_roster: bool,
    pub fail_scopes: bool,
    pub current_user_calls: usize,
    pub roster_calls: usize,
    pub scope_calls: usize,

    pub audit: Vec<AuditEntry>,
    pub fail_audit: bool,
}

/// In-memory stand-in for the platform: content, authorization and mod log
#[derive(Clone, Default)]
pub struct MockPlatform {
    pub state: Arc<Mutex<State>>,
}

impl MockPlatform {
    pub async fn insert(&self, parent: Option<&str>, node: Node) {
        let mut state = self.state.lock().await;
        if let Some(parent) = parent {
            state
                .children
                .entry(parent.into())
                .or_default()
                .push(node.id.clone());
        }
        state.nodes.insert(node.id.clone(), node);
    }

    /// A moderator who is also the current user, holding `scopes`
    pub async fn moderator(&self, id: &str, name: &str, scopes: &[&str]) -> User {
        let user = User::new(id, name);
        let mut state = self.state.lock().await;
        state.current_user = Some(user.clone());
        state.moderators.push(user.clone());
        state
            .scopes
            .insert(id.into(), scopes.iter().map(|s| SmolStr::new(s)).collect());
        user
    }

    pub async fn mutations(&self) -> Vec<(&'static str, SmolStr)> {
        self.state.lock().await.mutations.clone()
    }

    pub async fn removed(&self) -> HashSet<SmolStr> {
        self.state
            .lock()
            .await
            .mutations
            .iter()
            .filter(|(kind, _)| *kind == "remove")
            .map(|(_, id)| id.clone())
            .collect()
    }

    pub async fn lookups(&self) -> usize {
        self.state.lock().await.scope_calls
    }

    async fn mutate(&self, kind: &'static str, id: &str) -> ProviderResult<()> {
        {
            let mut state = self.state.lock().await;
            state.in_flight += 1;
            state.peak_in_flight = state.peak_in_flight.max(state.in_flight);
        }
        tokio::task::yield_now().await;
        let mut state = self.state.lock().await;
        state.in_flight -= 1;
        state.mutations.push((kind, id.into()));
        if state.fail_mutation.contains(id) {
            return Err(ProviderError::rejected(id, "server error"));
        }
        Ok(())
    }
}

#[async_trait]
impl ContentProvider for MockPlatform {
    async fn get_node(&self, id: &str) -> ProviderResult<Node> {
        self.state
            .lock()
            .await
            .nodes
            .get(id)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(id.into()))
    }

    async fn list_children(&self, node: &Node) -> ProviderResult<Vec<Node>> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock().await;
        state.fetches += 1;
        if state.fail_fetch.contains(&node.id) {
            return Err(ProviderError::Unavailable("timed out".into()));
        }
        let ids = state.children.get(&node.id).cloned().unwrap_or_default();
        Ok(ids
            .iter()
            .filter_map(|id| state.nodes.get(id).cloned())
            .collect())
    }

    async fn remove(&self, id: &str) -> ProviderResult<()> {
        self.mutate("remove", id).await
    }

    async fn lock(&self, id: &str) -> ProviderResult<()> {
        self.mutate("lock", id).await
    }
}

#[async_trait]
impl AuthorizationSource for MockPlatform {
    async fn current_user(&self) -> ProviderResult<User> {
        let mut state = self.state.lock().await;
        state.current_user_calls += 1;
        state
            .current_user
            .clone()
            .ok_or_else(|| ProviderError::Unavailable("not a fetchable user".into()))
    }

    async fn moderators(&self, community: &str) -> ProviderResult<Vec<User>> {
        assert_eq!(community, COMMUNITY);
        let mut state = self.state.lock().await;
        state.roster_calls += 1;
        if state.fail_roster {
            return Err(ProviderError::Unavailable("roster down".into()));
        }
        Ok(state.moderators.clone())
    }

    async fn mod_permissions(&self, user: &User, community: &str) -> ProviderResult<Vec<SmolStr>> {
        assert_eq!(community, COMMUNITY);
        let mut state = self.state.lock().await;
        state.scope_calls += 1;
        if state.fail_scopes {
            return Err(ProviderError::Unavailable("permissions down".into()));
        }
        Ok(state.scopes.get(&user.id).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl AuditSink for MockPlatform {
    async fn append(&self, entry: AuditEntry) -> ProviderResult<()> {
        let mut state = self.state.lock().await;
        if state.fail_audit {
            return Err(ProviderError::Unavailable("modlog down".into()));
        }
        state.audit.push(entry);
        Ok(())
    }
}

/// Post `t3_post` with three top-level comments, each with one reply, and
/// one reply nested a level deeper: seven comments in total.
///
/// ```text
/// t3_post
/// ├── t1_a ── t1_a1 ── t1_a1x
/// ├── t1_b ── t1_b1
/// └── t1_c ── t1_c1
/// ```
pub async fn seven_comment_post(platform: &MockPlatform, distinguish_b: bool) {
    platform.insert(None, Node::post("t3_post")).await;
    for top in ["t1_a", "t1_b", "t1_c"] {
        let mut node = Node::comment(top);
        if distinguish_b && top == "t1_b" {
            node = node.distinguished();
        }
        platform.insert(Some("t3_post"), node).await;
        platform
            .insert(Some(top), Node::comment(format!("{top}1")))
            .await;
    }
    platform
        .insert(Some("t1_a1"), Node::comment("t1_a1x"))
        .await;
}
