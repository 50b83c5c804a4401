//! Trackable resolver (spec §4.9): pure orchestration over external
//! git-metadata repositories. No concrete git implementation is in scope —
//! `BranchRepository` and `CommitGraph` are the external collaborators'
//! contracts only.

use async_trait::async_trait;

use crate::errors::AppResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefType {
    Branch,
    Tag,
    CommitSha,
}

#[derive(Debug, Clone)]
pub struct Trackable {
    pub ref_type: RefType,
    pub identifier: String,
    pub repo_id: i64,
}

/// Resolves a branch or tag name to its head commit SHA.
#[async_trait]
pub trait BranchRepository: Send + Sync {
    async fn head_commit(&self, repo_id: i64, ref_type: RefType, identifier: &str) -> AppResult<String>;
}

/// Walks parent links in a commit's history.
#[async_trait]
pub trait CommitGraph: Send + Sync {
    async fn parents(&self, repo_id: i64, commit_sha: &str) -> AppResult<Vec<String>>;
}

pub struct TrackableResolver {
    branches: std::sync::Arc<dyn BranchRepository>,
    commits: std::sync::Arc<dyn CommitGraph>,
}

impl TrackableResolver {
    pub fn new(
        branches: std::sync::Arc<dyn BranchRepository>,
        commits: std::sync::Arc<dyn CommitGraph>,
    ) -> Self {
        Self { branches, commits }
    }

    /// Resolves `trackable` to an ordered, newest-first list of commit SHAs,
    /// walking parent links up to `limit` entries. Never mutates anything.
    pub async fn resolve(&self, trackable: &Trackable, limit: usize) -> AppResult<Vec<String>> {
        let head = match trackable.ref_type {
            RefType::CommitSha => trackable.identifier.clone(),
            RefType::Branch | RefType::Tag => {
                self.branches
                    .head_commit(trackable.repo_id, trackable.ref_type, &trackable.identifier)
                    .await?
            }
        };

        if trackable.ref_type == RefType::CommitSha {
            return Ok(vec![head]);
        }

        let mut chain = vec![head.clone()];
        let mut current = head;
        while chain.len() < limit {
            let parents = self.commits.parents(trackable.repo_id, &current).await?;
            let Some(parent) = parents.into_iter().next() else {
                break;
            };
            chain.push(parent.clone());
            current = parent;
        }
        Ok(chain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct StaticBranches(HashMap<(i64, String), String>);

    #[async_trait]
    impl BranchRepository for StaticBranches {
        async fn head_commit(&self, repo_id: i64, _ref_type: RefType, identifier: &str) -> AppResult<String> {
            Ok(self.0.get(&(repo_id, identifier.to_string())).cloned().unwrap())
        }
    }

    struct LinearGraph(HashMap<String, Vec<String>>);

    #[async_trait]
    impl CommitGraph for LinearGraph {
        async fn parents(&self, _repo_id: i64, commit_sha: &str) -> AppResult<Vec<String>> {
            Ok(self.0.get(commit_sha).cloned().unwrap_or_default())
        }
    }

    #[tokio::test]
    async fn commit_sha_trackable_resolves_to_singleton() {
        let branches = StaticBranches(HashMap::new());
        let commits = LinearGraph(HashMap::new());
        let resolver = TrackableResolver::new(std::sync::Arc::new(branches), std::sync::Arc::new(commits));

        let trackable = Trackable {
            ref_type: RefType::CommitSha,
            identifier: "abc".into(),
            repo_id: 1,
        };
        let result = resolver.resolve(&trackable, 10).await.unwrap();
        assert_eq!(result, vec!["abc".to_string()]);
    }

    #[tokio::test]
    async fn branch_trackable_walks_history_to_limit() {
        let mut heads = HashMap::new();
        heads.insert((1, "main".to_string()), "c3".to_string());
        let branches = StaticBranches(heads);

        let mut parents = HashMap::new();
        parents.insert("c3".to_string(), vec!["c2".to_string()]);
        parents.insert("c2".to_string(), vec!["c1".to_string()]);
        parents.insert("c1".to_string(), vec![]);
        let commits = LinearGraph(parents);

        let resolver = TrackableResolver::new(std::sync::Arc::new(branches), std::sync::Arc::new(commits));
        let trackable = Trackable {
            ref_type: RefType::Branch,
            identifier: "main".into(),
            repo_id: 1,
        };

        let result = resolver.resolve(&trackable, 2).await.unwrap();
        assert_eq!(result, vec!["c3".to_string(), "c2".to_string()]);
    }
}
