pub mod github;

use async_trait::async_trait;

use crate::error::Result;

#[async_trait]
pub trait Platform: Send + Sync {
    /// Post a comment on an issue or PR.
    async fn post_comment(
        &self,
        repo_full_name: &str,
        issue_number: u64,
        body: &str,
    ) -> Result<()>;
}
