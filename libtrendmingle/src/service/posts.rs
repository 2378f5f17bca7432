//! Post service
//!
//! Owns the in-memory post collection. Every change is applied to a copy,
//! written to the store, and only then swapped in, so a failed write leaves
//! the collection untouched.

use std::sync::Arc;
use tokio::sync::RwLock;

use crate::calendar;
use crate::clock::Clock;
use crate::compose::ComposeDraft;
use crate::error::{MingleError, Result};
use crate::scheduling::parse_scheduled_at;
use crate::service::events::{Event, EventBus};
use crate::store::RemoteStore;
use crate::types::{Platform, Post, PostStatus};

#[derive(Clone)]
pub struct PostService {
    posts: Arc<RwLock<Vec<Post>>>,
    store: Arc<dyn RemoteStore>,
    clock: Arc<dyn Clock>,
    events: EventBus,
}

impl PostService {
    pub fn new(store: Arc<dyn RemoteStore>, clock: Arc<dyn Clock>, events: EventBus) -> Self {
        Self {
            posts: Arc::new(RwLock::new(Vec::new())),
            store,
            clock,
            events,
        }
    }

    /// Replace the in-memory collection with what the store holds, keeping
    /// creation order.
    pub async fn restore(&self) -> Result<usize> {
        let stored = self.store.load_posts().await?;
        let count = stored.len();
        *self.posts.write().await = stored;
        tracing::debug!(count, "Restored posts");
        Ok(count)
    }

    /// Create a draft. `scheduled_at` may be absolute, relative ("2h") or
    /// natural language ("tomorrow 10am").
    pub async fn create(&self, title: &str, platform: Platform, scheduled_at: &str) -> Result<Post> {
        let at = parse_scheduled_at(scheduled_at, self.clock.now())?;
        self.insert(vec![Post::draft(title, platform, at)?]).await?
            .pop()
            .ok_or_else(|| MingleError::Validation("no post created".to_string()))
    }

    pub async fn create_idea(&self, title: &str, platform: Platform, scheduled_at: &str) -> Result<Post> {
        let at = parse_scheduled_at(scheduled_at, self.clock.now())?;
        self.insert(vec![Post::idea(title, platform, at)?]).await?
            .pop()
            .ok_or_else(|| MingleError::Validation("no post created".to_string()))
    }

    /// One draft per platform selected in the composer.
    pub async fn create_from_draft(&self, draft: ComposeDraft) -> Result<Vec<Post>> {
        self.insert(draft.into_posts()?).await
    }

    pub async fn promote(&self, id: &str) -> Result<Post> {
        let post = self.transition(id, Post::promote).await?;
        self.events.emit(Event::PostUpdated {
            post_id: post.id().to_string(),
            status: post.status(),
        });
        Ok(post)
    }

    pub async fn schedule(&self, id: &str) -> Result<Post> {
        let post = self.transition(id, Post::schedule).await?;
        tracing::info!(post_id = %post.id(), platform = %post.platform(), at = %post.scheduled_at(), "Post scheduled");
        self.events.emit(Event::PostScheduled {
            post_id: post.id().to_string(),
            platform: post.platform(),
        });
        Ok(post)
    }

    /// Record publication with its engagement count.
    pub async fn mark_posted(&self, id: &str, engagement: i64) -> Result<Post> {
        let post = self
            .transition(id, |post| post.mark_posted(engagement))
            .await?;
        let engagement = post.engagement().unwrap_or_default();
        tracing::info!(post_id = %post.id(), platform = %post.platform(), engagement, "Post published");
        self.events.emit(Event::PostPublished {
            post_id: post.id().to_string(),
            platform: post.platform(),
            engagement,
        });
        Ok(post)
    }

    pub async fn retitle(&self, id: &str, title: &str) -> Result<Post> {
        let post = self.transition(id, |post| post.retitle(title)).await?;
        self.events.emit(Event::PostUpdated {
            post_id: post.id().to_string(),
            status: post.status(),
        });
        Ok(post)
    }

    pub async fn reschedule(&self, id: &str, scheduled_at: &str) -> Result<Post> {
        let at = parse_scheduled_at(scheduled_at, self.clock.now())?;
        let post = self.transition(id, |post| post.reschedule(at)).await?;
        self.events.emit(Event::PostUpdated {
            post_id: post.id().to_string(),
            status: post.status(),
        });
        Ok(post)
    }

    /// Remove a post that has not been published.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let mut posts = self.posts.write().await;
        let index = position(&posts, id)?;
        posts[index].ensure_deletable()?;

        self.store.remove_post(id).await?;
        let removed = posts.remove(index);
        drop(posts);

        tracing::debug!(post_id = %removed.id(), "Post deleted");
        self.events.emit(Event::PostDeleted {
            post_id: removed.id().to_string(),
        });
        Ok(())
    }

    pub async fn get(&self, id: &str) -> Result<Post> {
        let posts = self.posts.read().await;
        let index = position(&posts, id)?;
        Ok(posts[index].clone())
    }

    /// Every post, in the order they were added.
    pub async fn list(&self) -> Vec<Post> {
        self.posts.read().await.clone()
    }

    pub async fn list_by_status(&self, status: PostStatus) -> Vec<Post> {
        self.posts
            .read()
            .await
            .iter()
            .filter(|post| post.status() == status)
            .cloned()
            .collect()
    }

    /// Unpublished posts, soonest first.
    pub async fn upcoming(&self) -> Vec<Post> {
        let posts = self.posts.read().await;
        calendar::upcoming(posts.iter(), self.clock.now())
            .into_iter()
            .map(|row| row.post.clone())
            .collect()
    }

    async fn insert(&self, created: Vec<Post>) -> Result<Vec<Post>> {
        let mut posts = self.posts.write().await;
        for (written, post) in created.iter().enumerate() {
            if let Err(error) = self.store.save_post(post).await {
                self.discard(&created[..written]).await;
                return Err(error);
            }
        }
        posts.extend(created.iter().cloned());
        drop(posts);

        for post in &created {
            tracing::debug!(post_id = %post.id(), platform = %post.platform(), status = %post.status(), "Post created");
            self.events.emit(Event::PostCreated {
                post_id: post.id().to_string(),
                platform: post.platform(),
                status: post.status(),
                scheduled_at: post.scheduled_at(),
            });
        }
        Ok(created)
    }

    /// Remove posts written before a later write in the same batch failed.
    async fn discard(&self, written: &[Post]) {
        for post in written {
            if let Err(error) = self.store.remove_post(post.id()).await {
                tracing::warn!(post_id = %post.id(), %error, "Could not roll back partially created post");
            }
        }
    }

    async fn transition<F>(&self, id: &str, apply: F) -> Result<Post>
    where
        F: FnOnce(&mut Post) -> Result<()> + Send,
    {
        let mut posts = self.posts.write().await;
        let index = position(&posts, id)?;

        let mut next = posts[index].clone();
        apply(&mut next)?;
        self.store.save_post(&next).await?;

        tracing::debug!(post_id = %next.id(), from = %posts[index].status(), to = %next.status(), "Post updated");
        posts[index] = next.clone();
        Ok(next)
    }
}

fn position(posts: &[Post], id: &str) -> Result<usize> {
    posts
        .iter()
        .position(|post| post.id() == id)
        .ok_or_else(|| MingleError::not_found("Post", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::SocialAccount;
    use crate::clock::ManualClock;
    use crate::error::StoreError;
    use crate::store::{MemoryStore, Profile, Trend};
    use async_trait::async_trait;
    use chrono::{NaiveDate, NaiveDateTime};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Memory store whose post writes fail once `allowed` of them succeeded.
    struct FailingPostWrites {
        inner: MemoryStore,
        allowed: AtomicUsize,
    }

    #[async_trait]
    impl RemoteStore for FailingPostWrites {
        async fn get_profile(&self, id: &str) -> Result<Option<Profile>> {
            self.inner.get_profile(id).await
        }

        async fn upsert_profile(&self, profile: &Profile) -> Result<()> {
            self.inner.upsert_profile(profile).await
        }

        async fn list_trends(&self) -> Result<Vec<Trend>> {
            self.inner.list_trends().await
        }

        async fn get_trend(&self, id: &str) -> Result<Option<Trend>> {
            self.inner.get_trend(id).await
        }

        async fn save_trend(&self, trend: &Trend) -> Result<()> {
            self.inner.save_trend(trend).await
        }

        async fn delete_trend(&self, id: &str) -> Result<bool> {
            self.inner.delete_trend(id).await
        }

        async fn like_trend(&self, id: &str) -> Result<i64> {
            self.inner.like_trend(id).await
        }

        async fn save_post(&self, post: &Post) -> Result<()> {
            let exhausted = self
                .allowed
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_err();
            if exhausted {
                return Err(StoreError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "disk full",
                ))
                .into());
            }
            self.inner.save_post(post).await
        }

        async fn remove_post(&self, id: &str) -> Result<()> {
            self.inner.remove_post(id).await
        }

        async fn load_posts(&self) -> Result<Vec<Post>> {
            self.inner.load_posts().await
        }

        async fn save_account(&self, account: &SocialAccount) -> Result<()> {
            self.inner.save_account(account).await
        }

        async fn load_accounts(&self) -> Result<Vec<SocialAccount>> {
            self.inner.load_accounts().await
        }
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 10)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    fn service() -> (PostService, MemoryStore, EventBus) {
        let store = MemoryStore::new();
        let events = EventBus::new(32);
        let service = PostService::new(
            Arc::new(store.clone()),
            Arc::new(ManualClock::new(now())),
            events.clone(),
        );
        (service, store, events)
    }

    #[tokio::test]
    async fn test_launch_lifecycle() {
        let (service, store, _) = service();
        let post = service
            .create("Launch", Platform::Instagram, "2024-03-10T14:30")
            .await
            .unwrap();
        assert_eq!(post.status(), PostStatus::Draft);

        service.schedule(post.id()).await.unwrap();
        let posted = service.mark_posted(post.id(), 50).await.unwrap();
        assert_eq!(posted.status(), PostStatus::Posted);
        assert_eq!(posted.engagement(), Some(50));

        assert!(matches!(
            service.schedule(post.id()).await,
            Err(MingleError::InvalidTransition { .. })
        ));
        assert_eq!(store.load_posts().await.unwrap(), vec![posted]);
    }

    #[tokio::test]
    async fn test_rejected_transition_changes_nothing() {
        let (service, store, _) = service();
        let post = service
            .create("Teaser", Platform::Twitter, "tomorrow")
            .await
            .unwrap();
        assert_eq!(post.date_key(), NaiveDate::from_ymd_opt(2024, 3, 11).unwrap());

        assert!(service.mark_posted(post.id(), 5).await.is_err());
        service.schedule(post.id()).await.unwrap();
        assert!(matches!(
            service.mark_posted(post.id(), -1).await,
            Err(MingleError::Validation(_))
        ));

        let current = service.get(post.id()).await.unwrap();
        assert_eq!(current.status(), PostStatus::Scheduled);
        assert_eq!(current.engagement(), None);
        assert_eq!(store.load_posts().await.unwrap(), vec![current]);
    }

    #[tokio::test]
    async fn test_delete_rules() {
        let (service, store, events) = service();
        let mut receiver = events.subscribe();

        let draft = service.create("Draft", Platform::Linkedin, "2h").await.unwrap();
        service.delete(draft.id()).await.unwrap();
        assert!(matches!(
            service.get(draft.id()).await,
            Err(MingleError::NotFound { .. })
        ));

        let done = service.create("Done", Platform::Linkedin, "1h").await.unwrap();
        service.schedule(done.id()).await.unwrap();
        service.mark_posted(done.id(), 3).await.unwrap();
        assert!(matches!(
            service.delete(done.id()).await,
            Err(MingleError::InvalidTransition { .. })
        ));
        assert_eq!(store.load_posts().await.unwrap().len(), 1);

        let mut kinds = Vec::new();
        while let Ok(event) = receiver.try_recv() {
            kinds.push(event);
        }
        assert!(kinds.contains(&Event::PostDeleted {
            post_id: draft.id().to_string()
        }));
    }

    #[tokio::test]
    async fn test_ideas_promote_then_schedule() {
        let (service, _, _) = service();
        let idea = service
            .create_idea("Behind the scenes", Platform::Tiktok, "2024-03-12 10:00")
            .await
            .unwrap();
        assert_eq!(idea.status(), PostStatus::Idea);
        assert!(service.schedule(idea.id()).await.is_err());

        service.promote(idea.id()).await.unwrap();
        let scheduled = service.schedule(idea.id()).await.unwrap();
        assert_eq!(scheduled.status(), PostStatus::Scheduled);
        assert_eq!(service.list_by_status(PostStatus::Scheduled).await.len(), 1);
    }

    #[tokio::test]
    async fn test_edits_locked_after_publish() {
        let (service, _, _) = service();
        let post = service.create("Old", Platform::Twitter, "3h").await.unwrap();
        service.retitle(post.id(), "New").await.unwrap();
        let moved = service.reschedule(post.id(), "2024-03-15 09:00").await.unwrap();
        assert_eq!(moved.title(), "New");
        assert_eq!(moved.date_key(), NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());

        service.schedule(post.id()).await.unwrap();
        service.mark_posted(post.id(), 1).await.unwrap();
        assert!(service.retitle(post.id(), "Newer").await.is_err());
        assert!(service.reschedule(post.id(), "1h").await.is_err());
        assert_eq!(service.get(post.id()).await.unwrap().title(), "New");
    }

    #[tokio::test]
    async fn test_upcoming_and_restore() {
        let (service, store, events) = service();
        let late = service.create("Late", Platform::Twitter, "5h").await.unwrap();
        let early = service.create("Early", Platform::Twitter, "1h").await.unwrap();
        let gone = service.create("Gone", Platform::Twitter, "2h").await.unwrap();
        service.schedule(gone.id()).await.unwrap();
        service.mark_posted(gone.id(), 9).await.unwrap();

        let ids: Vec<String> = service
            .upcoming()
            .await
            .iter()
            .map(|p| p.id().to_string())
            .collect();
        assert_eq!(ids, vec![early.id().to_string(), late.id().to_string()]);

        let reopened = PostService::new(
            Arc::new(store),
            Arc::new(ManualClock::new(now())),
            events,
        );
        assert_eq!(reopened.restore().await.unwrap(), 3);
        assert_eq!(reopened.upcoming().await.len(), 2);
    }

    #[tokio::test]
    async fn test_create_from_draft() {
        let (service, _, _) = service();
        let mut draft = ComposeDraft::new(NaiveDate::from_ymd_opt(2024, 3, 12).unwrap());
        draft.content = "Weekly tips".to_string();
        draft.toggle_platform(Platform::Instagram);
        draft.toggle_platform(Platform::Linkedin);

        let created = service.create_from_draft(draft).await.unwrap();
        assert_eq!(created.len(), 2);
        assert_eq!(service.list().await.len(), 2);
    }

    #[tokio::test]
    async fn test_failed_batch_write_leaves_store_and_memory_empty() {
        let inner = MemoryStore::new();
        let service = PostService::new(
            Arc::new(FailingPostWrites {
                inner: inner.clone(),
                allowed: AtomicUsize::new(1),
            }),
            Arc::new(ManualClock::new(now())),
            EventBus::new(8),
        );

        let mut draft = ComposeDraft::new(NaiveDate::from_ymd_opt(2024, 3, 12).unwrap());
        draft.content = "Weekly tips".to_string();
        draft.toggle_platform(Platform::Twitter);
        draft.toggle_platform(Platform::Instagram);

        let err = service.create_from_draft(draft).await.unwrap_err();
        assert!(err.is_recoverable());
        assert!(service.list().await.is_empty());
        assert!(inner.load_posts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_restore_keeps_creation_order_for_ties() {
        let (service, store, events) = service();
        let mut created = Vec::new();
        for title in ["First", "Second", "Third"] {
            let post = service
                .create(title, Platform::Instagram, "2024-03-12 10:00")
                .await
                .unwrap();
            created.push(post.id().to_string());
        }
        let earlier = service
            .create("Earlier", Platform::Instagram, "2024-03-11 10:00")
            .await
            .unwrap();
        service.retitle(&created[0], "First, edited").await.unwrap();

        let reopened = PostService::new(
            Arc::new(store),
            Arc::new(ManualClock::new(now())),
            events,
        );
        reopened.restore().await.unwrap();

        let listed: Vec<String> = reopened
            .list()
            .await
            .iter()
            .map(|p| p.id().to_string())
            .collect();
        let mut expected = created.clone();
        expected.push(earlier.id().to_string());
        assert_eq!(listed, expected);

        let upcoming: Vec<String> = reopened
            .upcoming()
            .await
            .iter()
            .map(|p| p.id().to_string())
            .collect();
        let mut expected = vec![earlier.id().to_string()];
        expected.extend(created);
        assert_eq!(upcoming, expected);
    }

    #[tokio::test]
    async fn test_composed_body_is_stored() {
        let (service, store, _) = service();
        let mut draft = ComposeDraft::new(NaiveDate::from_ymd_opt(2024, 3, 12).unwrap());
        draft.content = "Weekly tips\nFive ideas inside".to_string();
        draft.add_hashtag("tips");
        draft.toggle_platform(Platform::Linkedin);

        service.create_from_draft(draft).await.unwrap();
        let stored = store.load_posts().await.unwrap();
        assert_eq!(stored[0].title(), "Weekly tips");
        assert_eq!(stored[0].body(), "Weekly tips\nFive ideas inside\n\n#tips");
    }

    #[tokio::test]
    async fn test_invalid_input_is_validation_error() {
        let (service, _, _) = service();
        assert!(matches!(
            service.create("", Platform::Twitter, "1h").await,
            Err(MingleError::Validation(_))
        ));
        assert!(matches!(
            service.create("Hi", Platform::Twitter, "someday maybe").await,
            Err(MingleError::Validation(_))
        ));
        assert!(service.list().await.is_empty());
    }
}
