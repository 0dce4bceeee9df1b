use chrono::Utc;
use tracing::{debug, info};

use super::codec::{PLAYLISTS_KEY, VIDEOS_KEY};
use super::error::{CatalogResult, ValidationError};
use super::model::*;
use super::Catalog;
use crate::util::generate_id;

impl Catalog {
    pub async fn videos(&self) -> CatalogResult<Vec<Video>> {
        Ok(self.load_videos().await?.into_items())
    }

    pub async fn video(&self, id: &str) -> CatalogResult<Option<Video>> {
        let videos = self.load_videos().await?.into_items();
        Ok(videos.into_iter().find(|v| v.id == id))
    }

    pub async fn favorite_videos(&self) -> CatalogResult<Vec<Video>> {
        let videos = self.load_videos().await?.into_items();
        Ok(videos.into_iter().filter(|v| v.favorite).collect())
    }

    /// Watched videos, most recent first.
    pub async fn recently_watched(&self, limit: usize) -> CatalogResult<Vec<Video>> {
        let mut videos: Vec<Video> = self
            .load_videos()
            .await?
            .into_items()
            .into_iter()
            .filter(|v| v.last_watched.is_some())
            .collect();
        videos.sort_by(|a, b| b.last_watched.cmp(&a.last_watched));
        videos.truncate(limit);
        Ok(videos)
    }

    pub async fn videos_in_category(&self, category_id: &str) -> CatalogResult<Vec<Video>> {
        let videos = self.load_videos().await?.into_items();
        Ok(videos
            .into_iter()
            .filter(|v| v.category == category_id)
            .collect())
    }

    /// Store a new video under a freshly generated id.
    pub async fn add_video(&self, new: NewVideo) -> CatalogResult<Video> {
        let title = new.title.trim().to_string();
        if title.is_empty() {
            return Err(ValidationError::EmptyTitle.into());
        }

        let _guard = self.write_lock.lock().await;
        self.check_category(&new.category).await?;

        let video = Video {
            id: generate_id(),
            title,
            url: new.url,
            category: new.category,
            thumbnail: new.thumbnail,
            description: new.description,
            favorite: new.favorite,
            created_at: Utc::now(),
            video_type: new.video_type,
            last_watched: None,
            comments: Vec::new(),
            extra: Default::default(),
        };

        let mut videos = self.load_videos().await?;
        videos.push(video.clone());
        self.commit(&[(VIDEOS_KEY, videos.encode()?)]).await?;

        info!("Added video {} ({})", video.title, video.id);
        Ok(video)
    }

    /// Store a complete record as given, e.g. one taken from an earlier
    /// snapshot. Returns false, without writing, if the id is taken.
    pub async fn insert_video(&self, video: Video) -> CatalogResult<bool> {
        if video.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle.into());
        }

        let _guard = self.write_lock.lock().await;
        let mut videos = self.load_videos().await?;
        if videos.holds_id(&video.id, |v| v.id.as_str()) {
            debug!("Video {} already exists, not inserting", video.id);
            return Ok(false);
        }
        self.check_category(&video.category).await?;

        info!("Inserted video {} ({})", video.title, video.id);
        videos.push(video);
        self.commit(&[(VIDEOS_KEY, videos.encode()?)]).await?;
        Ok(true)
    }

    /// Replace the stored record with the same id. An unknown id is not an
    /// error: nothing is written and `None` is returned.
    pub async fn update_video(&self, video: Video) -> CatalogResult<Option<Video>> {
        let _guard = self.write_lock.lock().await;
        let mut videos = self.load_videos().await?;
        let Some(index) = videos.iter().position(|v| v.id == video.id) else {
            debug!("Video {} not found, update ignored", video.id);
            return Ok(None);
        };

        if video.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle.into());
        }
        self.check_category(&video.category).await?;

        videos[index] = video.clone();
        self.commit(&[(VIDEOS_KEY, videos.encode()?)]).await?;
        Ok(Some(video))
    }

    /// Delete a video and drop it from every playlist, in one write.
    pub async fn delete_video(&self, id: &str) -> CatalogResult<bool> {
        let _guard = self.write_lock.lock().await;
        let mut videos = self.load_videos().await?;
        let before = videos.len();
        videos.retain(|v| v.id != id);
        if videos.len() == before {
            return Ok(false);
        }

        let mut playlists = self.load_playlists().await?;
        let mut touched = 0;
        for playlist in playlists.iter_mut() {
            let len = playlist.video_ids.len();
            playlist.video_ids.retain(|v| v != id);
            if playlist.video_ids.len() != len {
                touched += 1;
            }
        }

        let mut entries = vec![(VIDEOS_KEY, videos.encode()?)];
        if touched > 0 {
            entries.push((PLAYLISTS_KEY, playlists.encode()?));
        }
        self.commit(&entries).await?;

        info!("Deleted video {}, removed from {} playlists", id, touched);
        Ok(true)
    }

    pub async fn toggle_favorite(&self, id: &str) -> CatalogResult<Option<Video>> {
        self.modify_video(id, |video| video.favorite = !video.favorite)
            .await
    }

    /// Record that the video was just watched.
    pub async fn mark_watched(&self, id: &str) -> CatalogResult<Option<Video>> {
        let now = Utc::now();
        self.modify_video(id, |video| video.last_watched = Some(now))
            .await
    }

    pub async fn add_comment(&self, video_id: &str, new: NewComment) -> CatalogResult<Option<Video>> {
        let text = new.text.trim().to_string();
        if text.is_empty() {
            return Err(ValidationError::EmptyComment.into());
        }

        let comment = Comment {
            id: generate_id(),
            text,
            username: new.username.trim().to_string(),
            created_at: Utc::now(),
            extra: Default::default(),
        };
        self.modify_video(video_id, |video| video.comments.push(comment))
            .await
    }

    async fn modify_video<F>(&self, id: &str, f: F) -> CatalogResult<Option<Video>>
    where
        F: FnOnce(&mut Video),
    {
        let _guard = self.write_lock.lock().await;
        let mut videos = self.load_videos().await?;
        let updated = match videos.iter_mut().find(|v| v.id == id) {
            Some(video) => {
                f(video);
                video.clone()
            }
            None => return Ok(None),
        };

        self.commit(&[(VIDEOS_KEY, videos.encode()?)]).await?;
        Ok(Some(updated))
    }

    async fn check_category(&self, category_id: &str) -> CatalogResult<()> {
        let categories = self.load_categories().await?;
        if categories.iter().any(|c| c.id == category_id) {
            Ok(())
        } else {
            Err(ValidationError::UnknownCategory(category_id.to_string()).into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::catalog::CatalogError;
    use crate::db::KvStore;

    #[tokio::test]
    async fn test_add_then_list() {
        let (catalog, _store) = open_empty().await;
        let video = catalog
            .add_video(new_video("v1", "aptitude"))
            .await
            .unwrap();

        let all = catalog.videos().await.unwrap();
        assert_eq!(all, vec![video.clone()]);
        assert_eq!(catalog.video(&video.id).await.unwrap(), Some(video));
    }

    #[tokio::test]
    async fn test_add_generates_distinct_ids() {
        let (catalog, _store) = open_empty().await;
        let a = catalog.add_video(new_video("a", "aptitude")).await.unwrap();
        let b = catalog.add_video(new_video("a", "aptitude")).await.unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(catalog.videos().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_add_rejects_unknown_category() {
        let (catalog, _store) = open_empty().await;
        let result = catalog.add_video(new_video("a", "nowhere")).await;
        assert!(matches!(
            result,
            Err(CatalogError::Validation(ValidationError::UnknownCategory(_)))
        ));

        let result = catalog.add_video(new_video("  ", "aptitude")).await;
        assert!(matches!(
            result,
            Err(CatalogError::Validation(ValidationError::EmptyTitle))
        ));
        assert!(catalog.videos().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_insert_keeps_caller_id() {
        let (catalog, _store) = open_empty().await;
        let video = catalog
            .add_video(new_video("v1", "aptitude"))
            .await
            .unwrap();
        let mut copy = video.clone();
        copy.title = "other".to_string();
        assert!(!catalog.insert_video(copy).await.unwrap());

        catalog.delete_video(&video.id).await.unwrap();
        assert!(catalog.insert_video(video.clone()).await.unwrap());
        assert_eq!(catalog.video(&video.id).await.unwrap(), Some(video));
    }

    #[tokio::test]
    async fn test_update_replaces_record() {
        let (catalog, _store) = open_empty().await;
        let mut video = catalog
            .add_video(new_video("v1", "aptitude"))
            .await
            .unwrap();
        video.title = "Renamed".to_string();
        video.description = Some("notes".to_string());

        let updated = catalog.update_video(video.clone()).await.unwrap();
        assert_eq!(updated, Some(video.clone()));
        assert_eq!(catalog.video(&video.id).await.unwrap(), Some(video));
    }

    #[tokio::test]
    async fn test_update_unknown_id_writes_nothing() {
        let (catalog, store) = open_empty().await;
        let video = catalog
            .add_video(new_video("v1", "aptitude"))
            .await
            .unwrap();
        let before = store.get(VIDEOS_KEY).await.unwrap();

        let mut ghost = video.clone();
        ghost.id = "missing".to_string();
        ghost.title = "ghost".to_string();
        assert_eq!(catalog.update_video(ghost).await.unwrap(), None);

        assert_eq!(store.get(VIDEOS_KEY).await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_delete_removes_from_playlists() {
        let (catalog, _store) = open_empty().await;
        let v1 = catalog.add_video(new_video("v1", "aptitude")).await.unwrap();
        let v2 = catalog.add_video(new_video("v2", "aptitude")).await.unwrap();
        let p1 = catalog
            .add_playlist(NewPlaylist {
                name: "p1".to_string(),
                video_ids: vec![v1.id.clone(), v2.id.clone()],
                ..Default::default()
            })
            .await
            .unwrap();
        let p2 = catalog
            .add_playlist(NewPlaylist {
                name: "p2".to_string(),
                video_ids: vec![v2.id.clone()],
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(catalog.delete_video(&v2.id).await.unwrap());

        let p1 = catalog.playlist(&p1.id).await.unwrap().unwrap();
        assert_eq!(p1.video_ids, vec![v1.id.clone()]);
        let p2 = catalog.playlist(&p2.id).await.unwrap().unwrap();
        assert!(p2.video_ids.is_empty());
        for playlist in catalog.playlists().await.unwrap() {
            assert!(!playlist.video_ids.contains(&v2.id));
        }

        assert!(!catalog.delete_video(&v2.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_failed_delete_leaves_everything() {
        let (catalog, store) = open_empty().await;
        let v1 = catalog.add_video(new_video("v1", "aptitude")).await.unwrap();
        let playlist = catalog
            .add_playlist(NewPlaylist {
                name: "p1".to_string(),
                video_ids: vec![v1.id.clone()],
                ..Default::default()
            })
            .await
            .unwrap();

        store.set_fail_writes(true);
        let result = catalog.delete_video(&v1.id).await;
        assert!(matches!(result, Err(CatalogError::PersistenceWrite(_))));
        store.set_fail_writes(false);

        assert!(catalog.video(&v1.id).await.unwrap().is_some());
        let playlist = catalog.playlist(&playlist.id).await.unwrap().unwrap();
        assert_eq!(playlist.video_ids, vec![v1.id]);
    }

    #[tokio::test]
    async fn test_toggle_favorite() {
        let (catalog, _store) = open_empty().await;
        let video = catalog.add_video(new_video("v1", "aptitude")).await.unwrap();
        assert!(!video.favorite);

        let video = catalog.toggle_favorite(&video.id).await.unwrap().unwrap();
        assert!(video.favorite);
        assert_eq!(catalog.favorite_videos().await.unwrap(), vec![video.clone()]);

        let video = catalog.toggle_favorite(&video.id).await.unwrap().unwrap();
        assert!(!video.favorite);
        assert!(catalog.toggle_favorite("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_add_comment_appends() {
        let (catalog, _store) = open_empty().await;
        let video = catalog.add_video(new_video("v1", "aptitude")).await.unwrap();

        for text in ["first", "second"] {
            catalog
                .add_comment(
                    &video.id,
                    NewComment {
                        text: text.to_string(),
                        username: "sam".to_string(),
                    },
                )
                .await
                .unwrap()
                .unwrap();
        }

        let video = catalog.video(&video.id).await.unwrap().unwrap();
        let texts: Vec<&str> = video.comments.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second"]);
        assert_ne!(video.comments[0].id, video.comments[1].id);

        let empty = catalog
            .add_comment(
                &video.id,
                NewComment {
                    text: " ".to_string(),
                    username: "sam".to_string(),
                },
            )
            .await;
        assert!(matches!(
            empty,
            Err(CatalogError::Validation(ValidationError::EmptyComment))
        ));

        let missing = catalog
            .add_comment(
                "missing",
                NewComment {
                    text: "hi".to_string(),
                    username: "sam".to_string(),
                },
            )
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_recently_watched() {
        let (catalog, _store) = open_empty().await;
        let a = catalog.add_video(new_video("a", "aptitude")).await.unwrap();
        let b = catalog.add_video(new_video("b", "aptitude")).await.unwrap();
        catalog.add_video(new_video("c", "aptitude")).await.unwrap();

        catalog.mark_watched(&a.id).await.unwrap().unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        catalog.mark_watched(&b.id).await.unwrap().unwrap();

        let recent = catalog.recently_watched(10).await.unwrap();
        let ids: Vec<&str> = recent.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, vec![b.id.as_str(), a.id.as_str()]);

        assert_eq!(catalog.recently_watched(1).await.unwrap().len(), 1);
    }
}
