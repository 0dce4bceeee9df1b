use std::collections::{HashMap, HashSet};

use chrono::Utc;
use tracing::{debug, info};

use super::codec::{Collection, PLAYLISTS_KEY};
use super::error::{CatalogResult, ValidationError};
use super::model::*;
use super::Catalog;
use crate::util::generate_id;

impl Catalog {
    pub async fn playlists(&self) -> CatalogResult<Vec<Playlist>> {
        Ok(self.load_playlists().await?.into_items())
    }

    pub async fn playlist(&self, id: &str) -> CatalogResult<Option<Playlist>> {
        let playlists = self.load_playlists().await?.into_items();
        Ok(playlists.into_iter().find(|p| p.id == id))
    }

    pub async fn add_playlist(&self, new: NewPlaylist) -> CatalogResult<Playlist> {
        let name = new.name.trim().to_string();
        if name.is_empty() {
            return Err(ValidationError::EmptyName.into());
        }

        let _guard = self.write_lock.lock().await;
        let videos = self.load_videos().await?;
        let playlist = Playlist {
            id: generate_id(),
            name,
            description: new.description,
            video_ids: sanitize_video_ids(new.video_ids, &videos),
            created_at: Utc::now(),
            extra: Default::default(),
        };

        let mut playlists = self.load_playlists().await?;
        playlists.push(playlist.clone());
        self.commit(&[(PLAYLISTS_KEY, playlists.encode()?)]).await?;

        info!("Created playlist {} ({})", playlist.name, playlist.id);
        Ok(playlist)
    }

    /// Replace the stored playlist with the same id; `None` if there is
    /// none. Repeated video ids and ids of missing videos are dropped.
    pub async fn update_playlist(&self, mut playlist: Playlist) -> CatalogResult<Option<Playlist>> {
        let _guard = self.write_lock.lock().await;
        let mut playlists = self.load_playlists().await?;
        let Some(index) = playlists.iter().position(|p| p.id == playlist.id) else {
            debug!("Playlist {} not found, update ignored", playlist.id);
            return Ok(None);
        };

        playlist.name = playlist.name.trim().to_string();
        if playlist.name.is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        let videos = self.load_videos().await?;
        playlist.video_ids = sanitize_video_ids(playlist.video_ids, &videos);

        playlists[index] = playlist.clone();
        self.commit(&[(PLAYLISTS_KEY, playlists.encode()?)]).await?;
        Ok(Some(playlist))
    }

    /// Delete a playlist. The videos it listed are not touched.
    pub async fn delete_playlist(&self, id: &str) -> CatalogResult<bool> {
        let _guard = self.write_lock.lock().await;
        let mut playlists = self.load_playlists().await?;
        let before = playlists.len();
        playlists.retain(|p| p.id != id);
        if playlists.len() == before {
            return Ok(false);
        }

        self.commit(&[(PLAYLISTS_KEY, playlists.encode()?)]).await?;
        info!("Deleted playlist {}", id);
        Ok(true)
    }

    /// Append a video to a playlist. `None` if the playlist does not exist.
    pub async fn add_video_to_playlist(
        &self,
        playlist_id: &str,
        video_id: &str,
    ) -> CatalogResult<Option<PlaylistInsert>> {
        let _guard = self.write_lock.lock().await;
        let mut playlists = self.load_playlists().await?;
        let Some(index) = playlists.iter().position(|p| p.id == playlist_id) else {
            return Ok(None);
        };

        if playlists[index].video_ids.iter().any(|v| v == video_id) {
            return Ok(Some(PlaylistInsert::AlreadyPresent(playlists.swap_remove(index))));
        }
        let videos = self.load_videos().await?;
        if !videos.holds_id(video_id, |v| v.id.as_str()) {
            return Ok(Some(PlaylistInsert::UnknownVideo));
        }

        playlists[index].video_ids.push(video_id.to_string());
        let playlist = playlists[index].clone();
        self.commit(&[(PLAYLISTS_KEY, playlists.encode()?)]).await?;

        debug!("Added video {} to playlist {}", video_id, playlist_id);
        Ok(Some(PlaylistInsert::Added(playlist)))
    }

    pub async fn remove_video_from_playlist(
        &self,
        playlist_id: &str,
        video_id: &str,
    ) -> CatalogResult<Option<Playlist>> {
        let _guard = self.write_lock.lock().await;
        let mut playlists = self.load_playlists().await?;
        let Some(index) = playlists.iter().position(|p| p.id == playlist_id) else {
            return Ok(None);
        };

        let before = playlists[index].video_ids.len();
        playlists[index].video_ids.retain(|v| v != video_id);
        if playlists[index].video_ids.len() == before {
            return Ok(Some(playlists.swap_remove(index)));
        }

        let playlist = playlists[index].clone();
        self.commit(&[(PLAYLISTS_KEY, playlists.encode()?)]).await?;
        Ok(Some(playlist))
    }

    /// Move a video to `new_index` within the playlist, shifting the others.
    /// Indexes past the end move the video to the last position.
    pub async fn move_video_in_playlist(
        &self,
        playlist_id: &str,
        video_id: &str,
        new_index: usize,
    ) -> CatalogResult<Option<Playlist>> {
        let _guard = self.write_lock.lock().await;
        let mut playlists = self.load_playlists().await?;
        let Some(index) = playlists.iter().position(|p| p.id == playlist_id) else {
            return Ok(None);
        };

        let ids = &mut playlists[index].video_ids;
        let Some(from) = ids.iter().position(|v| v == video_id) else {
            return Ok(Some(playlists.swap_remove(index)));
        };
        let to = new_index.min(ids.len() - 1);
        if from == to {
            return Ok(Some(playlists.swap_remove(index)));
        }
        let id = ids.remove(from);
        ids.insert(to, id);

        let playlist = playlists[index].clone();
        self.commit(&[(PLAYLISTS_KEY, playlists.encode()?)]).await?;
        Ok(Some(playlist))
    }

    /// The videos of a playlist in playlist order. Ids that no longer
    /// resolve are skipped.
    pub async fn videos_in_playlist(&self, playlist_id: &str) -> CatalogResult<Option<Vec<Video>>> {
        let Some(playlist) = self.playlist(playlist_id).await? else {
            return Ok(None);
        };

        let mut videos: HashMap<String, Video> = self
            .load_videos()
            .await?
            .into_items()
            .into_iter()
            .map(|v| (v.id.clone(), v))
            .collect();

        Ok(Some(
            playlist
                .video_ids
                .iter()
                .filter_map(|id| videos.remove(id))
                .collect(),
        ))
    }
}

/// Keep the first occurrence of every id that names a stored video,
/// readable or not.
pub(crate) fn sanitize_video_ids(ids: Vec<String>, videos: &Collection<Video>) -> Vec<String> {
    let known: HashSet<&str> = videos
        .iter()
        .map(|v| v.id.as_str())
        .chain(videos.unreadable_ids())
        .collect();
    let mut seen = HashSet::new();
    ids.into_iter()
        .filter(|id| known.contains(id.as_str()) && seen.insert(id.clone()))
        .collect()
}
