pub mod codec;
pub mod error;
pub mod model;
pub mod seed;

mod category;
mod playlist;
mod video;

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::db::KvStore;
use crate::util::slugify;
use codec::{Collection, CATEGORIES_KEY, PLAYLISTS_KEY, VIDEOS_KEY};

pub use error::{CatalogError, CatalogResult, ValidationError};
pub use model::*;

#[derive(Debug, Clone)]
pub struct CatalogOptions {
    /// Display name of the category that receives the videos of a deleted
    /// category. Its id is the slug of this name.
    pub fallback_category: String,
    /// Import the starter catalog into a store that has never been used.
    pub seed_sample_data: bool,
}

impl Default for CatalogOptions {
    fn default() -> Self {
        Self {
            fallback_category: "Aptitude".to_string(),
            seed_sample_data: true,
        }
    }
}

/// The video catalog: videos, categories and playlists kept in three
/// collections of a key-value store, with the references between them
/// kept consistent.
///
/// Read-modify-write operations hold `write_lock` from the first read to
/// the final write, so the handle can be shared between tasks.
pub struct Catalog {
    store: Arc<dyn KvStore>,
    fallback_id: String,
    fallback_name: String,
    write_lock: Mutex<()>,
}

impl Catalog {
    /// Open the catalog on `store`, seeding it on first use and repairing
    /// any reference that does not resolve.
    pub async fn open(store: Arc<dyn KvStore>, options: CatalogOptions) -> CatalogResult<Self> {
        let fallback_name = options.fallback_category.trim().to_string();
        if fallback_name.is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        let fallback_id = slugify(&fallback_name);
        if fallback_id.is_empty() {
            return Err(ValidationError::InvalidName(fallback_name).into());
        }

        let catalog = Self {
            store,
            fallback_id,
            fallback_name,
            write_lock: Mutex::new(()),
        };

        if options.seed_sample_data && !catalog.is_initialized().await? {
            seed::import_sample_data(&catalog).await?;
        }
        catalog.ensure_integrity().await?;

        Ok(catalog)
    }

    /// Id of the category that absorbs videos of deleted categories.
    pub fn fallback_category_id(&self) -> &str {
        &self.fallback_id
    }

    pub async fn summary(&self) -> CatalogResult<CatalogSummary> {
        let videos = self.load_videos().await?;
        Ok(CatalogSummary {
            videos: videos.len(),
            favorites: videos.iter().filter(|v| v.favorite).count(),
            categories: self.load_categories().await?.len(),
            playlists: self.load_playlists().await?.len(),
        })
    }

    async fn is_initialized(&self) -> CatalogResult<bool> {
        for key in [VIDEOS_KEY, CATEGORIES_KEY, PLAYLISTS_KEY] {
            if self
                .store
                .contains(key)
                .await
                .map_err(CatalogError::PersistenceRead)?
            {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Make sure the fallback category exists, category order is dense,
    /// every video points at an existing category and playlists only list
    /// existing videos, once. Everything that needs fixing is written in
    /// one batch.
    async fn ensure_integrity(&self) -> CatalogResult<()> {
        let _guard = self.write_lock.lock().await;

        let mut categories = self.load_categories().await?;
        let mut videos = self.load_videos().await?;
        let mut playlists = self.load_playlists().await?;
        let mut entries = Vec::new();

        let dense = categories
            .iter()
            .enumerate()
            .all(|(i, c)| c.order as usize == i);
        let has_fallback = categories.holds_id(&self.fallback_id, |c| c.id.as_str());
        if !has_fallback {
            info!("Creating fallback category {}", self.fallback_id);
            categories.push(CategorySettings {
                id: self.fallback_id.clone(),
                name: self.fallback_name.clone(),
                order: 0,
                extra: Default::default(),
            });
        }
        if !has_fallback || !dense {
            renumber(&mut categories);
            entries.push((CATEGORIES_KEY, categories.encode()?));
        }

        let known: HashSet<&str> = categories
            .iter()
            .map(|c| c.id.as_str())
            .chain(categories.unreadable_ids())
            .collect();
        let mut moved = 0;
        for video in videos.iter_mut() {
            if !known.contains(video.category.as_str()) {
                video.category = self.fallback_id.clone();
                moved += 1;
            }
        }
        if moved > 0 {
            warn!(
                "{} videos referenced missing categories, moved to {}",
                moved, self.fallback_id
            );
            entries.push((VIDEOS_KEY, videos.encode()?));
        }

        let mut repaired = 0;
        for playlist in playlists.iter_mut() {
            let ids = std::mem::take(&mut playlist.video_ids);
            let before = ids.len();
            playlist.video_ids = playlist::sanitize_video_ids(ids, &videos);
            if playlist.video_ids.len() != before {
                repaired += 1;
            }
        }
        if repaired > 0 {
            warn!("Removed dangling or repeated entries from {} playlists", repaired);
            entries.push((PLAYLISTS_KEY, playlists.encode()?));
        }

        if !entries.is_empty() {
            self.commit(&entries).await?;
        }
        Ok(())
    }

    pub(crate) async fn load_videos(&self) -> CatalogResult<Collection<Video>> {
        codec::load(self.store.as_ref(), VIDEOS_KEY).await
    }

    /// Categories sorted by `order`.
    pub(crate) async fn load_categories(&self) -> CatalogResult<Collection<CategorySettings>> {
        let mut categories: Collection<CategorySettings> =
            codec::load(self.store.as_ref(), CATEGORIES_KEY).await?;
        categories.sort_by_key(|c| c.order);
        Ok(categories)
    }

    pub(crate) async fn load_playlists(&self) -> CatalogResult<Collection<Playlist>> {
        codec::load(self.store.as_ref(), PLAYLISTS_KEY).await
    }

    /// Write encoded collections as one substrate batch.
    pub(crate) async fn commit(&self, entries: &[(&str, String)]) -> CatalogResult<()> {
        self.store
            .set_many(entries)
            .await
            .map_err(CatalogError::PersistenceWrite)
    }
}

/// Rewrite `order` as the position of each category in the slice.
pub(crate) fn renumber(categories: &mut [CategorySettings]) {
    for (i, category) in categories.iter_mut().enumerate() {
        category.order = i as u32;
    }
}
