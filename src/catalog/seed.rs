//! Starter content for a catalog that has never been used.

use std::collections::HashMap;

use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use super::codec::{self, CATEGORIES_KEY, PLAYLISTS_KEY, VIDEOS_KEY};
use super::error::{CatalogError, CatalogResult};
use super::model::*;
use super::Catalog;
use crate::util::{generate_id, slugify};

const SAMPLE_DATA: &str = include_str!("sample_data.json");

#[derive(Debug, Deserialize)]
struct SampleData {
    categories: Vec<String>,
    videos: Vec<SampleVideo>,
    playlists: Vec<SamplePlaylist>,
}

#[derive(Debug, Deserialize)]
struct SampleVideo {
    /// Name the playlists use to refer to this video.
    key: String,
    #[serde(flatten)]
    video: NewVideo,
}

#[derive(Debug, Deserialize)]
struct SamplePlaylist {
    name: String,
    #[serde(default)]
    description: Option<String>,
    videos: Vec<String>,
}

/// Write the sample categories, videos and playlists, replacing whatever
/// the three collections hold, as one batch.
pub async fn import_sample_data(catalog: &Catalog) -> CatalogResult<()> {
    let sample: SampleData = serde_json::from_str(SAMPLE_DATA).map_err(CatalogError::SampleData)?;
    let now = Utc::now();

    let categories: Vec<CategorySettings> = sample
        .categories
        .iter()
        .enumerate()
        .map(|(i, name)| CategorySettings {
            id: slugify(name),
            name: name.clone(),
            order: i as u32,
            extra: Default::default(),
        })
        .collect();

    let mut ids = HashMap::new();
    let videos: Vec<Video> = sample
        .videos
        .into_iter()
        .map(|sample| {
            let id = generate_id();
            ids.insert(sample.key, id.clone());
            Video {
                id,
                title: sample.video.title,
                url: sample.video.url,
                category: sample.video.category,
                thumbnail: sample.video.thumbnail,
                description: sample.video.description,
                favorite: sample.video.favorite,
                created_at: now,
                video_type: sample.video.video_type,
                last_watched: None,
                comments: Vec::new(),
                extra: Default::default(),
            }
        })
        .collect();

    let playlists: Vec<Playlist> = sample
        .playlists
        .into_iter()
        .map(|sample| Playlist {
            id: generate_id(),
            name: sample.name,
            description: sample.description,
            video_ids: sample
                .videos
                .iter()
                .filter_map(|key| ids.get(key).cloned())
                .collect(),
            created_at: now,
            extra: Default::default(),
        })
        .collect();

    let _guard = catalog.write_lock.lock().await;
    catalog
        .commit(&[
            (CATEGORIES_KEY, codec::encode(CATEGORIES_KEY, &categories)?),
            (VIDEOS_KEY, codec::encode(VIDEOS_KEY, &videos)?),
            (PLAYLISTS_KEY, codec::encode(PLAYLISTS_KEY, &playlists)?),
        ])
        .await?;

    info!(
        "Imported sample catalog: {} categories, {} videos, {} playlists",
        categories.len(),
        videos.len(),
        playlists.len()
    );
    Ok(())
}
