use tracing::{debug, info};

use super::codec::{Collection, CATEGORIES_KEY, VIDEOS_KEY};
use super::error::{CatalogResult, ValidationError};
use super::model::*;
use super::{renumber, Catalog};
use crate::util::slugify;

impl Catalog {
    /// All categories, ascending by `order`.
    pub async fn categories(&self) -> CatalogResult<Vec<CategorySettings>> {
        Ok(self.load_categories().await?.into_items())
    }

    pub async fn category(&self, id: &str) -> CatalogResult<Option<CategorySettings>> {
        let categories = self.load_categories().await?.into_items();
        Ok(categories.into_iter().find(|c| c.id == id))
    }

    /// Append a category named `name`. Its id is the slug of the name.
    /// Returns the full category list after the change.
    pub async fn add_category(&self, name: &str) -> CatalogResult<Vec<CategorySettings>> {
        let name = name.trim();

        let _guard = self.write_lock.lock().await;
        let mut categories = self.load_categories().await?;
        let id = check_name(&categories, name, None)?;

        renumber(&mut categories);
        let order = categories.len() as u32;
        categories.push(CategorySettings {
            id: id.clone(),
            name: name.to_string(),
            order,
            extra: Default::default(),
        });
        self.commit(&[(CATEGORIES_KEY, categories.encode()?)]).await?;

        info!("Added category {} ({})", name, id);
        Ok(categories.into_items())
    }

    /// Apply `patch` to the category with the given id. The id itself never
    /// changes, so videos need no update.
    pub async fn update_category(
        &self,
        id: &str,
        patch: CategoryPatch,
    ) -> CatalogResult<Vec<CategorySettings>> {
        let _guard = self.write_lock.lock().await;
        let mut categories = self.load_categories().await?;
        let Some(index) = categories.iter().position(|c| c.id == id) else {
            debug!("Category {} not found, update ignored", id);
            return Ok(categories.into_items());
        };

        let Some(name) = patch.name else {
            return Ok(categories.into_items());
        };
        let name = name.trim();
        if categories[index].name == name {
            return Ok(categories.into_items());
        }
        check_name(&categories, name, Some(id))?;

        categories[index].name = name.to_string();
        renumber(&mut categories);
        self.commit(&[(CATEGORIES_KEY, categories.encode()?)]).await?;

        info!("Renamed category {} to {}", id, name);
        Ok(categories.into_items())
    }

    /// Delete a category and move its videos to the fallback category.
    /// Both collections are written in one batch.
    pub async fn delete_category(&self, id: &str) -> CatalogResult<Vec<CategorySettings>> {
        if id == self.fallback_id {
            return Err(ValidationError::ProtectedCategory(id.to_string()).into());
        }

        let _guard = self.write_lock.lock().await;
        let mut categories = self.load_categories().await?;
        let before = categories.len();
        categories.retain(|c| c.id != id);
        if categories.len() == before {
            debug!("Category {} not found, delete ignored", id);
            return Ok(categories.into_items());
        }
        renumber(&mut categories);

        let mut videos = self.load_videos().await?;
        let mut moved = 0;
        for video in videos.iter_mut().filter(|v| v.category == id) {
            video.category = self.fallback_id.clone();
            moved += 1;
        }

        let mut entries = vec![(CATEGORIES_KEY, categories.encode()?)];
        if moved > 0 {
            entries.push((VIDEOS_KEY, videos.encode()?));
        }
        self.commit(&entries).await?;

        info!(
            "Deleted category {}, moved {} videos to {}",
            id, moved, self.fallback_id
        );
        Ok(categories.into_items())
    }

    /// Give each listed category the order of its position in `ids`.
    /// Unknown and repeated ids are ignored; unlisted categories follow the
    /// listed ones in their previous order.
    pub async fn reorder_categories<S: AsRef<str>>(
        &self,
        ids: &[S],
    ) -> CatalogResult<Vec<CategorySettings>> {
        let _guard = self.write_lock.lock().await;
        let mut categories = self.load_categories().await?;
        let mut ordered = Vec::with_capacity(categories.len());
        for id in ids {
            if let Some(pos) = categories.iter().position(|c| c.id == id.as_ref()) {
                ordered.push(categories.remove(pos));
            }
        }
        ordered.append(&mut categories);
        renumber(&mut ordered);
        *categories = ordered;

        self.commit(&[(CATEGORIES_KEY, categories.encode()?)]).await?;
        Ok(categories.into_items())
    }
}

/// Validate a category name against the existing set and return its slug.
/// `renaming` is the id of the category being renamed, which is allowed to
/// keep its own name in a different case. Ids of stored records that
/// could not be read are taken as well.
fn check_name(
    categories: &Collection<CategorySettings>,
    name: &str,
    renaming: Option<&str>,
) -> Result<String, ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::EmptyName);
    }
    let slug = slugify(name);
    if slug.is_empty() {
        return Err(ValidationError::InvalidName(name.to_string()));
    }

    let lower = name.to_lowercase();
    let duplicate = categories
        .iter()
        .filter(|c| Some(c.id.as_str()) != renaming)
        .any(|c| c.name.to_lowercase() == lower || (renaming.is_none() && c.id == slug));
    if duplicate || (renaming.is_none() && categories.unreadable_ids().any(|u| u == slug)) {
        return Err(ValidationError::DuplicateCategory(name.to_string()));
    }

    Ok(slug)
}
