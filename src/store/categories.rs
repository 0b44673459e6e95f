// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Category operations. Topic and post counters are never written here;
//! they move only with topic and post mutations.

use chrono::Utc;

use super::{require_text, Store, StoreError, StoreResult};
use crate::dispatch::strip_json;
use crate::models::{slugify, Category, CategoryUpdate, NewCategory};

const DEFAULT_COLOR: &str = "0088CC";
const DEFAULT_TEXT_COLOR: &str = "FFFFFF";

impl Store {
    fn ensure_slug_free(&self, slug: &str, owner: Option<i64>) -> StoreResult<()> {
        // `/c/{key}` treats integer keys as ids.
        if strip_json(slug).parse::<i64>().is_ok() {
            return Err(StoreError::Validation(format!(
                "Category slug {slug} must not be a number"
            )));
        }
        match self.categories_by_slug.get(slug) {
            Some(&id) if Some(id) != owner => Err(StoreError::Conflict(format!(
                "Category slug {slug} is already in use"
            ))),
            _ => Ok(()),
        }
    }

    pub fn get_category(&self, id: i64) -> StoreResult<Category> {
        self.category_ref(id).cloned()
    }

    pub fn get_category_by_slug(&self, slug: &str) -> StoreResult<Category> {
        self.categories_by_slug
            .get(slug)
            .and_then(|id| self.categories.get(id))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("Category {slug}")))
    }

    /// All categories ordered by position, then id.
    pub fn list_categories(&self) -> Vec<Category> {
        let mut categories: Vec<Category> = self.categories.values().cloned().collect();
        categories.sort_by_key(|c| (c.position, c.id));
        categories
    }

    pub fn create_category(&mut self, request: NewCategory) -> StoreResult<Category> {
        require_text("name", &request.name)?;
        let slug = match request.slug {
            Some(slug) if !slug.trim().is_empty() => slug.trim().to_string(),
            _ => slugify(&request.name),
        };
        self.ensure_slug_free(&slug, None)?;
        if let Some(parent) = request.parent_category_id {
            self.category_ref(parent)?;
        }

        let id = self.next_category_id.next();
        let now = Utc::now();
        let category = Category {
            id,
            name: request.name.trim().to_string(),
            slug: slug.clone(),
            color: request.color.unwrap_or_else(|| DEFAULT_COLOR.to_string()),
            text_color: request
                .text_color
                .unwrap_or_else(|| DEFAULT_TEXT_COLOR.to_string()),
            description: request.description.unwrap_or_default(),
            position: self.categories.len() as i64,
            parent_category_id: request.parent_category_id,
            topic_count: 0,
            post_count: 0,
            created_at: now,
            updated_at: now,
        };
        self.categories_by_slug.insert(slug, id);
        self.categories.insert(id, category.clone());
        Ok(category)
    }

    pub fn update_category(&mut self, id: i64, update: CategoryUpdate) -> StoreResult<Category> {
        let mut category = self.category_ref(id)?.clone();
        if let Some(name) = &update.name {
            require_text("name", name)?;
        }
        let new_slug = update
            .slug
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        if let Some(slug) = &new_slug {
            self.ensure_slug_free(slug, Some(id))?;
        }

        if let Some(name) = update.name {
            category.name = name.trim().to_string();
        }
        if let Some(color) = update.color {
            category.color = color;
        }
        if let Some(text_color) = update.text_color {
            category.text_color = text_color;
        }
        if let Some(description) = update.description {
            category.description = description;
        }
        if let Some(slug) = new_slug {
            self.categories_by_slug.remove(&category.slug);
            self.categories_by_slug.insert(slug.clone(), id);
            category.slug = slug;
        }
        category.updated_at = Utc::now();
        self.categories.insert(id, category.clone());
        Ok(category)
    }

    /// Remove an empty category. Subcategories are reparented to the top
    /// level.
    pub fn delete_category(&mut self, id: i64) -> StoreResult<Category> {
        let category = self.category_ref(id)?.clone();
        if category.topic_count > 0 {
            return Err(StoreError::Conflict(format!(
                "Category {} still has {} topics",
                category.slug, category.topic_count
            )));
        }
        self.categories.remove(&id);
        self.categories_by_slug.remove(&category.slug);
        for child in self.categories.values_mut() {
            if child.parent_category_id == Some(id) {
                child.parent_category_id = None;
            }
        }
        Ok(category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str) -> NewCategory {
        NewCategory {
            name: name.into(),
            ..Default::default()
        }
    }

    #[test]
    fn create_derives_slug_and_round_trips() {
        let mut store = Store::new();
        let created = store
            .create_category(NewCategory {
                color: Some("FF0000".into()),
                description: Some("Bugs go here".into()),
                ..named("Bug Reports")
            })
            .unwrap();
        assert_eq!(created.slug, "bug-reports");
        assert_eq!(created.topic_count, 0);

        let fetched = store.get_category(created.id).unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.color, "FF0000");
        assert_eq!(fetched.description, "Bugs go here");
        assert_eq!(store.get_category_by_slug("bug-reports").unwrap().id, created.id);
    }

    #[test]
    fn duplicate_slug_conflicts() {
        let mut store = Store::new();
        store.create_category(named("General")).unwrap();
        let dup = store.create_category(NewCategory {
            slug: Some("general".into()),
            ..named("Another")
        });
        assert!(matches!(dup, Err(StoreError::Conflict(_))));
    }

    #[test]
    fn numeric_slugs_are_never_indexed() {
        let mut store = Store::new();
        let year = store.create_category(named("2024")).unwrap();
        assert!(year.slug.parse::<i64>().is_err());
        assert_eq!(store.get_category_by_slug(&year.slug).unwrap().id, year.id);

        let explicit = store.create_category(NewCategory {
            slug: Some("42".into()),
            ..named("Answers")
        });
        assert!(matches!(explicit, Err(StoreError::Validation(_))));

        let renamed = store.update_category(
            year.id,
            CategoryUpdate {
                slug: Some("7.json".into()),
                ..Default::default()
            },
        );
        assert!(matches!(renamed, Err(StoreError::Validation(_))));
    }

    #[test]
    fn update_reindexes_slug() {
        let mut store = Store::new();
        let cat = store.create_category(named("Support")).unwrap();
        store
            .update_category(
                cat.id,
                CategoryUpdate {
                    slug: Some("help".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(store.get_category_by_slug("support").is_err());
        assert_eq!(store.get_category_by_slug("help").unwrap().id, cat.id);
    }

    #[test]
    fn missing_parent_is_not_found() {
        let mut store = Store::new();
        let result = store.create_category(NewCategory {
            parent_category_id: Some(42),
            ..named("Child")
        });
        assert!(matches!(result, Err(StoreError::NotFound(_))));
        assert!(store.list_categories().is_empty());
    }

    #[test]
    fn delete_reparents_children() {
        let mut store = Store::new();
        let parent = store.create_category(named("Parent")).unwrap();
        let child = store
            .create_category(NewCategory {
                parent_category_id: Some(parent.id),
                ..named("Child")
            })
            .unwrap();
        store.delete_category(parent.id).unwrap();
        assert!(store.get_category_by_slug("parent").is_err());
        assert_eq!(store.get_category(child.id).unwrap().parent_category_id, None);
    }
}
