//! Builds or reuses category chains from flat `"A > B > C"` strings, as
//! produced by bulk imports.

use tracing::debug;

use crate::core::icons::IconTable;
use crate::domain::{
    category::{join_path, split_path, validate_name},
    Category, MAX_DEPTH,
};
use crate::storage::{CategoryReader, CategoryStore, ExpenseStore};

use super::{CategoryService, ServiceError, ServiceResult};

pub struct PathResolver<'a, C, E> {
    service: CategoryService<'a, C, E>,
    categories: &'a C,
    icons: &'a IconTable,
}

impl<'a, C, E> PathResolver<'a, C, E>
where
    C: CategoryStore,
    E: ExpenseStore,
{
    pub fn new(categories: &'a C, expenses: &'a E, icons: &'a IconTable) -> Self {
        Self {
            service: CategoryService::new(categories, expenses),
            categories,
            icons,
        }
    }

    /// Returns the leaf category for `full_path`, creating any missing
    /// ancestors on the way down.
    pub fn resolve_or_create_path(&self, full_path: &str) -> ServiceResult<Category> {
        let segments: Vec<&str> = split_path(full_path).into_iter().map(str::trim).collect();
        if segments.iter().any(|segment| segment.is_empty()) {
            return Err(ServiceError::BlankSegment {
                path: full_path.to_string(),
            });
        }
        for segment in &segments {
            validate_name(segment).map_err(|err| ServiceError::from_name(segment, err))?;
        }
        if segments.len() > MAX_DEPTH {
            return Err(ServiceError::DepthExceeded {
                path: full_path.to_string(),
                depth: segments.len(),
                max: MAX_DEPTH,
            });
        }

        let mut parent: Option<Category> = None;
        for segment in segments {
            let path = join_path(parent.as_ref().map(|p| p.full_path.as_str()), segment);
            let current = match self.categories.get_by_full_path(&path)? {
                Some(existing) => existing,
                None => self.create(&path, segment, parent.as_ref())?,
            };
            parent = Some(current);
        }
        // split_path always yields at least one segment
        parent.ok_or_else(|| ServiceError::BlankSegment {
            path: full_path.to_string(),
        })
    }

    fn create(
        &self,
        path: &str,
        name: &str,
        parent: Option<&Category>,
    ) -> ServiceResult<Category> {
        let icon = match self.icons.lookup(path) {
            Some(icon) => icon.to_string(),
            None => parent.map_or_else(
                || self.icons.default_icon().to_string(),
                |p| p.icon.clone(),
            ),
        };
        match self.service.insert(name, &icon, parent.map(|p| p.id)) {
            Ok(id) => {
                debug!(id, path, icon = %icon, "path segment created");
                self.categories
                    .get_by_id(id)?
                    .ok_or(ServiceError::CategoryNotFound(id))
            }
            // Lost a race against a concurrent insert of the same sibling.
            Err(err @ ServiceError::DuplicateSibling { .. }) => {
                self.categories.get_by_full_path(path)?.ok_or(err)
            }
            Err(err) => Err(err),
        }
    }
}
