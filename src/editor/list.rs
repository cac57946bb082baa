use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{Result, TallyError};

use super::fields::{missing_required, NumberField};

/// A record that can be edited through an [`EditableList`].
pub trait ListItem: Clone + Default + Serialize + DeserializeOwned {
    /// Singular display name, e.g. "Task".
    const TITLE: &'static str;

    /// Wire names of the fields that must not be blank.
    const REQUIRED_FIELDS: &'static [&'static str];

    const NUMBER_FIELDS: &'static [NumberField] = &[];

    fn id(&self) -> Uuid;

    /// Fields making up the row key, before the position suffix.
    fn key_parts(&self) -> Vec<&str>;

    /// One-line label for tables.
    fn summary(&self) -> String;

    /// Label/value rows of the detail view.
    fn describe(&self) -> Vec<(&'static str, String)>;

    /// Checks the record before it is saved into a list.
    fn validate(&self) -> Result<()> {
        let missing = missing_required(self)?;
        if missing.is_empty() {
            Ok(())
        } else {
            Err(TallyError::Input(format!(
                "{} is missing required fields: {}",
                Self::TITLE,
                missing.join(", ")
            )))
        }
    }
}

/// Display key of the row at `index`.
///
/// Equal records at different positions get different keys.
pub fn item_key<T: ListItem>(item: &T, index: usize) -> String {
    let mut parts: Vec<String> = item.key_parts().into_iter().map(str::to_string).collect();
    parts.push(index.to_string());
    parts.join("-")
}

/// The record being added or edited, the counterpart of an open dialog.
#[derive(Debug, Clone)]
pub struct Draft<T> {
    pub item: T,
    /// Id of the record this draft replaces, `None` when adding.
    pub target: Option<Uuid>,
}

/// Add/edit/delete over a homogeneous list of records.
///
/// Records are addressed by their durable id. At most one draft is open.
#[derive(Debug, Clone, Default)]
pub struct EditableList<T: ListItem> {
    items: Vec<T>,
    draft: Option<Draft<T>>,
}

impl<T: ListItem> EditableList<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self { items, draft: None }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    pub fn get(&self, id: Uuid) -> Option<&T> {
        self.items.iter().find(|item| item.id() == id)
    }

    pub fn position(&self, id: Uuid) -> Option<usize> {
        self.items.iter().position(|item| item.id() == id)
    }

    /// Opens a draft with an empty record.
    pub fn begin_add(&mut self) -> &mut T {
        let draft = self.draft.insert(Draft {
            item: T::default(),
            target: None,
        });
        &mut draft.item
    }

    /// Opens a draft holding a copy of the record with `id`.
    pub fn begin_edit(&mut self, id: Uuid) -> Result<&mut T> {
        let item = self
            .get(id)
            .cloned()
            .ok_or_else(|| TallyError::Input(format!("No {} with id {id}", T::TITLE)))?;
        let draft = self.draft.insert(Draft {
            item,
            target: Some(id),
        });
        Ok(&mut draft.item)
    }

    pub fn draft(&self) -> Option<&Draft<T>> {
        self.draft.as_ref()
    }

    /// Validates and stores the open draft, returning the saved id.
    ///
    /// A draft for an existing record replaces it in place; otherwise the
    /// record is appended. An invalid draft stays open.
    pub fn save(&mut self) -> Result<Uuid> {
        let draft = self
            .draft()
            .ok_or_else(|| TallyError::Input(format!("No {} is being edited", T::TITLE)))?;
        draft.item.validate()?;

        let Some(Draft { item, target }) = self.draft.take() else {
            return Err(TallyError::Input(format!("No {} is being edited", T::TITLE)));
        };
        let id = item.id();

        match target.and_then(|target| self.position(target)) {
            Some(index) => {
                debug!("Replacing {} at position {index}", T::TITLE);
                self.items[index] = item;
            }
            None => self.items.push(item),
        }
        Ok(id)
    }

    /// Discards the open draft.
    pub fn cancel(&mut self) {
        self.draft = None;
    }

    pub fn remove(&mut self, id: Uuid) -> Result<T> {
        let index = self
            .position(id)
            .ok_or_else(|| TallyError::Input(format!("No {} with id {id}", T::TITLE)))?;
        Ok(self.items.remove(index))
    }

    /// Finds a record by full id, by an unambiguous id prefix or by a
    /// one-based `#row` of the list table.
    pub fn resolve(&self, reference: &str) -> Result<Uuid> {
        let reference = reference.trim().to_ascii_lowercase();
        if reference.is_empty() {
            return Err(TallyError::Input(format!("Missing {} id", T::TITLE)));
        }

        if let Some(row) = reference.strip_prefix('#') {
            return row
                .parse::<usize>()
                .ok()
                .and_then(|row| row.checked_sub(1))
                .and_then(|index| self.items.get(index))
                .map(ListItem::id)
                .ok_or_else(|| TallyError::Input(format!("No {} in row {row}", T::TITLE)));
        }

        let mut matches = self
            .items
            .iter()
            .map(ListItem::id)
            .filter(|id| id.to_string().starts_with(&reference));

        match (matches.next(), matches.next()) {
            (Some(id), None) => Ok(id),
            (None, _) => Err(TallyError::Input(format!(
                "No {} matches \"{reference}\"",
                T::TITLE
            ))),
            (Some(_), Some(_)) => Err(TallyError::Input(format!(
                "\"{reference}\" matches more than one {}",
                T::TITLE
            ))),
        }
    }
}
