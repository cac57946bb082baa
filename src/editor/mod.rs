//! Editing of a template's sub-entity lists.
//!
//! Every tab of the template editor is an [`EditableList`] over one
//! [`ListItem`] type. Fields are addressed by their wire names so the same
//! code path edits every entity.

mod fields;
mod items;
mod list;

pub use fields::{decrement, increment, set_field};
pub use items::{group_by_role, ItemKind};
pub use list::{item_key, EditableList, ListItem};
