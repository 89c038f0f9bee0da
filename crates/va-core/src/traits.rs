//! Core traits shared by the domain models and stores

use crate::types::Id;

/// Trait for entities that have a primary key
pub trait Identifiable {
    fn id(&self) -> Id;
}

/// Trait for records that belong to a single user
pub trait Owned {
    fn owner_id(&self) -> Id;

    fn is_owned_by(&self, user_id: Id) -> bool {
        self.owner_id() == user_id
    }
}
