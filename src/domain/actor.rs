/// Who is performing an operation, as far as ownership checks care.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: i32,
    pub is_manager: bool,
}

impl Actor {
    /// Owners may read and write; managers may read anything.
    pub fn can_view(&self, owner_id: i32) -> bool {
        self.is_manager || self.user_id == owner_id
    }

    pub fn can_edit(&self, owner_id: i32) -> bool {
        self.user_id == owner_id
    }
}
