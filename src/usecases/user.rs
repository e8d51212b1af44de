use std::sync::Arc;

use crate::domain::User;
use crate::error::Result;
use crate::repository::UserRepository;

pub struct UsersRetrievalUseCase {
    users: Arc<dyn UserRepository>,
}

impl UsersRetrievalUseCase {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        UsersRetrievalUseCase { users }
    }

    pub async fn get_all_users(&self) -> Result<Vec<User>> {
        self.users.find_all().await
    }
}
