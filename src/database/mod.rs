use async_trait::async_trait;
use uuid::Uuid;

mod errors;
mod memory;
mod services;
mod types;

pub use errors::DatabaseError;
pub use memory::MemoryStore;
pub use services::PostgrestStore;
pub use types::{Instruction, Role, User, UserProfile};

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, DatabaseError>;

    /// `phone` must already be normalized.
    async fn find_user_by_phone(&self, phone: &str) -> Result<Option<User>, DatabaseError>;

    async fn find_user_by_telegram_id(
        &self,
        telegram_id: i64,
    ) -> Result<Option<User>, DatabaseError>;

    async fn list_users(&self) -> Result<Vec<User>, DatabaseError>;

    async fn insert_user(&self, user: &User) -> Result<(), DatabaseError>;

    async fn update_user(&self, user: &User) -> Result<(), DatabaseError>;

    async fn delete_user(&self, id: Uuid) -> Result<(), DatabaseError>;

    /// Stores `retained` and deletes `discarded` as one unit: either both
    /// happen or neither does.
    async fn merge_accounts(&self, retained: &User, discarded: Uuid) -> Result<(), DatabaseError>;
}

#[async_trait]
pub trait InstructionRepository: Send + Sync {
    async fn list_instructions(&self) -> Result<Vec<Instruction>, DatabaseError>;

    async fn find_instruction(&self, id: Uuid) -> Result<Option<Instruction>, DatabaseError>;

    async fn find_instruction_by_code(
        &self,
        qr_code: &str,
    ) -> Result<Option<Instruction>, DatabaseError>;

    /// Inserts or replaces by id.
    async fn save_instruction(&self, instruction: &Instruction) -> Result<(), DatabaseError>;

    async fn delete_instruction(&self, id: Uuid) -> Result<(), DatabaseError>;
}

pub trait Store: UserRepository + InstructionRepository {}

impl<T: UserRepository + InstructionRepository> Store for T {}
