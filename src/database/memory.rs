use super::{DatabaseError, Instruction, InstructionRepository, User, UserRepository};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    instructions: HashMap<Uuid, Instruction>,
}

impl Tables {
    // phone and telegram id are unique across users; `ignore` lists rows
    // that are being replaced in the same operation
    fn check_user_unique(&self, user: &User, ignore: &[Uuid]) -> Result<(), DatabaseError> {
        for other in self.users.values() {
            if other.id == user.id || ignore.contains(&other.id) {
                continue;
            }
            if other.phone == user.phone {
                return Err(DatabaseError::Conflict(format!(
                    "phone {} already registered",
                    user.phone
                )));
            }
            if user.telegram_id.is_some() && other.telegram_id == user.telegram_id {
                return Err(DatabaseError::Conflict(
                    "telegram account already linked".to_string(),
                ));
            }
        }
        Ok(())
    }

    fn check_instruction_unique(&self, instruction: &Instruction) -> Result<(), DatabaseError> {
        let taken = self
            .instructions
            .values()
            .any(|other| other.id != instruction.id && other.qr_code == instruction.qr_code);
        if taken {
            return Err(DatabaseError::Conflict(format!(
                "qr code {} already in use",
                instruction.qr_code
            )));
        }
        Ok(())
    }
}

/// Process-local store. Backs tests and the `memory` database backend.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        Ok(self.tables.lock().await.users.get(&id).cloned())
    }

    async fn find_user_by_phone(&self, phone: &str) -> Result<Option<User>, DatabaseError> {
        let tables = self.tables.lock().await;
        Ok(tables.users.values().find(|u| u.phone == phone).cloned())
    }

    async fn find_user_by_telegram_id(
        &self,
        telegram_id: i64,
    ) -> Result<Option<User>, DatabaseError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.telegram_id == Some(telegram_id))
            .cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, DatabaseError> {
        let tables = self.tables.lock().await;
        let mut users: Vec<User> = tables.users.values().cloned().collect();
        users.sort_by_key(|u| u.created_at);
        Ok(users)
    }

    async fn insert_user(&self, user: &User) -> Result<(), DatabaseError> {
        let mut tables = self.tables.lock().await;
        if tables.users.contains_key(&user.id) {
            return Err(DatabaseError::Conflict(format!("user {} exists", user.id)));
        }
        tables.check_user_unique(user, &[])?;
        tables.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn update_user(&self, user: &User) -> Result<(), DatabaseError> {
        let mut tables = self.tables.lock().await;
        if !tables.users.contains_key(&user.id) {
            return Err(DatabaseError::UserNotFound);
        }
        tables.check_user_unique(user, &[])?;
        tables.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn delete_user(&self, id: Uuid) -> Result<(), DatabaseError> {
        let mut tables = self.tables.lock().await;
        tables
            .users
            .remove(&id)
            .map(|_| ())
            .ok_or(DatabaseError::UserNotFound)
    }

    async fn merge_accounts(&self, retained: &User, discarded: Uuid) -> Result<(), DatabaseError> {
        let mut tables = self.tables.lock().await;
        // validate everything before touching either row
        if !tables.users.contains_key(&retained.id) || !tables.users.contains_key(&discarded) {
            return Err(DatabaseError::UserNotFound);
        }
        tables.check_user_unique(retained, &[discarded])?;

        tables.users.remove(&discarded);
        tables.users.insert(retained.id, retained.clone());
        Ok(())
    }
}

#[async_trait]
impl InstructionRepository for MemoryStore {
    async fn list_instructions(&self) -> Result<Vec<Instruction>, DatabaseError> {
        let tables = self.tables.lock().await;
        let mut instructions: Vec<Instruction> = tables.instructions.values().cloned().collect();
        instructions.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(instructions)
    }

    async fn find_instruction(&self, id: Uuid) -> Result<Option<Instruction>, DatabaseError> {
        Ok(self.tables.lock().await.instructions.get(&id).cloned())
    }

    async fn find_instruction_by_code(
        &self,
        qr_code: &str,
    ) -> Result<Option<Instruction>, DatabaseError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .instructions
            .values()
            .find(|i| i.qr_code == qr_code)
            .cloned())
    }

    async fn save_instruction(&self, instruction: &Instruction) -> Result<(), DatabaseError> {
        let mut tables = self.tables.lock().await;
        tables.check_instruction_unique(instruction)?;
        tables
            .instructions
            .insert(instruction.id, instruction.clone());
        Ok(())
    }

    async fn delete_instruction(&self, id: Uuid) -> Result<(), DatabaseError> {
        let mut tables = self.tables.lock().await;
        tables
            .instructions
            .remove(&id)
            .map(|_| ())
            .ok_or(DatabaseError::InstructionNotFound)
    }
}
