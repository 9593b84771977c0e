use super::{AccountError, AccountService};
use crate::database::{Instruction, InstructionRepository, User, UserProfile, UserRepository};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

/// Create-or-update form for an instruction. Without an id a new one is made.
#[derive(Debug, Clone, Deserialize)]
pub struct InstructionDraft {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub title: String,
    pub content: String,
    pub qr_code: String,
}

pub fn require_admin(viewer: Option<&User>) -> Result<&User, AccountError> {
    match viewer {
        None => Err(AccountError::Unauthenticated),
        Some(user) if user.is_admin() => Ok(user),
        Some(_) => Err(AccountError::AccessDenied),
    }
}

impl AccountService {
    pub async fn admin_list_users(
        &self,
        viewer: Option<&User>,
    ) -> Result<Vec<UserProfile>, AccountError> {
        require_admin(viewer)?;
        let users = self.store.list_users().await?;
        Ok(users.iter().map(UserProfile::from).collect())
    }

    pub async fn admin_list_instructions(
        &self,
        viewer: Option<&User>,
    ) -> Result<Vec<Instruction>, AccountError> {
        require_admin(viewer)?;
        Ok(self.store.list_instructions().await?)
    }

    pub async fn admin_save_instruction(
        &self,
        viewer: Option<&User>,
        draft: InstructionDraft,
    ) -> Result<Instruction, AccountError> {
        let admin = require_admin(viewer)?;

        let title = draft.title.trim();
        let qr_code = draft.qr_code.trim();
        if title.is_empty() || qr_code.is_empty() {
            return Err(AccountError::Validation(
                "Title and QR code are required".to_string(),
            ));
        }

        let instruction = match draft.id {
            Some(id) => {
                let mut instruction = self
                    .store
                    .find_instruction(id)
                    .await?
                    .ok_or(AccountError::InstructionNotFound)?;
                instruction.title = title.to_string();
                instruction.content = draft.content;
                instruction.qr_code = qr_code.to_string();
                instruction
            }
            None => Instruction::new(title, &draft.content, qr_code),
        };
        self.store.save_instruction(&instruction).await?;

        info!(admin_id = %admin.id, instruction_id = %instruction.id, "Instruction saved");
        Ok(instruction)
    }

    pub async fn admin_delete_instruction(
        &self,
        viewer: Option<&User>,
        id: Uuid,
    ) -> Result<(), AccountError> {
        let admin = require_admin(viewer)?;
        self.store.delete_instruction(id).await.map_err(|e| match e {
            crate::database::DatabaseError::InstructionNotFound => {
                AccountError::InstructionNotFound
            }
            other => AccountError::Database(other),
        })?;

        info!(admin_id = %admin.id, instruction_id = %id, "Instruction deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::fixture;
    use super::*;
    use crate::database::Role;

    fn admin() -> User {
        let mut user = User::new("+79990000001", "hash");
        user.role = Role::Admin;
        user
    }

    fn draft(id: Option<Uuid>, title: &str, qr_code: &str) -> InstructionDraft {
        InstructionDraft {
            id,
            title: title.to_string(),
            content: "content".to_string(),
            qr_code: qr_code.to_string(),
        }
    }

    #[test]
    fn test_require_admin() {
        let user = User::new("+79990000002", "hash");
        assert!(matches!(require_admin(None), Err(AccountError::Unauthenticated)));
        assert!(matches!(
            require_admin(Some(&user)),
            Err(AccountError::AccessDenied)
        ));
        assert!(require_admin(Some(&admin())).is_ok());
    }

    #[tokio::test]
    async fn test_save_update_and_delete() {
        let f = fixture();
        let admin = admin();

        let created = f
            .accounts
            .admin_save_instruction(Some(&admin), draft(None, " Boiler ", "QR-1"))
            .await
            .unwrap();
        assert_eq!(created.title, "Boiler");

        let updated = f
            .accounts
            .admin_save_instruction(Some(&admin), draft(Some(created.id), "Boiler v2", "QR-1"))
            .await
            .unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(
            f.accounts
                .admin_list_instructions(Some(&admin))
                .await
                .unwrap()
                .len(),
            1
        );

        f.accounts
            .admin_delete_instruction(Some(&admin), created.id)
            .await
            .unwrap();
        let again = f
            .accounts
            .admin_delete_instruction(Some(&admin), created.id)
            .await;
        assert!(matches!(again, Err(AccountError::InstructionNotFound)));
    }

    #[tokio::test]
    async fn test_blank_fields_and_duplicate_code() {
        let f = fixture();
        let admin = admin();

        let blank = f
            .accounts
            .admin_save_instruction(Some(&admin), draft(None, "Boiler", " "))
            .await;
        assert!(matches!(blank, Err(AccountError::Validation(_))));

        f.accounts
            .admin_save_instruction(Some(&admin), draft(None, "Boiler", "QR-1"))
            .await
            .unwrap();
        let duplicate = f
            .accounts
            .admin_save_instruction(Some(&admin), draft(None, "Heater", "QR-1"))
            .await;
        assert!(matches!(
            duplicate,
            Err(AccountError::Database(crate::database::DatabaseError::Conflict(_)))
        ));
    }

    #[tokio::test]
    async fn test_user_listing_hides_hashes() {
        let f = fixture();
        f.store
            .insert_user(&User::new("+79990000002", "secret-hash"))
            .await
            .unwrap();

        let profiles = f.accounts.admin_list_users(Some(&admin())).await.unwrap();
        assert_eq!(profiles.len(), 1);
        let json = serde_json::to_string(&profiles).unwrap();
        assert!(!json.contains("secret-hash"));

        let denied = f
            .accounts
            .admin_list_users(Some(&User::new("+79990000003", "hash")))
            .await;
        assert!(matches!(denied, Err(AccountError::AccessDenied)));
    }
}
