use super::{AccountError, AccountService};
use crate::access::{self, InstructionView};
use crate::database::{Instruction, InstructionRepository, User, UserRepository};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Redemption {
    /// The viewer can now open the instruction.
    Granted { instruction_id: Uuid },
    /// Anonymous visitor; the code has to be passed along when registering.
    RegistrationRequired { instruction_id: Uuid, code: String },
}

impl AccountService {
    pub async fn redeem_referral(
        &self,
        viewer: Option<User>,
        code: &str,
    ) -> Result<Redemption, AccountError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(AccountError::Validation("Referral code is required".to_string()));
        }

        let instruction = self
            .store
            .find_instruction_by_code(code)
            .await?
            .ok_or(AccountError::InstructionNotFound)?;

        match viewer {
            Some(mut user) => {
                if access::grant(&mut user, code) {
                    self.store.update_user(&user).await?;
                    info!(user_id = %user.id, code, "Referral code redeemed");
                }
                Ok(Redemption::Granted {
                    instruction_id: instruction.id,
                })
            }
            None => Ok(Redemption::RegistrationRequired {
                instruction_id: instruction.id,
                code: code.to_string(),
            }),
        }
    }

    pub async fn visible_instructions(
        &self,
        viewer: Option<&User>,
    ) -> Result<Vec<InstructionView>, AccountError> {
        let instructions = self.store.list_instructions().await?;
        Ok(access::project(viewer, &instructions))
    }

    pub async fn open_instruction(
        &self,
        viewer: Option<&User>,
        id: Uuid,
    ) -> Result<Instruction, AccountError> {
        let instruction = self
            .store
            .find_instruction(id)
            .await?
            .ok_or(AccountError::InstructionNotFound)?;

        if viewer.is_none() {
            return Err(AccountError::Unauthenticated);
        }
        if !access::compute_availability(viewer, &instruction) {
            return Err(AccountError::AccessDenied);
        }
        Ok(instruction)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::fixture;
    use super::*;
    use crate::database::Role;

    #[tokio::test]
    async fn test_redeem_grants_and_opens() {
        let f = fixture();
        let instruction = Instruction::new("Boiler", "text", "QR-1");
        f.store.save_instruction(&instruction).await.unwrap();
        let user = User::new("+79991234567", "hash");
        f.store.insert_user(&user).await.unwrap();

        let denied = f.accounts.open_instruction(Some(&user), instruction.id).await;
        assert!(matches!(denied, Err(AccountError::AccessDenied)));

        let redemption = f
            .accounts
            .redeem_referral(Some(user.clone()), " QR-1 ")
            .await
            .unwrap();
        assert_eq!(
            redemption,
            Redemption::Granted {
                instruction_id: instruction.id
            }
        );

        let user = f.store.find_user(user.id).await.unwrap().unwrap();
        assert_eq!(user.referral_codes, "QR-1");
        let opened = f
            .accounts
            .open_instruction(Some(&user), instruction.id)
            .await
            .unwrap();
        assert_eq!(opened.content, "text");
    }

    #[tokio::test]
    async fn test_anonymous_redeem_requires_registration() {
        let f = fixture();
        let instruction = Instruction::new("Boiler", "text", "QR-1");
        f.store.save_instruction(&instruction).await.unwrap();

        let redemption = f.accounts.redeem_referral(None, "QR-1").await.unwrap();

        assert!(matches!(
            redemption,
            Redemption::RegistrationRequired { ref code, .. } if code == "QR-1"
        ));
        let opened = f.accounts.open_instruction(None, instruction.id).await;
        assert!(matches!(opened, Err(AccountError::Unauthenticated)));
    }

    #[tokio::test]
    async fn test_unknown_code() {
        let f = fixture();
        let result = f.accounts.redeem_referral(None, "NOPE").await;
        assert!(matches!(result, Err(AccountError::InstructionNotFound)));

        let blank = f.accounts.redeem_referral(None, "  ").await;
        assert!(matches!(blank, Err(AccountError::Validation(_))));
    }

    #[tokio::test]
    async fn test_admin_sees_everything() {
        let f = fixture();
        f.store
            .save_instruction(&Instruction::new("Boiler", "text", "QR-1"))
            .await
            .unwrap();
        let mut admin = User::new("+79991234567", "hash");
        admin.role = Role::Admin;

        let views = f.accounts.visible_instructions(Some(&admin)).await.unwrap();
        assert!(views.iter().all(|v| v.available));

        let views = f.accounts.visible_instructions(None).await.unwrap();
        assert!(views.iter().all(|v| !v.available));
    }
}
