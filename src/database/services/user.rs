use super::super::types::User;
use super::super::UserRepository;
use super::{to_json, DatabaseError, PostgrestStore, Reply};
use async_trait::async_trait;
use serde_json::json;
use uuid::Uuid;

#[async_trait]
impl UserRepository for PostgrestStore {
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        let reply = execute!(self
            .client
            .from("users")
            .select("*")
            .eq("id", id.to_string())
            .single());

        reply.single()
    }

    async fn find_user_by_phone(&self, phone: &str) -> Result<Option<User>, DatabaseError> {
        let reply = execute!(self
            .client
            .from("users")
            .select("*")
            .eq("phone", phone)
            .single());

        reply.single()
    }

    async fn find_user_by_telegram_id(
        &self,
        telegram_id: i64,
    ) -> Result<Option<User>, DatabaseError> {
        let reply = execute!(self
            .client
            .from("users")
            .select("*")
            .eq("telegram_id", telegram_id.to_string())
            .single());

        reply.single()
    }

    async fn list_users(&self) -> Result<Vec<User>, DatabaseError> {
        let reply = execute!(self
            .client
            .from("users")
            .select("*")
            .order("created_at.asc"));

        reply.rows()
    }

    async fn insert_user(&self, user: &User) -> Result<(), DatabaseError> {
        let reply = execute!(self.client.from("users").insert(to_json(user)?));

        reply.ok()
    }

    async fn update_user(&self, user: &User) -> Result<(), DatabaseError> {
        let reply = execute!(self
            .client
            .from("users")
            .eq("id", user.id.to_string())
            .update(to_json(user)?));

        match reply.affected()? {
            0 => Err(DatabaseError::UserNotFound),
            _ => Ok(()),
        }
    }

    async fn delete_user(&self, id: Uuid) -> Result<(), DatabaseError> {
        let reply = execute!(self
            .client
            .from("users")
            .eq("id", id.to_string())
            .delete());

        match reply.affected()? {
            0 => Err(DatabaseError::UserNotFound),
            _ => Ok(()),
        }
    }

    // Runs in one transaction on the server, see migrations/001_init.sql
    async fn merge_accounts(&self, retained: &User, discarded: Uuid) -> Result<(), DatabaseError> {
        let params = json!({
            "retained": retained,
            "discarded_id": discarded,
        });

        let reply: Reply = execute!(self
            .client
            .rpc("merge_telegram_account", params.to_string()));

        match reply.ok() {
            // raised by the function when either row is gone
            Err(DatabaseError::QueryError(message)) if message.contains("P0002") => {
                Err(DatabaseError::UserNotFound)
            }
            other => other,
        }
    }
}
