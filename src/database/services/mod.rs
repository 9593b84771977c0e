use super::errors::DatabaseError;
use postgrest::Postgrest;
use serde::de::DeserializeOwned;
use std::env;

/// Relational store reached through PostgREST (Supabase).
pub struct PostgrestStore {
    pub client: Postgrest,
}

impl PostgrestStore {
    pub fn new(url: &str, service_key: &str) -> Self {
        let rest_url = format!("{}/rest/v1", url.trim_end_matches('/'));
        let client = Postgrest::new(&rest_url)
            .insert_header("apikey", service_key)
            .insert_header("Authorization", format!("Bearer {}", service_key));

        Self { client }
    }

    pub fn from_env() -> Result<Self, DatabaseError> {
        let url = env::var("SUPABASE_URL")
            .map_err(|_| DatabaseError::ConnectionError("SUPABASE_URL not found".to_string()))?;
        let service_key = env::var("SUPABASE_KEY")
            .map_err(|_| DatabaseError::ConnectionError("SUPABASE_KEY not found".to_string()))?;

        Ok(Self::new(&url, &service_key))
    }
}

// Sends a postgrest request and reads the whole reply
macro_rules! execute {
    ($request:expr) => {{
        let response = $request
            .execute()
            .await
            .map_err(|e| DatabaseError::QueryError(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| DatabaseError::QueryError(e.to_string()))?;
        Reply { status, body }
    }};
}

pub(super) struct Reply {
    status: u16,
    body: String,
}

impl Reply {
    // Non-2xx replies become errors; 409 is PostgREST's unique violation
    fn check(self) -> Result<Self, DatabaseError> {
        match self.status {
            200..=299 => Ok(self),
            409 => Err(DatabaseError::Conflict(self.body)),
            status => Err(DatabaseError::QueryError(format!("{}: {}", status, self.body))),
        }
    }

    pub(super) fn ok(self) -> Result<(), DatabaseError> {
        self.check().map(|_| ())
    }

    /// Reads the reply of a `.single()` request.
    pub(super) fn single<T: DeserializeOwned>(self) -> Result<Option<T>, DatabaseError> {
        if self.status == 406 {
            // No rows found
            return Ok(None);
        }
        let reply = self.check()?;
        let row: T = serde_json::from_str(&reply.body)
            .map_err(|e| DatabaseError::QueryError(e.to_string()))?;
        Ok(Some(row))
    }

    pub(super) fn rows<T: DeserializeOwned>(self) -> Result<Vec<T>, DatabaseError> {
        let reply = self.check()?;
        serde_json::from_str(&reply.body).map_err(|e| DatabaseError::QueryError(e.to_string()))
    }

    /// Number of rows returned by a mutating request.
    pub(super) fn affected(self) -> Result<usize, DatabaseError> {
        let rows: Vec<serde_json::Value> = self.rows()?;
        Ok(rows.len())
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, DatabaseError> {
    serde_json::to_string(value).map_err(|e| DatabaseError::QueryError(e.to_string()))
}

mod instruction;
mod user;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{Instruction, InstructionRepository, User, UserRepository};
    use mockito::Matcher;
    use uuid::Uuid;

    fn store(server: &mockito::ServerGuard) -> PostgrestStore {
        PostgrestStore::new(&server.url(), "service-key")
    }

    #[tokio::test]
    async fn test_find_by_phone_returns_none_on_406() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/rest/v1/users")
            .match_query(Matcher::UrlEncoded("phone".into(), "eq.+79991234567".into()))
            .match_header("apikey", "service-key")
            .with_status(406)
            .create_async()
            .await;

        let result = store(&server).find_user_by_phone("+79991234567").await;

        assert!(result.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_by_phone_parses_row() {
        let mut server = mockito::Server::new_async().await;
        let user = User::new("+79991234567", "hash");
        server
            .mock("GET", "/rest/v1/users")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(serde_json::to_string(&user).unwrap())
            .create_async()
            .await;

        let found = store(&server)
            .find_user_by_phone("+79991234567")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(found, user);
    }

    #[tokio::test]
    async fn test_insert_conflict() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/rest/v1/users")
            .with_status(409)
            .with_body(r#"{"code":"23505","message":"duplicate key value"}"#)
            .create_async()
            .await;

        let result = store(&server)
            .insert_user(&User::new("+79991234567", "hash"))
            .await;

        assert!(matches!(result, Err(DatabaseError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_merge_calls_single_function() {
        let mut server = mockito::Server::new_async().await;
        let retained = User::new("+79991234567", "hash");
        let discarded = Uuid::new_v4();
        let mock = server
            .mock("POST", "/rest/v1/rpc/merge_telegram_account")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "discarded_id": discarded,
                "retained": { "id": retained.id, "phone": "+79991234567" }
            })))
            .with_status(204)
            .create_async()
            .await;

        store(&server)
            .merge_accounts(&retained, discarded)
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_delete_missing_instruction() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("DELETE", "/rest/v1/instructions")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let result = store(&server).delete_instruction(Uuid::new_v4()).await;

        assert!(matches!(result, Err(DatabaseError::InstructionNotFound)));
    }

    #[tokio::test]
    async fn test_list_instructions() {
        let mut server = mockito::Server::new_async().await;
        let instructions = vec![Instruction::new("Boiler", "text", "QR-1")];
        server
            .mock("GET", "/rest/v1/instructions")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(serde_json::to_string(&instructions).unwrap())
            .create_async()
            .await;

        let listed = store(&server).list_instructions().await.unwrap();

        assert_eq!(listed, instructions);
    }
}
