use super::super::types::Instruction;
use super::super::InstructionRepository;
use super::{to_json, DatabaseError, PostgrestStore, Reply};
use async_trait::async_trait;
use uuid::Uuid;

#[async_trait]
impl InstructionRepository for PostgrestStore {
    async fn list_instructions(&self) -> Result<Vec<Instruction>, DatabaseError> {
        let reply = execute!(self
            .client
            .from("instructions")
            .select("*")
            .order("title.asc"));

        reply.rows()
    }

    async fn find_instruction(&self, id: Uuid) -> Result<Option<Instruction>, DatabaseError> {
        let reply = execute!(self
            .client
            .from("instructions")
            .select("*")
            .eq("id", id.to_string())
            .single());

        reply.single()
    }

    async fn find_instruction_by_code(
        &self,
        qr_code: &str,
    ) -> Result<Option<Instruction>, DatabaseError> {
        let reply = execute!(self
            .client
            .from("instructions")
            .select("*")
            .eq("qr_code", qr_code)
            .single());

        reply.single()
    }

    async fn save_instruction(&self, instruction: &Instruction) -> Result<(), DatabaseError> {
        let reply: Reply = execute!(self
            .client
            .from("instructions")
            .upsert(to_json(instruction)?)
            .on_conflict("id"));

        reply.ok()
    }

    async fn delete_instruction(&self, id: Uuid) -> Result<(), DatabaseError> {
        let reply = execute!(self
            .client
            .from("instructions")
            .eq("id", id.to_string())
            .delete());

        match reply.affected()? {
            0 => Err(DatabaseError::InstructionNotFound),
            _ => Ok(()),
        }
    }
}
