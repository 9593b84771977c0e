use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Instruction {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub qr_code: String,
}

impl Instruction {
    pub fn new(title: &str, content: &str, qr_code: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.to_string(),
            content: content.to_string(),
            qr_code: qr_code.to_string(),
        }
    }
}
