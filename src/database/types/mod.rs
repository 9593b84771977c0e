mod instruction;
mod user;

pub use instruction::Instruction;
pub use user::{Role, User, UserProfile};
