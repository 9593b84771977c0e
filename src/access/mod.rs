use crate::database::{Instruction, User};
use serde::Serialize;
use uuid::Uuid;

/// href handed out for instructions the viewer cannot open.
pub const DISABLED_HREF: &str = "javascript:void(0);";

/// Splits a stored code string into trimmed, non-empty codes.
pub fn parse_codes(stored: &str) -> Vec<String> {
    stored
        .split(',')
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn join_codes(codes: &[String]) -> String {
    codes.join(",")
}

/// Adds `code` to the user's redeemed codes. Returns whether anything changed.
///
/// A blank code is ignored and an already present code leaves the stored
/// string untouched.
pub fn grant(user: &mut User, code: &str) -> bool {
    let code = code.trim();
    if code.is_empty() {
        return false;
    }

    let mut codes = parse_codes(&user.referral_codes);
    if codes.iter().any(|existing| existing == code) {
        return false;
    }
    codes.push(code.to_string());
    user.referral_codes = join_codes(&codes);
    true
}

/// Both code sets combined, `a` first, without duplicates.
pub fn union(a: &str, b: &str) -> String {
    let mut codes = parse_codes(a);
    for code in parse_codes(b) {
        if !codes.contains(&code) {
            codes.push(code);
        }
    }
    join_codes(&codes)
}

pub fn has_code(user: &User, code: &str) -> bool {
    parse_codes(&user.referral_codes)
        .iter()
        .any(|existing| existing == code)
}

pub fn compute_availability(viewer: Option<&User>, instruction: &Instruction) -> bool {
    match viewer {
        None => false,
        Some(user) if user.is_admin() => true,
        Some(user) => has_code(user, &instruction.qr_code),
    }
}

pub fn compute_href(available: bool, id: Uuid) -> String {
    if available {
        format!("/instruction/{}", id)
    } else {
        DISABLED_HREF.to_string()
    }
}

/// An instruction as one particular viewer sees it.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct InstructionView {
    pub id: Uuid,
    pub title: String,
    pub available: bool,
    pub href: String,
}

pub fn project(viewer: Option<&User>, instructions: &[Instruction]) -> Vec<InstructionView> {
    instructions
        .iter()
        .map(|instruction| {
            let available = compute_availability(viewer, instruction);
            InstructionView {
                id: instruction.id,
                title: instruction.title.clone(),
                available,
                href: compute_href(available, instruction.id),
            }
        })
        .collect()
}
