//! Human-readable contract numbers: `CON-<year>-<4 digits>`.

use chrono::{Datelike, Utc};
use rand::Rng;

pub const CONTRACT_NUMBER_PREFIX: &str = "CON";

/// Not guaranteed unique; the schema's unique constraint is the backstop.
pub fn generate_contract_number() -> String {
    format_contract_number(Utc::now().year(), &mut rand::thread_rng())
}

pub fn format_contract_number<R: Rng + ?Sized>(year: i32, rng: &mut R) -> String {
    let suffix: u16 = rng.gen_range(1000..=9999);
    format!("{CONTRACT_NUMBER_PREFIX}-{year}-{suffix}")
}
