use rand::{Rng, RngCore, distributions::Alphanumeric, rngs::OsRng};
use tracing::warn;
use uuid::{Builder, Uuid};

pub const ACCOUNT_PREFIX: &str = "acc";
pub const CONTACT_PREFIX: &str = "con";
pub const OPPORTUNITY_PREFIX: &str = "opp";

/// New record id: `"{prefix}-{uuid}"`, or a bare UUID without a prefix.
/// Falls back to an 8-character PRNG token when OS randomness fails.
pub fn generate(prefix: Option<&str>) -> String {
    let body = os_uuid()
        .map(|id| id.to_string())
        .unwrap_or_else(fallback_token);
    match prefix {
        Some(prefix) if !prefix.is_empty() => format!("{prefix}-{body}"),
        _ => body,
    }
}

fn os_uuid() -> Option<Uuid> {
    let mut bytes = [0u8; 16];
    match OsRng.try_fill_bytes(&mut bytes) {
        Ok(()) => Some(Builder::from_random_bytes(bytes).into_uuid()),
        Err(err) => {
            warn!(error = %err, "os randomness unavailable, using fallback id source");
            None
        }
    }
}

fn fallback_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(|byte| char::from(byte).to_ascii_lowercase())
        .collect()
}
