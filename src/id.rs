use chrono::{DateTime, Utc};

/// Length of ids produced by [`next_id`].
pub const ID_LEN: usize = 50;

/// A 50-character primary-key default: 15 digits of millisecond timestamp, 32 random
/// hex digits, then `000`.
///
/// Ids sort by creation time. The random part is not meant to be unguessable.
#[must_use]
pub fn next_id() -> String {
    next_id_at(Utc::now())
}

/// [`next_id`] for a given instant. Instants before the Unix epoch clamp to zero.
#[must_use]
pub fn next_id_at(at: DateTime<Utc>) -> String {
    let millis = u64::try_from(at.timestamp_millis()).unwrap_or(0);
    let suffix: u128 = rand::random();
    format!("{millis:015}{suffix:032x}000")
}
