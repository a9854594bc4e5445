//! Typed access to the SQLite collections.
//!
//! Single-statement operations are generic over [`sqlx::SqliteExecutor`], so
//! they run against the pool or inside a transaction alike. Operations that
//! read before they write take a `&mut SqliteConnection`; pass `&mut *tx` to
//! keep them inside a transaction.

pub mod exercise_days;
pub mod exercises;
pub mod settings;
pub mod trainings;

/// Comparison form of a display name. Names are unique ignoring case.
pub fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Trimmed name, rejected when blank.
fn clean_name(kind: &'static str, name: &str) -> crate::Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(crate::Error::Validation(format!("{kind} name must not be empty")));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_keys_ignore_case_and_padding() {
        assert_eq!(name_key("  Bench Press "), "bench press");
        assert_eq!(name_key("RÜCKEN"), name_key("rücken"));
    }
}
