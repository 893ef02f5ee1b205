//! Token identifiers (`jti`): time-ordered UUIDv7 strings.

use uuid::Uuid;

/// Generate a fresh token identifier.
pub fn new_token_id() -> String {
    Uuid::now_v7().to_string()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn token_id_is_uuidv7() {
        let id = Uuid::parse_str(&new_token_id()).unwrap();
        assert_eq!(id.get_version(), Some(uuid::Version::SortRand));
    }

    #[test]
    fn token_ids_do_not_repeat() {
        let ids: HashSet<String> = (0..1000).map(|_| new_token_id()).collect();
        assert_eq!(ids.len(), 1000);
    }
}
