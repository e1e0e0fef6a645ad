//! Cache key helpers.
//!
//! Keys follow `<entity>:<id>:<variant>` so a whole entity can be dropped
//! with a single `<entity>:*` or `<entity>:<id>:*` pattern delete.

/// `<entity>:<id>:<variant>`
pub fn cache_key(entity: &str, id: impl std::fmt::Display, variant: &str) -> String {
    format!("{}:{}:{}", entity, id, variant)
}

/// Glob covering every key of an entity type.
pub fn entity_pattern(entity: &str) -> String {
    format!("{}:*", entity)
}

/// Glob covering every variant cached for one entity.
pub fn record_pattern(entity: &str, id: impl std::fmt::Display) -> String {
    format!("{}:{}:*", entity, id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::pattern::glob_to_regex;

    #[test]
    fn test_cache_key_layout() {
        assert_eq!(cache_key("paper", 42, "meta"), "paper:42:meta");
        assert_eq!(cache_key("user", "abc", "profile"), "user:abc:profile");
    }

    #[test]
    fn test_patterns_cover_their_keys() {
        let key = cache_key("paper", 7, "citations");

        assert!(glob_to_regex(&entity_pattern("paper")).unwrap().is_match(&key));
        assert!(glob_to_regex(&record_pattern("paper", 7)).unwrap().is_match(&key));
        assert!(!glob_to_regex(&record_pattern("paper", 70)).unwrap().is_match(&key));
        assert!(!glob_to_regex(&entity_pattern("user")).unwrap().is_match(&key));
    }
}
