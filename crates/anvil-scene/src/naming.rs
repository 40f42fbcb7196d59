//! Unique name generation

/// Return `base` if it is free, otherwise the first free `base.NNN`.
pub fn unique_name(base: &str, exists: impl Fn(&str) -> bool) -> String {
    if !exists(base) {
        return base.to_string();
    }

    let mut counter = 1u32;
    loop {
        let candidate = format!("{}.{:03}", base, counter);
        if !exists(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}

/// If `name` ends with a `.NNN` counter suffix, return the name without it
pub fn strip_join_suffix(name: &str) -> Option<&str> {
    let (base, counter) = name.rsplit_once('.')?;
    if base.is_empty() || counter.len() != 3 || !counter.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_name_is_kept() {
        assert_eq!(unique_name("gun", |_| false), "gun");
    }

    #[test]
    fn clashing_names_get_counters() {
        let taken = ["gun", "gun.001"];
        assert_eq!(unique_name("gun", |n| taken.contains(&n)), "gun.002");
        assert_eq!(unique_name("knife", |n| taken.contains(&n)), "knife");
    }

    #[test]
    fn strips_counter_suffix() {
        assert_eq!(strip_join_suffix("tag_origin.001"), Some("tag_origin"));
        assert_eq!(strip_join_suffix("j_gun.012"), Some("j_gun"));
        assert_eq!(strip_join_suffix("j_gun"), None);
        assert_eq!(strip_join_suffix("j_gun.1"), None);
        assert_eq!(strip_join_suffix(".001"), None);
    }
}
