//! Index generation naming

/// Name of the generation of `index` created at `millis` (Unix epoch ms)
pub fn generation_name(index: &str, millis: i64) -> String {
    format!("{}_{}", index, millis)
}

/// Creation time of `name` if it is a generation of `index`
pub fn parse_generation(index: &str, name: &str) -> Option<i64> {
    let suffix = name.strip_prefix(index)?.strip_prefix('_')?;
    if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    suffix.parse().ok()
}

pub fn is_generation_of(index: &str, name: &str) -> bool {
    parse_generation(index, name).is_some()
}
