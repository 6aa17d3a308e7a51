/// Check whether `id` appears on an allow-list.
///
/// Entries match case-insensitively, either exactly or as a glob with `*`
/// standing for any run of characters. An empty list admits nobody: admin
/// and NSFW lists are opt-in.
pub fn is_listed(id: &str, list: &[String]) -> bool {
    let id = id.to_lowercase();
    list.iter().any(|entry| {
        let entry = entry.trim().to_lowercase();
        if entry.contains('*') {
            glob_match(&entry, &id)
        } else {
            entry == id
        }
    })
}

fn glob_match(pattern: &str, text: &str) -> bool {
    let mut segments: Vec<&str> = pattern.split('*').collect();
    let Some(last) = segments.pop() else {
        return pattern == text;
    };
    if segments.is_empty() {
        return pattern == text;
    }

    // Leading segment is anchored at the start.
    let Some(mut rest) = text.strip_prefix(segments[0]) else {
        return false;
    };
    for segment in &segments[1..] {
        if segment.is_empty() {
            continue;
        }
        match rest.find(segment) {
            Some(idx) => rest = &rest[idx + segment.len()..],
            None => return false,
        }
    }
    // Trailing segment is anchored at the end.
    rest.ends_with(last)
}
