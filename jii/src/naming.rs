//! Route id conventions.

/// Suffix appended to derived controller class names.
pub const CONTROLLER_SUFFIX: &str = "Controller";

/// Prefix of controller methods backing inline actions.
pub const ACTION_METHOD_PREFIX: &str = "action";

/// `"post-comment"` / `"post_comment"` → `"PostComment"`.
pub fn pascal_case(id: &str) -> String {
    id.split(['-', '_'])
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

/// The conventional controller class name for a controller id.
pub fn controller_class_name(id: &str) -> String {
    format!("{}{CONTROLLER_SUFFIX}", pascal_case(id))
}

/// Whether `id` only uses lowercase alphanumerics, `-` and `_`.
pub fn is_action_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'_')
}

/// The controller method backing the inline action `id`.
pub fn action_method_name(id: &str) -> String {
    format!("{ACTION_METHOD_PREFIX}{}", pascal_case(id))
}

/// Split `route` at its first `/`.
pub fn split_route(route: &str) -> (&str, &str) {
    match route.split_once('/') {
        Some((id, rest)) => (id, rest),
        None => (route, ""),
    }
}
