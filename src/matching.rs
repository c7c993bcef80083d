//! Segment-based path matching for route records
//!
//! Record paths are full templates (`/users/:id/posts`), so matching is a
//! whole-path comparison rather than a prefix walk. Literal segments compare
//! exactly, `:param` segments capture one segment, `:param?` may be skipped,
//! and `*` captures everything that remains (possibly nothing) as
//! [`CATCH_ALL_PARAM`](crate::params::CATCH_ALL_PARAM).
//!
//! # Design
//!
//! - Split paths by '/' into segments, ignoring empty ones
//! - Backtrack over optional params so `/a/:b?/c` matches both `/a/c` and `/a/x/c`
//! - Captured values are percent-decoded; malformed escapes are kept verbatim

use crate::params::{parse_param_segment, RouteParams};
use percent_encoding::percent_decode_str;

/// Match `path` against the template `template`, returning the captured params.
///
/// # Examples
///
/// ```
/// use nav_transition::matching::match_path;
///
/// let params = match_path("/user/123/profile", "/user/:id/profile").unwrap();
/// assert_eq!(params.get("id"), Some(&"123".to_string()));
///
/// assert!(match_path("/user", "/user/:id").is_none());
/// assert!(match_path("/files/a/b", "/files/*").is_some());
/// ```
pub fn match_path(path: &str, template: &str) -> Option<RouteParams> {
    let path_segments = split_path(path);
    let template_segments = split_path(template);

    // Early exit: more required template segments than path segments
    let required = template_segments
        .iter()
        .filter(|seg| !is_optional_segment(seg) && !is_wildcard_segment(seg))
        .count();
    if required > path_segments.len() {
        return None;
    }

    let mut params = RouteParams::new();
    if match_segments(&template_segments, &path_segments, &mut params) {
        Some(params)
    } else {
        None
    }
}

fn match_segments(template: &[&str], path: &[&str], params: &mut RouteParams) -> bool {
    let Some((&head, rest)) = template.split_first() else {
        return path.is_empty();
    };

    if is_wildcard_segment(head) {
        params.insert(
            crate::params::CATCH_ALL_PARAM.to_string(),
            path.iter().map(|seg| decode_segment(seg)).collect::<Vec<_>>().join("/"),
        );
        return true;
    }

    match parse_param_segment(head) {
        Some(param) => {
            if let Some((&value, path_rest)) = path.split_first() {
                let mut attempt = params.clone();
                attempt.insert(param.name.to_string(), decode_segment(value));
                if match_segments(rest, path_rest, &mut attempt) {
                    *params = attempt;
                    return true;
                }
            }
            param.optional && match_segments(rest, path, params)
        }
        None => match path.split_first() {
            Some((&value, path_rest)) if value == head => match_segments(rest, path_rest, params),
            _ => false,
        },
    }
}

fn decode_segment(segment: &str) -> String {
    percent_decode_str(segment)
        .decode_utf8()
        .map_or_else(|_| segment.to_string(), |decoded| decoded.into_owned())
}

/// Split a path into segments, filtering empty segments
///
/// # Examples
///
/// ```
/// use nav_transition::matching::split_path;
///
/// assert_eq!(split_path("/users/123"), vec!["users", "123"]);
/// assert!(split_path("/").is_empty());
/// assert_eq!(split_path("/users/"), vec!["users"]);
/// ```
pub fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Check if a template segment is a parameter
pub fn is_param_segment(segment: &str) -> bool {
    segment.starts_with(':')
}

fn is_optional_segment(segment: &str) -> bool {
    is_param_segment(segment) && segment.ends_with('?')
}

/// Check if a template segment is the catch-all
pub fn is_wildcard_segment(segment: &str) -> bool {
    segment == "*"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::CATCH_ALL_PARAM;

    #[test]
    fn test_split_path() {
        assert_eq!(split_path("/users/123"), vec!["users", "123"]);
        assert_eq!(
            split_path("/users/123/profile"),
            vec!["users", "123", "profile"]
        );
        assert_eq!(split_path("/"), Vec::<&str>::new());
        assert_eq!(split_path(""), Vec::<&str>::new());
        assert_eq!(split_path("users"), vec!["users"]);
    }

    #[test]
    fn test_literal_match_is_exact() {
        assert!(match_path("/about", "/about").is_some());
        assert!(match_path("/about/", "/about").is_some());
        assert!(match_path("/about/team", "/about").is_none());
        assert!(match_path("/", "/about").is_none());
        assert!(match_path("/", "/").is_some());
    }

    #[test]
    fn test_param_capture_and_decode() {
        let params = match_path("/u/a%20b", "/u/:name").unwrap();
        assert_eq!(params.get("name"), Some(&"a b".to_string()));

        let params = match_path("/u/%zz", "/u/:name").unwrap();
        assert_eq!(params.get("name"), Some(&"%zz".to_string()));
    }

    #[test]
    fn test_optional_param() {
        let with = match_path("/a/x/c", "/a/:b?/c").unwrap();
        assert_eq!(with.get("b"), Some(&"x".to_string()));

        let without = match_path("/a/c", "/a/:b?/c").unwrap();
        assert!(!without.contains("b"));
    }

    #[test]
    fn test_catch_all() {
        let params = match_path("/files/docs/intro", "/files/*").unwrap();
        assert_eq!(params.get(CATCH_ALL_PARAM), Some(&"docs/intro".to_string()));

        let params = match_path("/anything/at/all", "*").unwrap();
        assert_eq!(params.get(CATCH_ALL_PARAM), Some(&"anything/at/all".to_string()));

        let params = match_path("/files", "/files/*").unwrap();
        assert_eq!(params.get(CATCH_ALL_PARAM), Some(&String::new()));
    }

    #[test]
    fn test_segment_kinds() {
        assert!(is_param_segment(":id"));
        assert!(!is_param_segment("users"));
        assert!(is_wildcard_segment("*"));
        assert!(!is_wildcard_segment(":id"));
    }
}
