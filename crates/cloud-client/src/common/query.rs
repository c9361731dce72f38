//! Query utilities for the gateway API
//!
//! Provides helpers for encoding path segments and query strings.

/// Percent-encode a single path segment (ARNs contain `:` and `/`)
pub fn encode_segment(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}

/// Build a query string from key/value pairs
pub fn build_query_string(params: &[(&str, &str)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Append query parameters to a path that may already carry some
pub fn with_query(path: &str, params: &[(&str, &str)]) -> String {
    if params.is_empty() {
        return path.to_string();
    }
    let separator = if path.contains('?') { '&' } else { '?' };
    format!("{}{}{}", path, separator, build_query_string(params))
}

/// Encode an id list as the comma-joined `Ids` parameter
pub fn ids_query(path: &str, ids: &[String]) -> String {
    with_query(path, &[("Ids", ids.join(",").as_str())])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_arn_segment() {
        assert_eq!(
            encode_segment("arn:aws:iam::123456789012:policy/f1-role-execution"),
            "arn%3Aaws%3Aiam%3A%3A123456789012%3Apolicy%2Ff1-role-execution"
        );
    }

    #[test]
    fn test_with_query_appends() {
        assert_eq!(with_query("/lambda/functions", &[("Marker", "abc")]), "/lambda/functions?Marker=abc");
        assert_eq!(with_query("/x?Ids=a", &[("Marker", "m 1")]), "/x?Ids=a&Marker=m%201");
        assert_eq!(with_query("/x", &[]), "/x");
    }

    #[test]
    fn test_ids_query() {
        let ids = vec!["subnet-1".to_string(), "subnet-2".to_string()];
        assert_eq!(ids_query("/ec2/subnets", &ids), "/ec2/subnets?Ids=subnet-1%2Csubnet-2");
    }
}
