use serde::Deserialize;

use crate::config::ApiConfig;

/// Raw `?limit=&offset=` values. Kept as strings so malformed input falls
/// back to defaults instead of rejecting the request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<String>,
    pub offset: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl PageQuery {
    pub fn resolve(&self, api: &ApiConfig) -> Page {
        Page {
            limit: parse_limit(self.limit.as_deref(), api.default_page_size, api.max_page_size),
            offset: parse_offset(self.offset.as_deref()),
        }
    }
}

fn parse_limit(raw: Option<&str>, default: i64, max: i64) -> i64 {
    match raw.and_then(|v| v.trim().parse::<i64>().ok()) {
        Some(limit) if limit > 0 => limit.min(max),
        _ => default.min(max),
    }
}

fn parse_offset(raw: Option<&str>) -> i64 {
    raw.and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|offset| *offset > 0)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api() -> ApiConfig {
        ApiConfig {
            default_page_size: 50,
            max_page_size: 100,
            max_request_size_bytes: 1024,
        }
    }

    fn page(limit: Option<&str>, offset: Option<&str>) -> Page {
        PageQuery {
            limit: limit.map(str::to_string),
            offset: offset.map(str::to_string),
        }
        .resolve(&api())
    }

    #[test]
    fn defaults_when_absent() {
        assert_eq!(page(None, None), Page { limit: 50, offset: 0 });
    }

    #[test]
    fn limit_is_clamped() {
        assert_eq!(page(Some("10"), None).limit, 10);
        assert_eq!(page(Some("1000"), None).limit, 100);
        assert_eq!(page(Some("0"), None).limit, 50);
        assert_eq!(page(Some("-5"), None).limit, 50);
        assert_eq!(page(Some("ten"), None).limit, 50);
    }

    #[test]
    fn offset_never_negative() {
        assert_eq!(page(None, Some("20")).offset, 20);
        assert_eq!(page(None, Some("-1")).offset, 0);
        assert_eq!(page(None, Some("abc")).offset, 0);
    }
}
