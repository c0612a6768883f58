//! Route-label normalization for HTTP request metrics.
//!
//! Raw request paths carry unbounded values (block numbers, hashes, UUIDs)
//! that must never reach a metric label. Paths are normalized segment by
//! segment, then capped against an allow-list of known route templates.

use std::collections::HashSet;

/// Replace high-cardinality path segments with placeholders.
///
/// Most-specific first: UUID, `0x`-prefixed hex, 64-char hex, 40-char hex,
/// decimal integer.
pub fn normalize_route(path: &str) -> String {
    path.split('/')
        .map(normalize_segment)
        .collect::<Vec<_>>()
        .join("/")
}

fn normalize_segment(segment: &str) -> &str {
    if segment.is_empty() {
        return segment;
    }
    if is_uuid(segment) {
        return ":id";
    }
    if let Some(rest) = segment.strip_prefix("0x").or_else(|| segment.strip_prefix("0X")) {
        if !rest.is_empty() && is_hex(rest) {
            return if rest.len() == 40 { ":address" } else { ":hash" };
        }
    }
    if segment.len() == 64 && is_hex(segment) {
        return ":hash";
    }
    if segment.len() == 40 && is_hex(segment) {
        return ":address";
    }
    if segment.bytes().all(|b| b.is_ascii_digit()) {
        return ":id";
    }
    segment
}

fn is_hex(value: &str) -> bool {
    value.bytes().all(|b| b.is_ascii_hexdigit())
}

fn is_uuid(value: &str) -> bool {
    if value.len() != 36 {
        return false;
    }
    value.bytes().enumerate().all(|(i, b)| match i {
        8 | 13 | 18 | 23 => b == b'-',
        _ => b.is_ascii_hexdigit(),
    })
}

/// Allow-list of route templates a service actually serves.
///
/// Normalized paths outside the list are rewritten to `unknown` so arbitrary
/// request paths cannot blow up the label domain.
#[derive(Debug, Clone)]
pub struct RouteAllowList {
    routes: HashSet<&'static str>,
}

impl RouteAllowList {
    pub fn new(routes: impl IntoIterator<Item = &'static str>) -> Self {
        Self {
            routes: routes.into_iter().collect(),
        }
    }

    /// The route label to record for a raw request path.
    pub fn label(&self, path: &str) -> String {
        let normalized = normalize_route(path);
        if self.routes.contains(normalized.as_str()) {
            normalized
        } else {
            "unknown".to_string()
        }
    }
}
