//! Filters and Pagination

use serde::{Deserialize, Serialize};

use crate::model::{Alert, Severity, Vehicle};

/// Largest page size served
pub const MAX_PAGE_SIZE: usize = 100;

/// Equality filters for alert listings
#[derive(Debug, Clone, Default)]
pub struct AlertFilter {
    pub organization_id: Option<String>,
    pub severity: Option<Severity>,
    pub is_read: Option<bool>,
    pub is_resolved: Option<bool>,
    pub vehicle_id: Option<String>,
}

impl AlertFilter {
    pub fn matches(&self, alert: &Alert) -> bool {
        self.organization_id
            .as_ref()
            .map_or(true, |o| &alert.organization_id == o)
            && self.severity.map_or(true, |s| alert.severity == s)
            && self.is_read.map_or(true, |r| alert.is_read == r)
            && self.is_resolved.map_or(true, |r| alert.is_resolved == r)
            && self
                .vehicle_id
                .as_ref()
                .map_or(true, |v| &alert.vehicle_id == v)
    }
}

/// Filters for vehicle listings
#[derive(Debug, Clone, Default)]
pub struct VehicleFilter {
    pub organization_id: Option<String>,
    /// Case-insensitive match on plate, make, or model
    pub search: Option<String>,
}

impl VehicleFilter {
    pub fn matches(&self, vehicle: &Vehicle) -> bool {
        if let Some(org) = &self.organization_id {
            if &vehicle.organization_id != org {
                return false;
            }
        }
        match &self.search {
            Some(term) if !term.is_empty() => {
                let term = term.to_lowercase();
                vehicle.license_plate.to_lowercase().contains(&term)
                    || vehicle.make.to_lowercase().contains(&term)
                    || vehicle.model.to_lowercase().contains(&term)
            }
            _ => true,
        }
    }
}

/// One page of results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub limit: usize,
    pub total: usize,
    pub total_pages: usize,
}

/// Slice `items` into a 1-based page.
///
/// `page` below 1 is treated as 1 and `limit` is clamped to `1..=MAX_PAGE_SIZE`.
pub fn paginate<T>(items: Vec<T>, page: usize, limit: usize) -> Page<T> {
    let page = page.max(1);
    let limit = limit.clamp(1, MAX_PAGE_SIZE);
    let total = items.len();
    let total_pages = total.div_ceil(limit);

    let items = items
        .into_iter()
        .skip((page - 1).saturating_mul(limit))
        .take(limit)
        .collect();

    Page {
        items,
        page,
        limit,
        total,
        total_pages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paginate() {
        let page = paginate((1..=25).collect::<Vec<_>>(), 2, 10);
        assert_eq!(page.items, (11..=20).collect::<Vec<_>>());
        assert_eq!(page.total, 25);
        assert_eq!(page.total_pages, 3);
    }

    #[test]
    fn test_paginate_past_end() {
        let page = paginate(vec![1, 2, 3], 5, 10);
        assert!(page.items.is_empty());
        assert_eq!(page.total_pages, 1);
    }

    #[test]
    fn test_paginate_clamps() {
        let page = paginate((0..500).collect::<Vec<_>>(), 0, 0);
        assert_eq!(page.page, 1);
        assert_eq!(page.limit, 1);
        assert_eq!(page.items, vec![0]);

        let page = paginate((0..500).collect::<Vec<_>>(), 1, 10_000);
        assert_eq!(page.limit, MAX_PAGE_SIZE);
        assert_eq!(page.total_pages, 5);
    }

    #[test]
    fn test_empty() {
        let page = paginate(Vec::<u8>::new(), 1, 20);
        assert_eq!(page.total, 0);
        assert_eq!(page.total_pages, 0);
    }
}
