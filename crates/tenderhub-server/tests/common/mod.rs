//! Shared fixtures for integration tests
#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use serde_json::json;
use tenderhub_server::ingest::{RawAward, RawSupplier, RawTender};

/// One raw tender with a deterministic date (a day in March 2024) and the
/// given supplier references.
pub fn raw_tender(id: &str, day: u32, value: &str, supplier_ids: &[i32]) -> RawTender {
    RawTender {
        id: id.to_string(),
        date: Utc.with_ymd_and_hms(2024, 3, day, 0, 0, 0).unwrap(),
        title: format!("Tender {id}"),
        description: Some(format!("Works package {id}")),
        awarded_value_eur: value.to_string(),
        awarded: vec![RawAward {
            suppliers: supplier_ids
                .iter()
                .map(|&id| RawSupplier {
                    id,
                    name: format!("Supplier {id}"),
                })
                .collect(),
        }],
    }
}

/// Ten tenders T0000..=T0009 whose date order and value order both differ
/// from the id order, so each sort key is exercised independently.
///
/// Values are 100.00..=1000.00 in steps of 100, one of each.
pub fn seed_batch() -> Vec<RawTender> {
    (0..10)
        .map(|i| {
            let day = (i * 3) % 10 + 1;
            let value = ((i * 7) % 10 + 1) * 100;
            raw_tender(
                &format!("T{i:04}"),
                day,
                &format!("{value}.00"),
                &[(i % 3) as i32 + 1],
            )
        })
        .collect()
}

/// Serialize tenders into the wire shape of a source page.
pub fn page_json(tenders: &[RawTender]) -> serde_json::Value {
    json!({
        "data": tenders
            .iter()
            .map(|t| {
                json!({
                    "id": t.id,
                    "date": t.date.to_rfc3339(),
                    "title": t.title,
                    "description": t.description,
                    "awarded_value_eur": t.awarded_value_eur,
                    "awarded": t.awarded
                        .iter()
                        .map(|a| json!({
                            "suppliers": a.suppliers
                                .iter()
                                .map(|s| json!({ "id": s.id, "name": s.name }))
                                .collect::<Vec<_>>()
                        }))
                        .collect::<Vec<_>>()
                })
            })
            .collect::<Vec<_>>()
    })
}
