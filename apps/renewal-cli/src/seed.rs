//! Demo data for `renewal seed`.
//!
//! Two companies ("Acme Ghana" in GHS, "Acme Europe" in EUR), the rates
//! they need, and submitted records whose license ends are spread from 60
//! days ago to about 14 months out. Licenses run a year, so the farthest
//! ones have not started yet and every stage shows up.
//!
//! Records go through [`DocumentService`] like any user edit: saved as a
//! draft, then submitted.

use anyhow::{anyhow, Context};
use chrono::{Days, NaiveDate, Utc};
use rust_decimal::Decimal;
use tracing::{info, warn};
use uuid::Uuid;

use renewal_core::{FixedClock, LineItem, RenewalRecord, RenewalStage};
use renewal_db::Database;
use renewal_jobs::DocumentService;

const COMPANIES: [(&str, &str); 2] = [("Acme Ghana", "GHS"), ("Acme Europe", "EUR")];

/// (from, to, rate in hundredths)
const RATES: [(&str, &str, i64); 4] = [
    ("USD", "GHS", 1550),
    ("EUR", "GHS", 1690),
    ("USD", "EUR", 92),
    ("GHS", "EUR", 6),
];

const PRODUCTS: [(&str, &str); 6] = [
    ("LIC-OFFICE", "Office Suite Seat"),
    ("LIC-AV", "Endpoint Antivirus"),
    ("LIC-BACKUP", "Cloud Backup 1TB"),
    ("LIC-CRM", "CRM Professional"),
    ("LIC-VPN", "Site-to-Site VPN"),
    ("SUP-GOLD", "Gold Support Plan"),
];

/// Writes `count` submitted records. Refuses to touch a database that
/// already holds records; returns how many were inserted.
pub async fn seed(db: &Database, count: usize, today: NaiveDate) -> anyhow::Result<usize> {
    let existing = db.renewals().count(None).await?;
    if existing > 0 {
        warn!(existing, "Database already has renewal records, not seeding");
        return Ok(0);
    }

    for (name, currency) in COMPANIES {
        db.companies().upsert(name, Some(currency)).await?;
    }
    for (from, to, hundredths) in RATES {
        db.exchange_rates()
            .upsert(from, to, Decimal::new(hundredths, 2))
            .await?;
    }

    let service = DocumentService::with_clock(db.clone(), FixedClock(today));
    let mut inserted = 0;
    for n in 0..count {
        let company = COMPANIES[n % COMPANIES.len()].0;
        let mut record = demo_record(n, today)?;
        record.company = Some(company.to_string());

        let draft = service
            .save(record)
            .await
            .with_context(|| format!("demo record {} did not save", n))?;
        service
            .submit(&draft.id)
            .await
            .with_context(|| format!("demo record {} did not submit", n))?;
        inserted += 1;
    }

    info!(inserted, "Seeded demo renewal records");
    Ok(inserted)
}

/// Per-stage record counts, in classifier order.
pub async fn stage_counts(db: &Database) -> anyhow::Result<Vec<(RenewalStage, i64)>> {
    let mut counts = Vec::with_capacity(RenewalStage::ALL.len());
    for stage in RenewalStage::ALL {
        counts.push((stage, db.renewals().count(Some(stage)).await?));
    }
    Ok(counts)
}

fn demo_record(n: usize, today: NaiveDate) -> anyhow::Result<RenewalRecord> {
    let end = today
        .checked_add_days(Days::new(((n * 37) % 480) as u64))
        .and_then(|d| d.checked_sub_days(Days::new(60)))
        .ok_or_else(|| anyhow!("license end out of range for {}", today))?;
    let start = end
        .checked_sub_days(Days::new(365))
        .ok_or_else(|| anyhow!("license start out of range for {}", end))?;

    let mut record = RenewalRecord::new(Uuid::new_v4().to_string(), Utc::now())
        .with_license(start, end);
    record.currency = Some(["USD", "GHS", "EUR"][n % 3].to_string());

    for line in 0..(1 + n % 3) {
        let (code, name) = PRODUCTS[(n + line) % PRODUCTS.len()];
        let mut item = LineItem::new(
            Decimal::from(1 + (n * 7 + line) % 25),
            Decimal::new(999 + ((n * 131 + line * 17) % 40_000) as i64, 2),
        )
        .with_code(code);
        item.item_name = Some(name.to_string());
        item.uom = Some("Seat".to_string());
        record.items.push(item);
    }

    Ok(record)
}
