//! `bidradar records <kind>` – count and sample the SQLite store.

use anyhow::Result;
use bidradar_core::normalize::RecordKind;
use bidradar_core::store::SqliteRecordStore;

pub async fn run_records(kind: RecordKind, limit: u32) -> Result<()> {
    let store = SqliteRecordStore::open_default().await?;
    let total = store.count(kind).await?;
    println!("{total} {} stored.", kind.plural());
    if total == 0 {
        return Ok(());
    }
    println!("{:<16} {:<12} {:>16} {:<8} {}", "ID", "DATE", "AMOUNT", "SOURCE", "TITLE");
    for r in store.list(kind, limit).await? {
        let date = r
            .occurred_at
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string());
        let amount = r
            .amount
            .map(|a| format!("{a:.0}"))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<16} {:<12} {:>16} {:<8} {}",
            r.identifier,
            date,
            amount,
            r.source_tag.as_str(),
            r.title.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}
