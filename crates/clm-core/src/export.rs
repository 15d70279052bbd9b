//! CSV rendering of the full contract list.

use anyhow::Context;

use crate::types::Contract;

pub const EXPORT_FILENAME: &str = "contracts_export.csv";

const HEADER: [&str; 20] = [
    "id",
    "contract_number",
    "title",
    "description",
    "counterparty_name",
    "counterparty_email",
    "counterparty_address",
    "owner_user_id",
    "owner_department",
    "status",
    "type",
    "category",
    "effective_date",
    "expiration_date",
    "contract_value",
    "currency",
    "payment_terms",
    "tags",
    "created_at",
    "updated_at",
];

/// One header row, then one row per contract. Absent values are empty
/// cells; tags are joined with `;`.
pub fn contracts_to_csv(contracts: &[Contract]) -> anyhow::Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(HEADER)?;

    for c in contracts {
        let opt = |v: &Option<String>| v.clone().unwrap_or_default();
        writer
            .write_record([
                c.id.to_string(),
                opt(&c.contract_number),
                c.title.clone(),
                opt(&c.description),
                c.counterparty_name.clone(),
                opt(&c.counterparty_email),
                opt(&c.counterparty_address),
                c.owner_user_id.clone(),
                opt(&c.owner_department),
                c.status.clone(),
                c.contract_type.clone(),
                opt(&c.category),
                c.effective_date.map(|d| d.to_string()).unwrap_or_default(),
                c.expiration_date.map(|d| d.to_string()).unwrap_or_default(),
                c.contract_value.map(|v| v.to_string()).unwrap_or_default(),
                c.currency.clone(),
                opt(&c.payment_terms),
                c.tags.join(";"),
                c.created_at.to_rfc3339(),
                c.updated_at.to_rfc3339(),
            ])
            .with_context(|| format!("failed to write contract {}", c.id))?;
    }

    let bytes = writer.into_inner().context("failed to flush csv writer")?;
    String::from_utf8(bytes).context("csv output is not utf-8")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use rust_decimal::Decimal;
    use uuid::Uuid;

    fn contract(title: &str) -> Contract {
        let now = Utc::now();
        Contract {
            id: Uuid::new_v4(),
            contract_number: Some("CON-2025-1234".into()),
            title: title.into(),
            description: None,
            counterparty_name: "Acme, Inc.".into(),
            counterparty_email: None,
            counterparty_address: Some("1 Main St".into()),
            owner_user_id: "u1".into(),
            owner_department: None,
            status: "active".into(),
            contract_type: "MSA".into(),
            category: None,
            effective_date: None,
            expiration_date: NaiveDate::from_ymd_opt(2025, 12, 31),
            contract_value: Some(Decimal::new(1_250_050, 2)),
            currency: "USD".into(),
            payment_terms: None,
            tags: vec!["it".into(), "core".into()],
            created_at: now,
            updated_at: now,
            days_until_expiry: None,
        }
    }

    #[test]
    fn header_then_one_row_per_contract() {
        let csv = contracts_to_csv(&[contract("A"), contract("B")]).unwrap();
        let lines: Vec<_> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("id,contract_number,title,"));
        assert!(lines[0].contains(",counterparty_email,counterparty_address,owner_user_id,"));
    }

    #[test]
    fn values_with_commas_and_quotes_are_quoted() {
        let csv = contracts_to_csv(&[contract("Say \"hi\"")]).unwrap();
        let mut reader = csv::Reader::from_reader(csv.as_bytes());
        let row = reader.records().next().unwrap().unwrap();
        assert_eq!(&row[2], "Say \"hi\"");
        assert_eq!(&row[4], "Acme, Inc.");
        assert_eq!(&row[6], "1 Main St");
        assert_eq!(&row[13], "2025-12-31");
        assert_eq!(&row[14], "12500.50");
        assert_eq!(&row[17], "it;core");
        assert_eq!(&row[3], "");
    }

    #[test]
    fn empty_list_yields_header_only() {
        let csv = contracts_to_csv(&[]).unwrap();
        assert_eq!(csv.lines().count(), 1);
    }
}
