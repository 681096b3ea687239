//! CSV export of filtered lead sets.
//!
//! Output is UTF-8 with a BOM so spreadsheet software detects the encoding
//! and renders Hebrew text correctly.

use serde::Serialize;
use thiserror::Error;

use crate::domain::lead::Lead;

const UTF8_BOM: &[u8] = b"\xef\xbb\xbf";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("csv serialization failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("csv output was not valid utf-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// Flat, spreadsheet-friendly projection of a lead. Timestamps are RFC 3339;
/// optional columns render as empty cells.
#[derive(Debug, Serialize)]
pub struct LeadExportRow {
    pub id: String,
    pub customer_name: String,
    pub phone: String,
    pub email: String,
    pub category: String,
    pub priority: String,
    pub status: String,
    pub assigned_to: String,
    pub sent_at: String,
    pub sent_via: String,
    pub return_reason: String,
    pub converted_at: String,
    pub service_area: String,
    pub notes: String,
    pub created_at: String,
}

impl From<&Lead> for LeadExportRow {
    fn from(lead: &Lead) -> Self {
        Self {
            id: lead.id.0.clone(),
            customer_name: lead.customer_name.clone(),
            phone: lead.phone.clone(),
            email: lead.email.clone().unwrap_or_default(),
            category: lead.category_id.0.clone(),
            priority: lead.priority.as_str().to_string(),
            status: lead.status.as_str().to_string(),
            assigned_to: lead.assigned_to.as_ref().map(|id| id.0.clone()).unwrap_or_default(),
            sent_at: lead.sent_at.map(|at| at.to_rfc3339()).unwrap_or_default(),
            sent_via: lead.sent_via.map(|via| via.as_str().to_string()).unwrap_or_default(),
            return_reason: lead.return_reason.clone().unwrap_or_default(),
            converted_at: lead.converted_at.map(|at| at.to_rfc3339()).unwrap_or_default(),
            service_area: lead.service_area.clone().unwrap_or_default(),
            notes: lead.notes.clone().unwrap_or_default(),
            created_at: lead.created_at.to_rfc3339(),
        }
    }
}

/// Renders the leads into a complete CSV document, header row included.
pub fn render_csv<'a, I>(leads: I) -> Result<Vec<u8>, ExportError>
where
    I: IntoIterator<Item = &'a Lead>,
{
    let mut writer = csv::Writer::from_writer(Vec::new());
    for lead in leads {
        writer.serialize(LeadExportRow::from(lead))?;
    }
    let body = writer.into_inner().map_err(|err| ExportError::Csv(err.into_error().into()))?;

    let mut output = Vec::with_capacity(UTF8_BOM.len() + body.len());
    output.extend_from_slice(UTF8_BOM);
    output.extend_from_slice(&body);
    Ok(output)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use crate::domain::category::CategoryId;
    use crate::domain::client::ClientId;
    use crate::domain::lead::{Channel, Lead, LeadId, LeadStatus, Priority};

    use super::{render_csv, UTF8_BOM};

    fn sample_lead() -> Lead {
        Lead {
            id: LeadId("L-1".to_string()),
            customer_name: "דנה לוי".to_string(),
            phone: "050-1234567".to_string(),
            email: Some("dana@example.com".to_string()),
            category_id: CategoryId("plumbing".to_string()),
            priority: Priority::High,
            status: LeadStatus::Sent,
            assigned_to: Some(ClientId("C-9".to_string())),
            sent_at: Some(Utc.with_ymd_and_hms(2025, 3, 4, 9, 30, 0).unwrap()),
            sent_via: Some(Channel::Email),
            return_reason: None,
            converted_at: None,
            service_area: Some("תל אביב".to_string()),
            notes: None,
            created_at: Utc.with_ymd_and_hms(2025, 3, 3, 8, 0, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2025, 3, 4, 9, 30, 0).unwrap(),
        }
    }

    #[test]
    fn output_starts_with_a_utf8_bom() {
        let bytes = render_csv(std::iter::empty()).expect("empty export");
        assert!(bytes.starts_with(UTF8_BOM));
    }

    #[test]
    fn empty_export_is_bom_only() {
        // no rows serialized means the header row is never written either
        let bytes = render_csv(std::iter::empty()).expect("empty export");
        assert_eq!(bytes, UTF8_BOM);
    }

    #[test]
    fn rows_carry_header_and_hebrew_text_intact() {
        let lead = sample_lead();
        let bytes = render_csv([&lead]).expect("export");
        let text = String::from_utf8(bytes[UTF8_BOM.len()..].to_vec()).expect("utf-8 body");

        let mut lines = text.lines();
        let header = lines.next().expect("header row");
        assert!(header.starts_with("id,customer_name,phone,email,category"));

        let row = lines.next().expect("data row");
        assert!(row.contains("דנה לוי"));
        assert!(row.contains("תל אביב"));
        assert!(row.contains("2025-03-04T09:30:00+00:00"));
        assert!(row.contains(",sent,"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn optional_fields_render_as_empty_cells() {
        let mut lead = sample_lead();
        lead.email = None;
        lead.assigned_to = None;
        lead.sent_at = None;
        lead.sent_via = None;
        lead.service_area = None;

        let bytes = render_csv([&lead]).expect("export");
        let text = String::from_utf8(bytes[UTF8_BOM.len()..].to_vec()).expect("utf-8 body");
        let row = text.lines().nth(1).expect("data row");
        assert!(row.contains(",,"));
        assert!(!row.contains("dana@example.com"));
    }
}
