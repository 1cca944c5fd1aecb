use crate::error::AppError;
use chrono::NaiveDate;
use photo_pipeline::RecordId;
use serde::{Deserialize, Serialize};

/// Visit form as filled in by the salesperson
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VisitForm {
    pub customer_name: String,
    pub customer_code: String,
    /// `YYYY-MM-DD`; longer timestamps are cut to the date part
    pub date: String,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub note: String,
    pub remark: String,
    /// Set when the visit already exists (done or draft) and must be updated
    pub existing_visit_id: Option<RecordId>,
}

/// Wire payload of `POST /visits` and `PUT /visits/{id}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VisitPayload {
    pub cus_kode: String,
    pub tanggal: String,
    pub user: String,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub note: String,
    pub catatan: String,
}

/// Keeps only the date part of `YYYY-MM-DD...`
pub fn normalize_ymd(value: &str) -> String {
    value.trim().chars().take(10).collect()
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl VisitForm {
    pub fn new(customer_name: &str, customer_code: &str, date: &str) -> Self {
        Self {
            customer_name: customer_name.to_string(),
            customer_code: customer_code.to_string(),
            date: date.to_string(),
            ..Default::default()
        }
    }

    /// Checks required fields; runs before any request
    pub fn validate(&self) -> Result<(), AppError> {
        if self.customer_name.trim().is_empty() || self.customer_code.trim().is_empty() {
            return Err(AppError::Validation(
                "Customer must be selected first".to_string(),
            ));
        }

        let date = normalize_ymd(&self.date);
        if date.is_empty() {
            return Err(AppError::Validation("Visit date is required".to_string()));
        }
        if NaiveDate::parse_from_str(&date, "%Y-%m-%d").is_err() {
            return Err(AppError::Validation(
                "Visit date must be formatted as YYYY-MM-DD".to_string(),
            ));
        }

        Ok(())
    }

    pub fn to_payload(&self, user_name: &str) -> VisitPayload {
        VisitPayload {
            cus_kode: self.customer_code.trim().to_string(),
            tanggal: normalize_ymd(&self.date),
            user: user_name.to_string(),
            latitude: non_blank(&self.latitude),
            longitude: non_blank(&self.longitude),
            note: self.note.trim().to_string(),
            catatan: self.remark.trim().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_requires_customer() {
        let form = VisitForm::new("", "C001", "2026-10-18");
        assert!(matches!(form.validate(), Err(AppError::Validation(_))));

        let form = VisitForm::new("Toko Maju", "  ", "2026-10-18");
        assert!(matches!(form.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_validate_requires_date() {
        let form = VisitForm::new("Toko Maju", "C001", " ");
        let err = form.validate().unwrap_err();
        assert_eq!(err.user_message(), "Visit date is required");

        let form = VisitForm::new("Toko Maju", "C001", "18/10/2026");
        assert!(form.validate().is_err());
    }

    #[test]
    fn test_validate_accepts_timestamp_dates() {
        let form = VisitForm::new("Toko Maju", "C001", "2026-10-18T08:30:00.000Z");
        assert!(form.validate().is_ok());
    }

    #[test]
    fn test_payload_uses_wire_names_and_trims() {
        let mut form = VisitForm::new("Toko Maju", " C001 ", "2026-10-18T08:30:00Z");
        form.latitude = Some(" -7.2575 ".to_string());
        form.longitude = Some("".to_string());
        form.note = " ordered 10 boxes ".to_string();
        form.remark = "call back next week".to_string();

        let json = serde_json::to_value(form.to_payload("Budi")).unwrap();
        assert_eq!(json["cus_kode"], "C001");
        assert_eq!(json["tanggal"], "2026-10-18");
        assert_eq!(json["user"], "Budi");
        assert_eq!(json["latitude"], "-7.2575");
        assert!(json["longitude"].is_null());
        assert_eq!(json["note"], "ordered 10 boxes");
        assert_eq!(json["catatan"], "call back next week");
    }
}
