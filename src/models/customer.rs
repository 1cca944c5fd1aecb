use serde::Deserialize;

/// Customer row from the customer search
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Customer {
    #[serde(rename = "cc_kode", default)]
    pub code: String,
    #[serde(rename = "cc_nama", default)]
    pub name: String,
    #[serde(rename = "cc_alamat", default)]
    pub address: Option<String>,
    #[serde(rename = "cc_telp", default)]
    pub phone: Option<String>,
    #[serde(rename = "cc_CP", default)]
    pub contact_person: Option<String>,
}

/// Collapses line breaks to spaces and trims
pub fn clean_text(value: &str) -> String {
    value.replace("\r\n", " ").replace('\n', " ").trim().to_string()
}

fn clean_optional(value: Option<String>) -> Option<String> {
    value.map(|v| clean_text(&v)).filter(|v| !v.is_empty())
}

impl Customer {
    /// Copy with the multi-line fields flattened for display
    pub fn cleaned(self) -> Self {
        Self {
            code: clean_text(&self.code),
            name: clean_text(&self.name),
            address: clean_optional(self.address),
            phone: clean_optional(self.phone),
            contact_person: clean_optional(self.contact_person),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_customer_wire_names_and_cleaning() {
        let customer: Customer = serde_json::from_str(
            r#"{"cc_kode":" C001 ","cc_nama":"Toko Maju","cc_alamat":"Jl. Pahlawan 3\r\nSurabaya","cc_telp":"","cc_CP":null}"#,
        )
        .unwrap();

        let customer = customer.cleaned();
        assert_eq!(customer.code, "C001");
        assert_eq!(customer.name, "Toko Maju");
        assert_eq!(customer.address.as_deref(), Some("Jl. Pahlawan 3 Surabaya"));
        assert_eq!(customer.phone, None);
        assert_eq!(customer.contact_person, None);
    }
}
