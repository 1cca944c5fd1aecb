use crate::error::AppError;
use crate::models::customer::Customer;
use crate::models::visit::VisitPayload;
use photo_pipeline::RecordId;
use sales_auth::Session;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

const CONNECTION_FAILED: &str = "Could not connect to server";
const CUSTOMER_SEARCH_FAILED: &str = "Failed to load customers";
const MIN_SEARCH_CHARS: usize = 2;

/// Record create/update endpoint
#[allow(async_fn_in_trait)]
pub trait RecordApi {
    /// Creates the record. `None` means the server saved it without
    /// reporting an id.
    async fn create(&self, payload: &VisitPayload) -> Result<Option<RecordId>, AppError>;
    async fn update(&self, id: RecordId, payload: &VisitPayload) -> Result<(), AppError>;
}

/// `{ success, message, data }` envelope of the record endpoints
#[derive(Debug, Default, Deserialize)]
pub struct SaveResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
}

impl SaveResponse {
    /// Id under `data.id`, given as number or numeric string; zero means none
    pub fn record_id(&self) -> Option<RecordId> {
        record_id_of(self.data.as_ref()?)
    }
}

fn record_id_of(value: &Value) -> Option<RecordId> {
    let id = match value.get("id")? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }?;
    (id > 0).then_some(RecordId(id))
}

/// Interprets a record endpoint answer, preferring the server's message
pub fn interpret_save_response(
    status: u16,
    body: &str,
    fallback: &str,
) -> Result<SaveResponse, AppError> {
    let parsed: Option<SaveResponse> = serde_json::from_str(body).ok();
    let status_ok = (200..300).contains(&status);

    match parsed {
        Some(response) if status_ok && response.success => Ok(response),
        Some(response) => Err(AppError::RecordSave(
            response
                .message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| fallback.to_string()),
        )),
        None => Err(AppError::RecordSave(fallback.to_string())),
    }
}

#[derive(Debug, Default, Deserialize)]
struct CustomerList {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<Vec<Customer>>,
}

/// Interprets the customer search answer. A 2xx body without `data` is an
/// empty result.
pub fn interpret_customer_response(status: u16, body: &str) -> Result<Vec<Customer>, AppError> {
    let parsed: Option<CustomerList> = serde_json::from_str(body).ok();

    match parsed {
        Some(list) if (200..300).contains(&status) => Ok(list
            .data
            .unwrap_or_default()
            .into_iter()
            .map(Customer::cleaned)
            .collect()),
        Some(list) => Err(AppError::Lookup(
            list.message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| CUSTOMER_SEARCH_FAILED.to_string()),
        )),
        None => Err(AppError::Lookup(CUSTOMER_SEARCH_FAILED.to_string())),
    }
}

/// Visit found on the server for the same customer and date
#[derive(Debug, Clone, PartialEq)]
pub struct ExistingVisit {
    pub id: RecordId,
    pub note: String,
    pub remark: String,
    /// True for a completed visit, false for a draft from the visit plan
    pub done: bool,
}

fn existing_visit_of(value: &Value, done: bool) -> Option<ExistingVisit> {
    let text = |key: &str| {
        value
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    Some(ExistingVisit {
        id: record_id_of(value)?,
        note: text("note"),
        remark: text("catatan"),
        done,
    })
}

/// HTTP client for `/visits`
pub struct VisitApiClient {
    base_url: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl VisitApiClient {
    pub fn new(session: &Session, timeout: Duration) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::Config(format!("HTTP client build failed: {}", e)))?;

        Ok(Self {
            base_url: session.base_url.trim_end_matches('/').to_string(),
            token: session.token.clone(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Sends with auth headers and returns status and body text
    async fn execute(&self, request: reqwest::RequestBuilder) -> reqwest::Result<(u16, String)> {
        let mut request = request.header("Accept", "application/json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok((status, body))
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        fallback: &str,
    ) -> Result<SaveResponse, AppError> {
        let (status, body) = self.execute(request).await.map_err(|e| {
            log::error!("Visit request failed: {}", e);
            AppError::RecordSave(CONNECTION_FAILED.to_string())
        })?;
        log::debug!("Visit endpoint answered {}", status);

        interpret_save_response(status, &body, fallback)
    }

    /// Searches customers by name or code; needs at least two characters
    pub async fn search_customers(&self, keyword: &str) -> Result<Vec<Customer>, AppError> {
        let keyword = keyword.trim();
        if keyword.chars().count() < MIN_SEARCH_CHARS {
            return Err(AppError::Validation(
                "Type at least 2 characters to search".to_string(),
            ));
        }

        let request = self
            .client
            .get(self.url("/cariCustomer"))
            .query(&[("search", keyword)]);
        let (status, body) = self.execute(request).await.map_err(|e| {
            log::error!("Customer search failed: {}", e);
            AppError::Lookup(CONNECTION_FAILED.to_string())
        })?;

        let customers = interpret_customer_response(status, &body)?;
        log::debug!("Customer search {:?} found {}", keyword, customers.len());
        Ok(customers)
    }

    async fn get_json(&self, path: &str, query: &[(&str, &str)]) -> Result<Value, AppError> {
        let response = self
            .send(self.client.get(self.url(path)).query(query), "Lookup failed")
            .await?;
        Ok(response.data.unwrap_or(Value::Null))
    }

    /// Finds a completed visit, then a draft, for this customer and date.
    /// Lookup failures are logged and treated as "nothing found".
    pub async fn find_existing_visit(
        &self,
        user: &str,
        customer_code: &str,
        date: &str,
    ) -> Option<ExistingVisit> {
        let customer_code = customer_code.trim();
        if customer_code.is_empty() || date.trim().is_empty() {
            return None;
        }

        match self
            .get_json("/rekap-visit", &[("user", user), ("tanggal", date)])
            .await
        {
            Ok(Value::Array(rows)) => {
                let done = rows.iter().find(|row| {
                    row.get("cus_kode")
                        .and_then(Value::as_str)
                        .is_some_and(|code| code.trim() == customer_code)
                });
                if let Some(visit) = done.and_then(|row| existing_visit_of(row, true)) {
                    log::info!("Found completed visit {} for {}", visit.id, customer_code);
                    return Some(visit);
                }
            }
            Ok(_) => {}
            Err(e) => log::debug!("Completed visit lookup failed: {}", e),
        }

        match self
            .get_json(
                "/visit/draft",
                &[("user", user), ("cus_kode", customer_code), ("tanggal", date)],
            )
            .await
        {
            Ok(data) => {
                let draft = existing_visit_of(&data, false);
                if let Some(visit) = &draft {
                    log::info!("Found draft visit {} for {}", visit.id, customer_code);
                }
                draft
            }
            Err(e) => {
                log::debug!("Draft visit lookup failed: {}", e);
                None
            }
        }
    }
}

impl RecordApi for VisitApiClient {
    async fn create(&self, payload: &VisitPayload) -> Result<Option<RecordId>, AppError> {
        let request = self.client.post(self.url("/visits")).json(payload);
        let response = self.send(request, "Failed to save visit").await?;

        let id = response.record_id();
        match id {
            Some(id) => log::info!("Created visit {} for {}", id, payload.cus_kode),
            None => log::warn!("Visit for {} saved without an id", payload.cus_kode),
        }
        Ok(id)
    }

    async fn update(&self, id: RecordId, payload: &VisitPayload) -> Result<(), AppError> {
        let request = self
            .client
            .put(self.url(&format!("/visits/{}", id)))
            .json(payload);
        self.send(request, "Failed to update visit").await?;
        log::info!("Updated visit {}", id);
        Ok(())
    }
}
