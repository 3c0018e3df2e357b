use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, trace, warn};
use url::Url;

use crate::{
    bulk::BulkEditDraft,
    row::{self, Record, RowId},
    schema::TableSchema,
};

use super::{BatchBackend, BatchResponse};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Transport error: {0}")]
    Transport(reqwest::Error),
    #[error("Invalid endpoint: {0}")]
    Url(url::ParseError),
    #[error("Unexpected status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Parse JSON error: {0}")]
    ParseJson(serde_json::Error),
    #[error("Invalid row: {0}")]
    Normalize(crate::Error),
}

/// JSON client for a table's REST endpoints.
///
/// `GET {base}/{table}` lists rows, `POST {base}/{table}/batch-update` and
/// `POST {base}/{table}/batch-delete` mutate them.
pub struct Client {
    client: reqwest::Client,
    base: Url,
    token: Option<String>,
    schema: TableSchema,
}

#[derive(Serialize)]
struct UpdateRequest<'a> {
    items: &'a [BulkEditDraft],
}

#[derive(Serialize)]
struct DeleteRequest<'a> {
    ids: &'a [RowId],
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Listing {
    Rows(Vec<Value>),
    Wrapped { data: Vec<Value> },
}

/// Entities of a listing reply, either a bare array or `{ "data": [...] }`.
fn decode_listing(status: u16, text: &str) -> Result<Vec<Value>, Error> {
    if !(200..300).contains(&status) {
        return Err(Error::Status {
            status,
            body: text.to_owned(),
        });
    }
    match serde_json::from_str::<Listing>(text).map_err(Error::ParseJson)? {
        Listing::Rows(rows) => Ok(rows),
        Listing::Wrapped { data } => Ok(data),
    }
}

/// Reply of a batch endpoint. A non-2xx reply that still carries a batch body
/// is a rejection with the server's message.
fn decode_batch(status: u16, text: &str) -> Result<BatchResponse, Error> {
    if (200..300).contains(&status) {
        return serde_json::from_str(text).map_err(Error::ParseJson);
    }
    match serde_json::from_str::<BatchResponse>(text) {
        Ok(response) => Ok(BatchResponse {
            status: false,
            message: response.message,
        }),
        Err(_) => Err(Error::Status {
            status,
            body: text.to_owned(),
        }),
    }
}

impl Client {
    pub fn new(base: &str, token: Option<String>, schema: TableSchema) -> Result<Self, Error> {
        let mut base = Url::parse(base).map_err(Error::Url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            client: reqwest::Client::new(),
            base,
            token,
            schema,
        })
    }

    fn endpoint(&self, action: Option<&str>) -> Result<Url, Error> {
        let path = match action {
            Some(action) => format!("{}/{action}", self.schema.table()),
            None => self.schema.table().to_owned(),
        };
        self.base.join(&path).map_err(Error::Url)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn post<B: Serialize>(&self, action: &str, body: &B) -> Result<BatchResponse, Error> {
        let url = self.endpoint(Some(action))?;
        let response = self
            .authorize(self.client.post(url.clone()))
            .json(body)
            .send()
            .await
            .map_err(Error::Transport)?;
        let status = response.status().as_u16();
        let text = response.text().await.map_err(Error::Transport)?;
        trace!(%url, status, text, "batch response");
        let response = decode_batch(status, &text)?;
        if response.status {
            debug!(%url, message = ?response.message, "batch finished");
        } else {
            warn!(%url, status, message = ?response.message, "batch rejected");
        }
        Ok(response)
    }
}

impl BatchBackend for Client {
    type Row = Record;
    type Error = Error;

    async fn load(&self) -> Result<Vec<Record>, Error> {
        let url = self.endpoint(None)?;
        let response = self
            .authorize(self.client.get(url.clone()))
            .send()
            .await
            .map_err(Error::Transport)?;
        let status = response.status().as_u16();
        let text = response.text().await.map_err(Error::Transport)?;
        let entities = decode_listing(status, &text)?;
        debug!(%url, count = entities.len(), "rows loaded");
        row::normalize(&self.schema, entities).map_err(Error::Normalize)
    }

    async fn batch_update(&self, items: &[BulkEditDraft]) -> Result<BatchResponse, Error> {
        self.post("batch-update", &UpdateRequest { items }).await
    }

    async fn batch_delete(&self, ids: &[RowId]) -> Result<BatchResponse, Error> {
        self.post("batch-delete", &DeleteRequest { ids }).await
    }
}
