//! Sheet persistence

use crate::client::ApiClient;
use crate::error::{fetch_error, ClientError};
use async_trait::async_trait;
use reqwest::Method;
use sheet_graph::{Sheet, SheetId};
use sheet_nested::{ResolveError, SheetSource};
use tracing::debug;

/// Where sheets are loaded from and saved to
#[async_trait]
pub trait SheetStore: Send + Sync {
    /// Load a sheet
    async fn load(&self, id: SheetId) -> Result<Sheet, ClientError>;

    /// Replace the stored sheet
    async fn save(&self, sheet: &Sheet) -> Result<(), ClientError>;
}

#[async_trait]
impl SheetStore for ApiClient {
    async fn load(&self, id: SheetId) -> Result<Sheet, ClientError> {
        let url = self.url(&format!("sheets/{id}"))?;
        self.send_json(self.request(Method::GET, url)).await
    }

    async fn save(&self, sheet: &Sheet) -> Result<(), ClientError> {
        let url = self.url(&format!("sheets/{}", sheet.id))?;
        debug!(sheet = %sheet.id, nodes = sheet.graph.node_count(), "saving sheet");
        self.send(self.request(Method::PUT, url).json(sheet)).await?;
        Ok(())
    }
}

#[async_trait]
impl SheetSource for ApiClient {
    async fn fetch_sheet(&self, id: SheetId) -> Result<Sheet, ResolveError> {
        self.load(id).await.map_err(|e| fetch_error(id, &e))
    }
}
