//! Lease endpoints

use crate::client::ApiClient;
use crate::error::ClientError;
use async_trait::async_trait;
use reqwest::Method;
use serde::Serialize;
use sheet_graph::SheetId;
use sheet_lease::{Lease, LeaseApi, LeaseError, SessionContext};
use url::Url;

#[derive(Serialize)]
struct TabBody<'a> {
    tab_id: &'a str,
}

impl ApiClient {
    fn lock_url(&self, sheet: SheetId, suffix: &str) -> Result<Url, ClientError> {
        self.url(&format!("api/sheets/{sheet}/lock{suffix}"))
    }

    async fn lock_request(
        &self,
        sheet: SheetId,
        suffix: &str,
        ctx: &SessionContext,
    ) -> Result<Lease, LeaseError> {
        let url = self.lock_url(sheet, suffix)?;
        let request = self
            .request_as(Method::POST, url, ctx.identity())
            .json(&TabBody {
                tab_id: ctx.tab_id(),
            });
        Ok(self.send_json(request).await?)
    }
}

#[async_trait]
impl LeaseApi for ApiClient {
    async fn peek(&self, sheet: SheetId) -> Result<Option<Lease>, LeaseError> {
        let url = self.lock_url(sheet, "")?;
        Ok(self.send_json(self.request(Method::GET, url)).await?)
    }

    async fn acquire(&self, sheet: SheetId, ctx: &SessionContext) -> Result<Lease, LeaseError> {
        self.lock_request(sheet, "", ctx).await
    }

    async fn release(&self, sheet: SheetId, ctx: &SessionContext) -> Result<(), LeaseError> {
        let mut url = self.lock_url(sheet, "")?;
        url.query_pairs_mut().append_pair("tab_id", ctx.tab_id());
        self.send(self.request_as(Method::DELETE, url, ctx.identity()))
            .await?;
        Ok(())
    }

    async fn force(&self, sheet: SheetId, ctx: &SessionContext) -> Result<Lease, LeaseError> {
        self.lock_request(sheet, "/force", ctx).await
    }
}
