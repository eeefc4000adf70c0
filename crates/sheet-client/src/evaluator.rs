//! Evaluator endpoints

use crate::client::{decode, status_error, ApiClient, ErrorBody};
use crate::error::ClientError;
use async_trait::async_trait;
use reqwest::{Method, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sheet_calc::{CalcError, Evaluator, LabeledInputs, PreviewRequest, SweepRequest, SweepResponse};
use sheet_graph::{CalculationResult, SheetId};

/// Decode an evaluator answer
///
/// Client errors become evaluation errors carrying the node the server
/// blamed, when it named one.
async fn evaluator_response<T: DeserializeOwned>(response: Response) -> Result<T, CalcError> {
    let status = response.status();
    let text = response.text().await.map_err(ClientError::from)?;
    if status.is_success() {
        return Ok(decode(&text)?);
    }
    if status.is_client_error() {
        let body = ErrorBody::parse(&text);
        return Err(CalcError::Evaluation {
            message: body.message(),
            node: body.node_id.and_then(|id| id.parse().ok()),
        });
    }
    Err(status_error(status.as_u16(), &text).into())
}

impl ApiClient {
    async fn post_evaluator<B, T>(&self, path: &str, body: &B) -> Result<T, CalcError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path)?;
        let response = self
            .request(Method::POST, url)
            .json(body)
            .send()
            .await
            .map_err(ClientError::from)?;
        evaluator_response(response).await
    }
}

#[async_trait]
impl Evaluator for ApiClient {
    async fn calculate(
        &self,
        sheet: SheetId,
        inputs: &LabeledInputs,
    ) -> Result<CalculationResult, CalcError> {
        self.post_evaluator(&format!("calculate/{sheet}"), inputs).await
    }

    async fn preview(&self, request: &PreviewRequest) -> Result<CalculationResult, CalcError> {
        self.post_evaluator("calculate/preview", request).await
    }

    async fn sweep(
        &self,
        sheet: SheetId,
        request: &SweepRequest,
    ) -> Result<SweepResponse, CalcError> {
        self.post_evaluator(&format!("sheets/{sheet}/sweep"), request).await
    }
}
