//! MCP Server Implementation
//!
//! Exposes the offer store operations as MCP tools over stdio.

use std::sync::Arc;

use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{
        CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
    },
    schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler, ServiceExt,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use homekey_core::domain::offer::{NewOffer, Offer, OfferId, OfferStatistics, OfferStatus};
use homekey_db::{DbPool, OfferStore, SqlOfferStore, StoreError};

/// Main MCP server for the Homekey offer subsystem.
#[derive(Clone)]
pub struct HomekeyMcpServer {
    store: Arc<SqlOfferStore>,
    tool_router: ToolRouter<Self>,
}

fn map_store_error(error: StoreError) -> McpError {
    match error {
        StoreError::Validation(validation) => {
            McpError::invalid_params(validation.to_string(), None)
        }
        StoreError::NotFound(offer_id) => {
            McpError::invalid_params(format!("offer `{offer_id}` not found"), None)
        }
        StoreError::Database(error) => McpError::internal_error(error.to_string(), None),
        StoreError::Decode(message) => McpError::internal_error(message, None),
    }
}

fn price_from_f64(field: &'static str, value: f64) -> Result<Decimal, McpError> {
    Decimal::try_from(value)
        .map_err(|_| McpError::invalid_params(format!("`{field}` is not a valid price"), None))
}

fn json_result<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let content = serde_json::to_string_pretty(value)
        .map_err(|e| McpError::internal_error(e.to_string(), None))?;
    Ok(CallToolResult::success(vec![Content::text(content)]))
}

// ============================================================================
// Tool inputs and outputs
// ============================================================================

#[derive(Debug, Serialize, Deserialize, schemars::JsonSchema)]
pub struct SubmitOfferInput {
    #[schemars(description = "The property being offered on")]
    pub property_id: String,

    #[schemars(description = "Name of the buyer")]
    pub buyer_name: String,

    #[schemars(description = "Email of the buyer")]
    pub buyer_email: String,

    #[schemars(description = "Phone number of the buyer")]
    pub buyer_phone: String,

    #[schemars(description = "Offered purchase price; must be greater than zero")]
    pub offer_price: f64,

    #[schemars(description = "List of contingencies (e.g., [\"inspection\", \"financing\"])")]
    #[serde(default)]
    pub contingencies: Vec<String>,

    #[schemars(description = "Proposed closing date (ISO format: YYYY-MM-DD)")]
    pub closing_date: String,

    #[schemars(description = "Optional additional terms and conditions")]
    #[serde(default)]
    pub additional_terms: Option<Value>,
}

#[derive(Debug, Serialize, Deserialize, schemars::JsonSchema)]
pub struct OfferIdInput {
    #[schemars(description = "The offer ID, e.g. OFFER-20260829-1A2B3C4D")]
    pub offer_id: String,
}

#[derive(Debug, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ProcessOfferResponseInput {
    #[schemars(description = "The offer ID being responded to")]
    pub offer_id: String,

    #[schemars(description = "Response type (\"accept\", \"reject\", \"counter\")")]
    pub response: String,

    #[schemars(description = "If countering, the counter offer price")]
    #[serde(default)]
    pub counter_offer_price: Option<f64>,

    #[schemars(description = "Optional notes or conditions")]
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ListOffersInput {
    #[schemars(description = "The property to list offers for")]
    pub property_id: String,

    #[schemars(
        description = "Optional status filter (\"pending_review\", \"accepted\", \"rejected\", \"countered\")"
    )]
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, schemars::JsonSchema)]
pub struct PropertyIdInput {
    #[schemars(description = "The property to get statistics for")]
    pub property_id: String,
}

#[derive(Debug, Serialize)]
struct ListOffersResult {
    property_id: String,
    filter_status: Option<String>,
    count: usize,
    offers: Vec<Offer>,
    statistics: OfferStatistics,
}

#[derive(Debug, Serialize)]
struct StatisticsResult {
    property_id: String,
    statistics: OfferStatistics,
}

#[derive(Debug, Serialize)]
struct WithdrawResult {
    offer_id: String,
    removed: bool,
}

// ============================================================================
// Tools
// ============================================================================

#[tool_router]
impl HomekeyMcpServer {
    pub fn new(pool: DbPool) -> Self {
        Self { store: Arc::new(SqlOfferStore::new(pool)), tool_router: Self::tool_router() }
    }

    /// Run the server with stdio transport until the client disconnects.
    pub async fn run_stdio(self) -> anyhow::Result<()> {
        info!("starting MCP server with stdio transport");

        let service = self.serve(rmcp::transport::stdio()).await?;
        service.waiting().await?;

        info!("MCP server shutdown complete");
        Ok(())
    }

    #[tool(name = "submit_offer", description = "Submit a purchase offer on a property")]
    async fn submit_offer(
        &self,
        Parameters(input): Parameters<SubmitOfferInput>,
    ) -> Result<CallToolResult, McpError> {
        debug!(property_id = %input.property_id, "submit_offer called");

        let offer = self
            .store
            .create_offer(NewOffer {
                property_id: input.property_id,
                buyer_name: input.buyer_name,
                buyer_email: input.buyer_email,
                buyer_phone: input.buyer_phone,
                offer_price: price_from_f64("offer_price", input.offer_price)?,
                contingencies: input.contingencies,
                closing_date: input.closing_date,
                additional_terms: input.additional_terms,
            })
            .await
            .map_err(map_store_error)?;

        json_result(&offer)
    }

    #[tool(name = "get_offer_status", description = "Check the status of a submitted offer")]
    async fn get_offer_status(
        &self,
        Parameters(input): Parameters<OfferIdInput>,
    ) -> Result<CallToolResult, McpError> {
        debug!(offer_id = %input.offer_id, "get_offer_status called");

        let offer =
            self.store.get_offer(&OfferId(input.offer_id)).await.map_err(map_store_error)?;

        json_result(&offer)
    }

    #[tool(
        name = "process_offer_response",
        description = "Process a seller response to an offer (accept, reject, or counter)"
    )]
    async fn process_offer_response(
        &self,
        Parameters(input): Parameters<ProcessOfferResponseInput>,
    ) -> Result<CallToolResult, McpError> {
        debug!(offer_id = %input.offer_id, response = %input.response, "process_offer_response called");

        let counter_offer_price = input
            .counter_offer_price
            .map(|price| price_from_f64("counter_offer_price", price))
            .transpose()?;

        let offer = self
            .store
            .process_offer_response(
                &OfferId(input.offer_id),
                &input.response,
                counter_offer_price,
                input.notes,
            )
            .await
            .map_err(map_store_error)?;

        json_result(&offer)
    }

    #[tool(
        name = "list_offers",
        description = "List offers for a property with summary statistics, optionally filtered by status"
    )]
    async fn list_offers(
        &self,
        Parameters(input): Parameters<ListOffersInput>,
    ) -> Result<CallToolResult, McpError> {
        debug!(property_id = %input.property_id, "list_offers called");

        let status = match input.status.as_deref() {
            Some(raw) => Some(OfferStatus::parse(raw).ok_or_else(|| {
                McpError::invalid_params(
                    format!(
                        "invalid status `{raw}` (expected pending_review|accepted|rejected|countered)"
                    ),
                    None,
                )
            })?),
            None => None,
        };

        let (offers, statistics) = self
            .store
            .list_offers(&input.property_id, status)
            .await
            .map_err(map_store_error)?;

        json_result(&ListOffersResult {
            property_id: input.property_id,
            filter_status: input.status,
            count: offers.len(),
            offers,
            statistics,
        })
    }

    #[tool(name = "get_offer_statistics", description = "Get offer statistics for a property")]
    async fn get_offer_statistics(
        &self,
        Parameters(input): Parameters<PropertyIdInput>,
    ) -> Result<CallToolResult, McpError> {
        debug!(property_id = %input.property_id, "get_offer_statistics called");

        let statistics = self
            .store
            .get_offer_statistics(&input.property_id)
            .await
            .map_err(map_store_error)?;

        json_result(&StatisticsResult { property_id: input.property_id, statistics })
    }

    #[tool(
        name = "withdraw_offer",
        description = "Administratively remove an offer record; reports whether a record was removed"
    )]
    async fn withdraw_offer(
        &self,
        Parameters(input): Parameters<OfferIdInput>,
    ) -> Result<CallToolResult, McpError> {
        debug!(offer_id = %input.offer_id, "withdraw_offer called");

        let removed = self
            .store
            .delete_offer(&OfferId(input.offer_id.clone()))
            .await
            .map_err(map_store_error)?;

        json_result(&WithdrawResult { offer_id: input.offer_id, removed })
    }
}

#[tool_handler]
impl ServerHandler for HomekeyMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "homekey-mcp".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
            instructions: Some(
                "Homekey MCP Server - property offer workflows for AI agents. \
                 Submit offers, respond to them, and inspect per-property statistics."
                    .to_string(),
            ),
            ..Default::default()
        }
    }
}
