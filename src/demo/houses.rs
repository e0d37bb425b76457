use http::StatusCode;
use serde_json::{Value, json};

use crate::core::{
    controller::{Controller, DispatchMethod, EndpointMeta, Endpoints, Verb},
    error::{ApiError, ApiResult},
    exchange::Exchange,
    schema::{FieldType, Schema},
};

/// The house selected by the `houseId` path parameter, for nested handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HouseId(pub i64);

#[derive(Debug, Default)]
pub struct Houses;

impl Houses {
    fn select_house(&mut self, exchange: &mut Exchange<'_>) -> ApiResult<()> {
        let Some(raw) = exchange.own_router_params().get("houseId").cloned() else {
            return Ok(());
        };

        let id = raw.parse::<i64>().map_err(|_| {
            ApiError::application(StatusCode::NOT_FOUND, format!("House {raw} not found"))
        })?;
        exchange.extensions_mut().insert(HouseId(id));
        Ok(())
    }

    fn list(&mut self, _: &mut Exchange<'_>) -> ApiResult<Value> {
        Ok(Value::from("List Houses"))
    }

    fn create(&mut self, exchange: &mut Exchange<'_>) -> ApiResult<Value> {
        let house = exchange.body()?.clone();
        tracing::info!(name = ?house.get("name"), "Creating house");
        Ok(Value::Object(house))
    }

    fn show(&mut self, exchange: &mut Exchange<'_>) -> ApiResult<Value> {
        let id = exchange.extensions().get::<HouseId>().map(|h| h.0);
        Ok(json!({ "id": id, "city": null }))
    }

    fn new_house_schema() -> Schema {
        Schema::new()
            .required("name", FieldType::String)
            .required("street", FieldType::String)
            .required("streetNumber", FieldType::Int)
            .optional("builtYear", FieldType::Int)
            .optional("locked", FieldType::Bool)
    }
}

impl Controller for Houses {
    fn endpoints() -> Endpoints<Self> {
        Endpoints::new()
            .get(Self::list)
            .post(Self::create)
            .get_params(Self::show)
            .pre_serve(Self::select_house)
            .describe(
                DispatchMethod::plain(Verb::Get),
                EndpointMeta::new()
                    .title("List houses")
                    .description("List all houses")
                    .tags(["House", "MCP"]),
            )
            .describe(
                DispatchMethod::plain(Verb::Post),
                EndpointMeta::new()
                    .tags(["House"])
                    .body(Self::new_house_schema()),
            )
            .describe(
                DispatchMethod::with_params(Verb::Get),
                EndpointMeta::new().tags(["House"]),
            )
    }
}
