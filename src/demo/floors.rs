use serde_json::{Value, json};

use crate::{
    core::{
        controller::{Controller, DispatchMethod, EndpointMeta, Endpoints, Verb},
        error::ApiResult,
        exchange::Exchange,
    },
    demo::houses::HouseId,
};

#[derive(Debug, Default)]
pub struct Floors;

impl Floors {
    fn house(exchange: &Exchange<'_>) -> Option<i64> {
        exchange.extensions().get::<HouseId>().map(|h| h.0)
    }

    fn list(&mut self, exchange: &mut Exchange<'_>) -> ApiResult<Value> {
        Ok(json!({ "houseId": Self::house(exchange), "floors": [] }))
    }

    fn show(&mut self, exchange: &mut Exchange<'_>) -> ApiResult<Value> {
        Ok(json!({
            "houseId": Self::house(exchange),
            "floorId": exchange.router_param("floorId", ""),
        }))
    }
}

impl Controller for Floors {
    fn endpoints() -> Endpoints<Self> {
        Endpoints::new()
            .get(Self::list)
            .get_params(Self::show)
            .describe(
                DispatchMethod::plain(Verb::Get),
                EndpointMeta::new()
                    .title("List ALL floors")
                    .description("List all the floors in the building")
                    .tags(["House", "MCP"]),
            )
            .describe(
                DispatchMethod::with_params(Verb::Get),
                EndpointMeta::new()
                    .title("List ONE floor")
                    .description("List one floor in the building")
                    .tags(["House"]),
            )
    }
}
