// End-to-end dispatch through the demo houses API
#[cfg(test)]
mod test {
    use arbor::{
        ApiInfo, ApiRequest, ApiResponse, Router,
        core::{ApiError, schema::SchemaErrors},
        demo,
    };
    use http::{Method, StatusCode};
    use serde_json::{Value, json};

    fn router() -> Router {
        demo::router("Controllers", ApiInfo::default()).unwrap()
    }

    fn send(method: Method, path: &str, body: Option<Value>) -> ApiResponse {
        let mut request = ApiRequest::new(method, path);
        if let Some(body) = body {
            request = request.with_json(&body);
        }
        router().handle(request)
    }

    fn json_body(response: &ApiResponse) -> Value {
        serde_json::from_str(&response.body).unwrap()
    }

    fn validation_errors(body: Value) -> SchemaErrors {
        match router().dispatch(ApiRequest::new(Method::POST, "/api/houses").with_json(&body)) {
            Err(ApiError::Validation(errors)) => errors,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_plain_get_without_params() {
        let response = send(Method::GET, "/api/houses", None);
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body, "List Houses");
    }

    #[test]
    fn test_bound_param_selects_params_variant() {
        let response = send(Method::GET, "/api/houses/1", None);
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(json_body(&response), json!({"id": 1, "city": null}));
    }

    #[test]
    fn test_missing_required_fields() {
        let response = send(Method::POST, "/api/houses", Some(json!({})));
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(&response)["errors"]["missing"],
            json!(["name", "street", "streetNumber"])
        );

        let errors = validation_errors(json!({"name": "FooBar"}));
        assert_eq!(errors.missing, vec!["street", "streetNumber"]);
    }

    #[test]
    fn test_empty_body_counts_as_empty_object() {
        let response = send(Method::POST, "/api/houses", None);
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(json_body(&response)["errors"]["missing"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_invalid_field_types() {
        let response = send(
            Method::POST,
            "/api/houses",
            Some(json!({"name": "FooBar", "street": "123 Main St.", "streetNumber": "10"})),
        );
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        let body = json_body(&response);
        assert_eq!(body["errors"]["invalid"], json!(["streetNumber"]));
        assert!(body["errors"].get("missing").is_none());

        let cases = [
            (json!({"name": null, "street": "s", "streetNumber": 10}), "name"),
            (json!({"name": "n", "street": "s", "streetNumber": 10, "locked": "locked"}), "locked"),
            (json!({"name": "n", "street": "s", "streetNumber": 10, "builtYear": "1983"}), "builtYear"),
        ];
        for (body, field) in cases {
            assert_eq!(validation_errors(body).invalid, vec![field]);
        }
    }

    #[test]
    fn test_valid_body_is_filtered() {
        let response = send(
            Method::POST,
            "/api/houses",
            Some(json!({
                "name": "FooBar",
                "street": "123 Main St.",
                "streetNumber": 10,
                "builtYear": 1983,
                "owner": "not in schema",
            })),
        );
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(
            json_body(&response),
            json!({"name": "FooBar", "street": "123 Main St.", "streetNumber": 10, "builtYear": 1983})
        );
    }

    #[test]
    fn test_malformed_body() {
        let response = router().handle(
            ApiRequest::new(Method::POST, "/api/houses").with_body("[1, 2, 3]"),
        );
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert!(json_body(&response).get("errors").is_none());
    }

    #[test]
    fn test_undeclared_verb_is_not_implemented() {
        let response = send(Method::PATCH, "/api/houses", None);
        assert_eq!(response.status, StatusCode::NOT_IMPLEMENTED);
        assert_eq!(json_body(&response), json!({"msg": "Not implemented - PATCH"}));
    }

    #[test]
    fn test_unknown_segment() {
        let response = send(Method::GET, "/api/404", None);
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert_eq!(json_body(&response), json!({"msg": "404 - 404 not found in /api/404"}));
    }

    #[test]
    fn test_hook_data_reaches_nested_handler() {
        let response = send(Method::GET, "/api/houses/7/floors/2", None);
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(json_body(&response), json!({"houseId": 7, "floorId": "2"}));

        let response = send(Method::GET, "/api/houses/7/floors", None);
        assert_eq!(json_body(&response), json!({"houseId": 7, "floors": []}));
    }

    #[test]
    fn test_hook_rejects_bad_house_id() {
        let response = send(Method::GET, "/api/houses/abc/floors", None);
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert_eq!(json_body(&response), json!({"msg": "House abc not found"}));
    }

    #[test]
    fn test_literal_child_wins_over_pending_param() {
        // `floors` names a child of `houses`, so it is never bound as houseId
        let response = send(Method::GET, "/api/houses/floors", None);
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(json_body(&response), json!({"houseId": null, "floors": []}));
    }

    #[test]
    fn test_path_without_handler() {
        let response = send(Method::GET, "/api", None);
        assert_eq!(response.status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_query_string_is_ignored() {
        let response = send(Method::GET, "/api/houses?page=2", None);
        assert_eq!(response.body, "List Houses");
    }
}
