// HTTP and notification triggers end to end through LambdaHandler:
//  - header normalization and JSON body parsing of proxy events
//  - panics on HTTP triggers answer 500, typed failures fail the invocation
//  - authorizer denial, SNS and DynamoDB projections

#[cfg(test)]
mod test {

    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::Deserialize;
    use serde_json::{json, Value};

    use crate::lambda::authorizer::{self, ApiGatewayAuthorizerEvent, AuthorizerResponse, Effect, Unauthorized};
    use crate::lambda::body::{parse_json_body, ParsedBody};
    use crate::lambda::dynamodb::{self, DynamoDbEvent};
    use crate::lambda::headers::normalize;
    use crate::lambda::http_api::{self, ApiGatewayV2HttpRequest, ApiGatewayV2HttpResponse};
    use crate::lambda::request::{
        schema_body_json, schema_path_params, schema_query_params, ParseError, ProxyRequest,
    };
    use crate::lambda::rest_api::{self, ApiGatewayProxyRequest, ApiGatewayProxyResponse};
    use crate::lambda::sns::{self, SnsEvent};
    use crate::lambda::{HandlerContext, InvocationContext, InvocationError, Lifecycle, Resources};

    #[derive(Debug, Deserialize, PartialEq)]
    struct Person {
        name: String,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct OrderPath {
        id: String,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Paging {
        page: String,
        limit: Option<String>,
    }

    fn headers(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn rest_request(content_type: &str, body: &str, is_base64_encoded: bool) -> ApiGatewayProxyRequest {
        ApiGatewayProxyRequest {
            http_method: "POST".to_owned(),
            headers: headers(&[("Content-Type", content_type)]),
            body: Some(body.to_owned()),
            is_base64_encoded,
            ..ApiGatewayProxyRequest::default()
        }
    }

    #[test]
    fn headers_are_lowercased_and_raw_headers_kept() {
        let original = ApiGatewayProxyRequest {
            headers: headers(&[("Content-Type", "application/json"), ("Foo", "Bar")]),
            ..ApiGatewayProxyRequest::default()
        };
        let normalized = normalize(&original);

        assert_eq!(
            normalized.event.headers,
            headers(&[("content-type", "application/json"), ("foo", "Bar")])
        );
        assert_eq!(normalized.raw_headers, original.headers);
        assert_eq!(original.normalized_headers(), normalized.event.headers);
        assert_eq!(original.header("content-type"), Some("application/json"));
        // input untouched
        assert!(original.headers.contains_key("Content-Type"));
    }

    #[test]
    fn base64_json_body_is_decoded_and_raw_body_kept() {
        let encoded = STANDARD.encode(r#"{"name":"Ada"}"#);
        let request = rest_request("application/json", &encoded, true);

        let parsed = parse_json_body(&request).unwrap();
        assert_eq!(parsed.json(), Some(&json!({"name": "Ada"})));
        assert_eq!(parsed.raw(), Some(encoded.as_str()));

        let person: Person = schema_body_json(&request).unwrap();
        assert_eq!(person, Person { name: "Ada".to_owned() });
    }

    #[test]
    fn non_json_bodies_pass_through() {
        let encoded = STANDARD.encode("hello");
        let request = rest_request("text/plain", &encoded, true);
        assert_eq!(parse_json_body(&request).unwrap(), ParsedBody::Raw(encoded));

        let no_body = ApiGatewayProxyRequest::default();
        assert_eq!(parse_json_body(&no_body).unwrap(), ParsedBody::Absent);
    }

    #[test]
    fn invalid_bodies_are_parse_errors() {
        let request = rest_request("application/json", "{not json", false);
        assert!(matches!(parse_json_body(&request), Err(ParseError::Json(_))));

        let request = rest_request("application/json", "%%%", true);
        assert!(matches!(parse_json_body(&request), Err(ParseError::Base64(_))));

        let request = rest_request("application/json", r#"{"nickname":"Ada"}"#, false);
        let err = schema_body_json::<Person, _>(&request).unwrap_err();
        assert!(matches!(err, ParseError::Schema { target: "body", .. }));
    }

    #[test]
    fn path_and_query_parameters_decode_into_types() {
        let request = ApiGatewayV2HttpRequest {
            path_parameters: Some(headers(&[("id", "42")])),
            query_string_parameters: Some(headers(&[("page", "3")])),
            ..ApiGatewayV2HttpRequest::default()
        };
        let path: OrderPath = schema_path_params(&request).unwrap();
        assert_eq!(path.id, "42");
        let paging: Paging = schema_query_params(&request).unwrap();
        assert_eq!(paging, Paging { page: "3".to_owned(), limit: None });

        let empty = ApiGatewayV2HttpRequest::default();
        assert!(matches!(
            schema_path_params::<OrderPath, _>(&empty),
            Err(ParseError::Schema { target: "path parameters", .. })
        ));
    }

    async fn greet(ctx: HandlerContext<ApiGatewayProxyRequest>) -> anyhow::Result<ApiGatewayProxyResponse> {
        let person: Person = schema_body_json(ctx.event())?;
        Ok(ApiGatewayProxyResponse::json(200, &json!({ "hello": person.name }))?)
    }

    async fn exploding(_ctx: HandlerContext<ApiGatewayProxyRequest>) -> anyhow::Result<ApiGatewayProxyResponse> {
        panic!("database handle dropped")
    }

    #[tokio::test]
    async fn rest_handler_answers_program_output() {
        let handler = rest_api::to_handler(greet, Lifecycle::empty());
        let response = handler
            .invoke(
                rest_request("application/json", r#"{"name":"Ada"}"#, false),
                InvocationContext::new("req-1"),
            )
            .await
            .unwrap();

        assert_eq!(response.status_code, 200);
        assert_eq!(response.headers.get("content-type").map(String::as_str), Some("application/json"));
        assert_eq!(serde_json::from_str::<Value>(&response.body).unwrap(), json!({"hello": "Ada"}));
    }

    #[tokio::test]
    async fn rest_handler_defect_answers_500() {
        let handler = rest_api::to_handler(exploding, Lifecycle::empty());
        let response = handler
            .invoke(ApiGatewayProxyRequest::default(), InvocationContext::new("req-2"))
            .await
            .unwrap();

        assert_eq!(response.status_code, 500);
        assert_eq!(
            serde_json::from_str::<Value>(&response.body).unwrap(),
            json!({"message": "Internal Server Error"})
        );
    }

    #[tokio::test]
    async fn typed_failure_fails_the_invocation() {
        let handler = rest_api::to_handler(greet, Lifecycle::empty());
        let outcome = handler
            .invoke(rest_request("application/json", "{broken", false), InvocationContext::new("req-3"))
            .await;

        match outcome {
            Err(InvocationError::Failed(err)) => assert!(err.downcast_ref::<ParseError>().is_some()),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn http_api_handler_through_raw_json() {
        let handler = http_api::to_handler(
            |ctx: HandlerContext<ApiGatewayV2HttpRequest>| async move {
                let method = ctx.event().method().unwrap_or("?").to_owned();
                anyhow::Ok(ApiGatewayV2HttpResponse::new(200, format!("{} {}", method, ctx.event().raw_path)))
            },
            Lifecycle::empty(),
        );
        let payload = json!({
            "version": "2.0",
            "routeKey": "GET /orders",
            "rawPath": "/orders",
            "rawQueryString": "",
            "headers": null,
            "requestContext": { "http": { "method": "GET" } },
            "isBase64Encoded": false
        });

        let answer = handler.invoke_json(payload, InvocationContext::new("req-4")).await.unwrap();
        assert_eq!(answer, json!({"statusCode": 200, "body": "GET /orders"}));

        let bad = handler.invoke_json(json!("not an event"), InvocationContext::new("req-5")).await;
        assert!(matches!(bad, Err(InvocationError::Payload(_))));
    }

    #[tokio::test]
    async fn http_api_defect_answers_500() {
        let handler = http_api::to_handler(
            |ctx: HandlerContext<ApiGatewayV2HttpRequest>| async move {
                if ctx.event().raw_path == "/boom" {
                    panic!("boom");
                }
                anyhow::Ok(ApiGatewayV2HttpResponse::new(204, ""))
            },
            Lifecycle::empty(),
        );
        let request = ApiGatewayV2HttpRequest {
            raw_path: "/boom".to_owned(),
            ..ApiGatewayV2HttpRequest::default()
        };
        let response = handler.invoke(request, InvocationContext::new("req-6")).await.unwrap();
        assert_eq!(response, ApiGatewayV2HttpResponse::internal_server_error());
    }

    async fn check_token(ctx: HandlerContext<ApiGatewayAuthorizerEvent>) -> anyhow::Result<AuthorizerResponse> {
        match ctx.event() {
            ApiGatewayAuthorizerEvent::Token(event) if event.authorization_token == "Bearer letmein" => {
                Ok(AuthorizerResponse::allow("user-1", &event.method_arn).with_context("tier", "gold"))
            }
            _ => Err(Unauthorized.into()),
        }
    }

    #[tokio::test]
    async fn authorizer_allows_or_reports_unauthorized() {
        let handler = authorizer::to_handler(check_token, Lifecycle::empty());
        let arn = "arn:aws:execute-api:eu-west-1:123456789012:api/prod/GET/orders";

        let allowed = handler
            .invoke_json(
                json!({"type": "TOKEN", "authorizationToken": "Bearer letmein", "methodArn": arn}),
                InvocationContext::new("req-7"),
            )
            .await
            .unwrap();
        assert_eq!(allowed["principalId"], "user-1");
        assert_eq!(allowed["policyDocument"]["Version"], "2012-10-17");
        assert_eq!(allowed["policyDocument"]["Statement"][0]["Effect"], "Allow");
        assert_eq!(allowed["policyDocument"]["Statement"][0]["Resource"][0], arn);
        assert_eq!(allowed["context"]["tier"], "gold");

        let denied = handler
            .invoke_json(
                json!({"type": "TOKEN", "authorizationToken": "Bearer nope", "methodArn": arn}),
                InvocationContext::new("req-8"),
            )
            .await;
        let err = denied.unwrap_err();
        assert!(matches!(err, InvocationError::Unauthorized));
        assert_eq!(err.to_string(), "Unauthorized");

        let deny = AuthorizerResponse::deny("anonymous", arn);
        assert_eq!(deny.policy_document.statement[0].effect, Effect::Deny);
    }

    #[derive(Default)]
    struct Inbox {
        received: std::sync::Mutex<Vec<String>>,
    }

    impl Resources for Inbox {}

    #[tokio::test]
    async fn sns_messages_reach_the_program() {
        let lifecycle = Lifecycle::new(Inbox::default());
        let handler = sns::to_handler(
            |ctx: HandlerContext<SnsEvent, Inbox>| async move {
                let messages: Vec<String> = ctx.event().messages().into_iter().map(str::to_owned).collect();
                ctx.resources().received.lock().unwrap().extend(messages);
                anyhow::Ok(())
            },
            lifecycle.clone(),
        );
        let payload = json!({
            "Records": [
                {"EventSource": "aws:sns", "Sns": {"MessageId": "n-1", "Type": "Notification", "Message": "first"}},
                {"EventSource": "aws:sns", "Sns": {"MessageId": "n-2", "Type": "Notification", "Message": "second", "Subject": null}}
            ]
        });

        let answer = handler.invoke_json(payload, InvocationContext::new("req-9")).await.unwrap();
        assert_eq!(answer, Value::Null);
        assert_eq!(*lifecycle.resources().received.lock().unwrap(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn dynamodb_new_images_projection() {
        let calls = std::sync::Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let handler = dynamodb::to_handler(
            move |ctx: HandlerContext<DynamoDbEvent>| {
                let calls = calls_clone.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    anyhow::Ok(ctx.event().new_images().into_iter().filter(Option::is_some).count())
                }
            },
            Lifecycle::empty(),
        );
        let payload = json!({
            "Records": [
                {"eventID": "e-1", "eventName": "INSERT", "dynamodb": {"NewImage": {"id": {"S": "1"}}, "SequenceNumber": "100"}},
                {"eventID": "e-2", "eventName": "REMOVE", "dynamodb": {"OldImage": {"id": {"S": "2"}}, "SequenceNumber": "101"}}
            ]
        });

        let inserted = handler.invoke_json(payload, InvocationContext::new("req-10")).await.unwrap();
        assert_eq!(inserted, json!(1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn building_handlers_installs_shutdown_hook_once() {
        let lifecycle = Lifecycle::new(Inbox::default());
        assert!(!lifecycle.has_shutdown_hook());

        let _notifications = sns::to_handler(
            |_ctx: HandlerContext<SnsEvent, Inbox>| async move { anyhow::Ok(()) },
            lifecycle.clone(),
        );
        assert!(lifecycle.has_shutdown_hook());

        let _second = sns::to_handler(
            |_ctx: HandlerContext<SnsEvent, Inbox>| async move { anyhow::Ok(()) },
            lifecycle.clone(),
        );
        // already registered by the first handler
        assert!(lifecycle.install_shutdown_hook().unwrap().is_none());
        assert!(!lifecycle.is_released());
    }
}
