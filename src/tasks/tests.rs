//! Tests for tasks module
//!
//! These tests verify core task functionality including:
//! - Owner scoping and 404 for foreign tasks
//! - Sorting and completion filtering
//! - Payload validation
//! - Exports

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::common::testing::{
        body_bytes, body_json, empty_request, json_request, register_and_login, send, test_app,
    };
    use crate::common::Validator;
    use axum::http::{header, Method, StatusCode};
    use axum::Router;
    use serde_json::{json, Value};

    async fn create(app: &Router, token: &str, body: Value) -> Value {
        let response = send(app, json_request(Method::POST, "/tasks", Some(token), &body)).await;
        assert_eq!(response.status(), StatusCode::OK);
        body_json(response).await
    }

    async fn list(app: &Router, token: &str, query: &str) -> Vec<Value> {
        let uri = format!("/tasks{}", query);
        let response = send(app, empty_request(Method::GET, &uri, Some(token))).await;
        assert_eq!(response.status(), StatusCode::OK);
        body_json(response).await.as_array().unwrap().clone()
    }

    fn titles(tasks: &[Value]) -> Vec<&str> {
        tasks.iter().map(|t| t["title"].as_str().unwrap()).collect()
    }

    // ========================================================================
    // Validation
    // ========================================================================

    fn payload(title: &str) -> models::TaskCreate {
        serde_json::from_value(json!({ "title": title })).unwrap()
    }

    #[test]
    fn test_task_create_defaults() {
        let request = payload("Write report");
        assert!(request.priority.is_none());
        assert!(request.deadline.is_none());
        assert!(request.validate(&request).is_valid);
    }

    #[test]
    fn test_task_validation_errors() {
        let mut request = payload("   ");
        request.description = Some("x".repeat(5001));
        request.latitude = Some(91.0);
        request.longitude = Some(-181.0);

        let result = request.validate(&request);
        let fields: Vec<&str> = result.errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["title", "description", "latitude", "longitude"]);

        let long_title = payload(&"t".repeat(256));
        assert!(!long_title.validate(&long_title).is_valid);
    }

    #[test]
    fn test_deadline_parsing() {
        let parse = |v: &str| models::parse_deadline(v).map(|d| d.to_string());

        assert_eq!(parse("2030-01-01T10:00:00Z").as_deref(), Some("2030-01-01 10:00:00"));
        assert_eq!(parse("2030-01-01T12:00:00+02:00").as_deref(), Some("2030-01-01 10:00:00"));
        assert_eq!(parse("2030-01-01T10:00").as_deref(), Some("2030-01-01 10:00:00"));
        assert_eq!(parse("2030-01-01").as_deref(), Some("2030-01-01 00:00:00"));
        assert!(parse("next tuesday").is_none());

        let empty: models::TaskCreate =
            serde_json::from_value(json!({ "title": "x", "deadline": "" })).unwrap();
        assert!(empty.deadline.is_none());
    }

    #[test]
    fn test_order_by_clause() {
        let query = models::ListTasksQuery::default();
        assert_eq!(query.order_by_clause(), "id ASC");

        let query = models::ListTasksQuery {
            sort_by: Some(models::SortBy::Deadline),
            sort_order: Some(models::SortOrder::Desc),
            completed: None,
        };
        assert_eq!(
            query.order_by_clause(),
            "deadline IS NULL, deadline DESC, id ASC"
        );
    }

    // ========================================================================
    // Routes
    // ========================================================================

    #[tokio::test]
    async fn test_task_routes_require_auth() {
        let (app, _pool) = test_app().await;

        for (method, uri) in [
            (Method::GET, "/tasks"),
            (Method::GET, "/tasks/1"),
            (Method::DELETE, "/tasks/1"),
            (Method::GET, "/tasks/export/csv"),
        ] {
            let response = send(&app, empty_request(method, uri, None)).await;
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", uri);
        }
    }

    #[tokio::test]
    async fn test_crud_lifecycle() {
        let (app, _pool) = test_app().await;
        let token = register_and_login(&app, "crud@example.com").await;

        let created = create(
            &app,
            &token,
            json!({
                "title": "Buy milk",
                "description": "2 liters",
                "deadline": "2030-03-01T09:00:00",
                "priority": "High",
                "address": "Via Roma 1",
                "latitude": 45.46,
                "longitude": 9.19
            }),
        )
        .await;
        let id = created["id"].as_i64().unwrap();
        assert_eq!(created["priority"], "High");
        assert_eq!(created["completed"], false);
        assert_eq!(created["deadline"], "2030-03-01T09:00:00");
        assert_eq!(created["address"], "Via Roma 1");

        let uri = format!("/tasks/{}", id);
        let fetched = body_json(send(&app, empty_request(Method::GET, &uri, Some(&token))).await).await;
        assert_eq!(fetched["title"], "Buy milk");

        let response = send(
            &app,
            json_request(
                Method::PUT,
                &uri,
                Some(&token),
                &json!({ "title": "Buy oat milk", "priority": "Low", "completed": true }),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let updated = body_json(response).await;
        assert_eq!(updated["title"], "Buy oat milk");
        assert_eq!(updated["priority"], "Low");
        assert_eq!(updated["completed"], true);
        assert!(updated["description"].is_null());
        assert!(updated["deadline"].is_null());

        let response = send(&app, empty_request(Method::DELETE, &uri, Some(&token))).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({ "detail": "Task deleted" }));

        let response = send(&app, empty_request(Method::GET, &uri, Some(&token))).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(response).await["error"],
            "Task not found or not authorized"
        );
    }

    #[tokio::test]
    async fn test_invalid_payloads_rejected() {
        let (app, _pool) = test_app().await;
        let token = register_and_login(&app, "invalid@example.com").await;

        for body in [
            json!({ "title": "" }),
            json!({ "description": "no title" }),
            json!({ "title": "x", "priority": "Urgent" }),
            json!({ "title": "x", "deadline": "soon" }),
            json!({ "title": "x", "latitude": 100.0 }),
        ] {
            let response = send(&app, json_request(Method::POST, "/tasks", Some(&token), &body)).await;
            assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY, "{}", body);
        }
    }

    #[tokio::test]
    async fn test_foreign_task_is_not_found() {
        let (app, _pool) = test_app().await;
        let owner = register_and_login(&app, "owner@example.com").await;
        let intruder = register_and_login(&app, "intruder@example.com").await;

        let task = create(&app, &owner, json!({ "title": "Private" })).await;
        let uri = format!("/tasks/{}", task["id"]);

        let get = send(&app, empty_request(Method::GET, &uri, Some(&intruder))).await;
        assert_eq!(get.status(), StatusCode::NOT_FOUND);

        let put = send(
            &app,
            json_request(Method::PUT, &uri, Some(&intruder), &json!({ "title": "Mine now" })),
        )
        .await;
        assert_eq!(put.status(), StatusCode::NOT_FOUND);

        let patch = send(
            &app,
            json_request(Method::PATCH, &uri, Some(&intruder), &json!({ "completed": true })),
        )
        .await;
        assert_eq!(patch.status(), StatusCode::NOT_FOUND);

        let delete = send(&app, empty_request(Method::DELETE, &uri, Some(&intruder))).await;
        assert_eq!(delete.status(), StatusCode::NOT_FOUND);

        assert!(list(&app, &intruder, "").await.is_empty());
        let still_there = list(&app, &owner, "").await;
        assert_eq!(titles(&still_there), vec!["Private"]);
    }

    #[tokio::test]
    async fn test_sort_by_priority_then_deadline() {
        let (app, _pool) = test_app().await;
        let token = register_and_login(&app, "sort@example.com").await;

        create(&app, &token, json!({ "title": "low", "priority": "Low" })).await;
        create(&app, &token, json!({ "title": "medium", "priority": "Medium", "deadline": "2030-01-01T00:00:00" })).await;
        create(&app, &token, json!({ "title": "high-late", "priority": "High", "deadline": "2030-06-01T00:00:00" })).await;
        create(&app, &token, json!({ "title": "high-none", "priority": "High" })).await;
        create(&app, &token, json!({ "title": "high-soon", "priority": "High", "deadline": "2030-02-01T00:00:00" })).await;

        let asc = list(&app, &token, "?sort_by=priority").await;
        assert_eq!(
            titles(&asc),
            vec!["high-soon", "high-late", "high-none", "medium", "low"]
        );

        let desc = list(&app, &token, "?sort_by=priority&sort_order=desc").await;
        assert_eq!(
            titles(&desc),
            vec!["low", "medium", "high-late", "high-soon", "high-none"]
        );
    }

    #[tokio::test]
    async fn test_sort_by_deadline_and_insertion() {
        let (app, _pool) = test_app().await;
        let token = register_and_login(&app, "deadline@example.com").await;

        create(&app, &token, json!({ "title": "none" })).await;
        create(&app, &token, json!({ "title": "late", "deadline": "2031-01-01" })).await;
        create(&app, &token, json!({ "title": "soon", "deadline": "2030-01-01" })).await;

        let asc = list(&app, &token, "?sort_by=deadline&sort_order=asc").await;
        assert_eq!(titles(&asc), vec!["soon", "late", "none"]);

        let desc = list(&app, &token, "?sort_by=deadline&sort_order=desc").await;
        assert_eq!(titles(&desc), vec!["late", "soon", "none"]);

        let inserted = list(&app, &token, "?sort_by=insertion&sort_order=desc").await;
        assert_eq!(titles(&inserted), vec!["soon", "late", "none"]);

        let response = send(
            &app,
            empty_request(Method::GET, "/tasks?sort_by=random", Some(&token)),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_patch_completed_and_filter() {
        let (app, _pool) = test_app().await;
        let token = register_and_login(&app, "filter@example.com").await;

        let done = create(&app, &token, json!({ "title": "done" })).await;
        create(&app, &token, json!({ "title": "open" })).await;

        let uri = format!("/tasks/{}", done["id"]);
        let response = send(
            &app,
            json_request(Method::PATCH, &uri, Some(&token), &json!({ "completed": true })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["completed"], true);

        assert_eq!(titles(&list(&app, &token, "?completed=true").await), vec!["done"]);
        assert_eq!(titles(&list(&app, &token, "?completed=false").await), vec!["open"]);

        let response = send(
            &app,
            json_request(
                Method::PATCH,
                &uri,
                Some(&token),
                &json!({ "completed": false, "title": "sneaky" }),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_google_event_link_survives_full_update() {
        let (app, _pool) = test_app().await;
        let token = register_and_login(&app, "link@example.com").await;

        let task = create(&app, &token, json!({ "title": "Meeting" })).await;
        let uri = format!("/tasks/{}", task["id"]);
        let link_uri = format!("{}/google-event", uri);

        let linked = body_json(
            send(
                &app,
                json_request(Method::PUT, &link_uri, Some(&token), &json!({ "google_event_id": "evt_1" })),
            )
            .await,
        )
        .await;
        assert_eq!(linked["google_event_id"], "evt_1");

        let updated = body_json(
            send(
                &app,
                json_request(Method::PUT, &uri, Some(&token), &json!({ "title": "Meeting moved" })),
            )
            .await,
        )
        .await;
        assert_eq!(updated["google_event_id"], "evt_1");

        let cleared = body_json(
            send(
                &app,
                json_request(Method::PUT, &link_uri, Some(&token), &json!({ "google_event_id": null })),
            )
            .await,
        )
        .await;
        assert!(cleared["google_event_id"].is_null());
    }

    // ========================================================================
    // Exports
    // ========================================================================

    #[tokio::test]
    async fn test_export_csv_line_counts() {
        let (app, _pool) = test_app().await;
        let token = register_and_login(&app, "csv@example.com").await;

        let response = send(&app, empty_request(Method::GET, "/tasks/export/csv", Some(&token))).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/csv; charset=utf-8"
        );
        assert_eq!(
            response.headers().get(header::CONTENT_DISPOSITION).unwrap(),
            "attachment; filename=tasks.csv"
        );
        let csv = String::from_utf8(body_bytes(response).await).unwrap();
        assert_eq!(csv.lines().count(), 1);
        assert!(csv.starts_with("ID,Title,Description,Deadline,Priority,Completed"));

        for i in 0..3 {
            create(&app, &token, json!({ "title": format!("task {}", i) })).await;
        }

        let response = send(&app, empty_request(Method::GET, "/tasks/export/csv", Some(&token))).await;
        let csv = String::from_utf8(body_bytes(response).await).unwrap();
        assert_eq!(csv.lines().count(), 4);
    }

    #[tokio::test]
    async fn test_export_respects_filters() {
        let (app, _pool) = test_app().await;
        let token = register_and_login(&app, "filtered@example.com").await;

        create(&app, &token, json!({ "title": "open" })).await;
        create(&app, &token, json!({ "title": "closed", "completed": true })).await;

        let response = send(
            &app,
            empty_request(Method::GET, "/tasks/export/csv?completed=true", Some(&token)),
        )
        .await;
        let csv = String::from_utf8(body_bytes(response).await).unwrap();
        assert_eq!(csv.lines().count(), 2);
        assert!(csv.contains(",closed,"));
        assert!(csv.contains(",Yes"));
    }

    #[tokio::test]
    async fn test_export_excel_and_pdf() {
        let (app, _pool) = test_app().await;
        let token = register_and_login(&app, "binary@example.com").await;
        create(&app, &token, json!({ "title": "Quarterly report", "deadline": "2030-04-01T17:00:00" })).await;

        let xlsx = send(&app, empty_request(Method::GET, "/tasks/export/excel", Some(&token))).await;
        assert_eq!(xlsx.status(), StatusCode::OK);
        assert_eq!(
            xlsx.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
        );
        assert!(body_bytes(xlsx).await.starts_with(b"PK"));

        let pdf = send(&app, empty_request(Method::GET, "/tasks/export/pdf", Some(&token))).await;
        assert_eq!(pdf.status(), StatusCode::OK);
        assert_eq!(pdf.headers().get(header::CONTENT_TYPE).unwrap(), "application/pdf");
        assert!(body_bytes(pdf).await.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn test_export_unknown_format() {
        let (app, _pool) = test_app().await;
        let token = register_and_login(&app, "xml@example.com").await;

        let response = send(&app, empty_request(Method::GET, "/tasks/export/xml", Some(&token))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
