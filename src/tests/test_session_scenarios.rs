#[cfg(test)]
mod tests {
    use serde_json::{Value, json};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::environment::provider::StaticEnvironment;
    use crate::models::activity::ActivityDetails;
    use crate::page::lifecycle::{Navigator, Page};
    use crate::reporter::activity::ActivityReporter;
    use crate::reporter::transport::HttpTransport;
    use crate::session::context::SessionContext;

    struct LocationBar(Mutex<Vec<String>>);

    impl Navigator for LocationBar {
        fn navigate(&self, path: &str) {
            self.0.lock().unwrap().push(path.to_string());
        }
    }

    fn http_reporter(endpoint: &str) -> (Arc<SessionContext>, ActivityReporter<HttpTransport>) {
        let context = Arc::new(SessionContext::initialize());
        let environment = Arc::new(StaticEnvironment::new("scenario/1.0", "1366x768", "fr-FR"));
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        let transport = HttpTransport::new(endpoint.parse().unwrap(), client);
        (Arc::clone(&context), ActivityReporter::new(context, environment, transport))
    }

    fn details(value: Value) -> ActivityDetails {
        value.as_object().cloned().unwrap()
    }

    /// A closed local port: connections are refused immediately.
    fn unreachable_endpoint() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        format!("http://127.0.0.1:{}/log-activity", port)
    }

    #[tokio::test]
    async fn test_load_then_unload_scenario() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/log-activity"))
            .and(header("content-type", "application/json"))
            .respond_with(ResponseTemplate::new(200))
            .expect(2)
            .mount(&server)
            .await;

        let (context, reporter) = http_reporter(&format!("{}/log-activity", server.uri()));

        reporter.log("page_loaded", details(json!({ "url": "/home" })));
        reporter.log("page_unload", details(json!({ "timeOnPage": 5 })));

        let activities = context.activities();
        assert_eq!(activities.len(), 2);
        assert_eq!(activities[0].action, "page_loaded");
        assert_eq!(activities[1].action, "page_unload");
        assert_eq!(activities[0].session_id, activities[1].session_id);
        assert_eq!(activities[0].session_id, context.session_id());

        assert!(reporter.settle(Duration::from_secs(5)).await);
        server.verify().await;
    }

    #[tokio::test]
    async fn test_wire_body_matches_record() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/log-activity"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let (context, reporter) = http_reporter(&format!("{}/log-activity", server.uri()));
        reporter.log("page_loaded", details(json!({ "url": "/home" })));
        assert!(reporter.settle(Duration::from_secs(5)).await);

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);

        let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
        let record = &context.activities()[0];
        assert_eq!(body, serde_json::to_value(record).unwrap());
        assert_eq!(body["action"], json!("page_loaded"));
        assert_eq!(body["details"], json!({ "url": "/home" }));
        assert_eq!(body["userAgent"], json!("scenario/1.0"));
        assert_eq!(body["screenResolution"], json!("1366x768"));
        assert_eq!(body["language"], json!("fr-FR"));
        assert!(body["timeFromLoad"].is_number());
    }

    #[tokio::test]
    async fn test_server_error_is_not_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let (context, reporter) = http_reporter(&format!("{}/log-activity", server.uri()));
        reporter.log_action("clicked");

        assert!(reporter.settle(Duration::from_secs(5)).await);
        assert_eq!(context.len(), 1);
        server.verify().await;
    }

    #[tokio::test]
    async fn test_unreachable_server_keeps_local_log() {
        let (context, reporter) = http_reporter(&unreachable_endpoint());

        reporter.log("page_loaded", details(json!({ "url": "/home" })));
        reporter.log_action("view_map_clicked");

        assert!(reporter.settle(Duration::from_secs(10)).await);
        let actions: Vec<String> = context.activities().into_iter().map(|a| a.action).collect();
        assert_eq!(actions, vec!["page_loaded", "view_map_clicked"]);
    }

    #[tokio::test]
    async fn test_redirect_does_not_wait_for_delivery() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let (context, reporter) = http_reporter(&format!("{}/log-activity", server.uri()));
        let page = Page::new(&reporter, LocationBar(Mutex::new(Vec::new())), "/venue-map");

        page.log_activity_and_navigate("view_map_clicked");

        assert_eq!(context.len(), 1);
        assert_eq!(*page.navigator().0.lock().unwrap(), vec!["/venue-map".to_string()]);
        assert_eq!(reporter.in_flight(), 1);
    }

    #[tokio::test]
    async fn test_full_page_lifetime() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/log-activity"))
            .respond_with(ResponseTemplate::new(204))
            .expect(3)
            .mount(&server)
            .await;

        let (context, reporter) = http_reporter(&format!("{}/log-activity", server.uri()));
        let page = Page::new(&reporter, LocationBar(Mutex::new(Vec::new())), "/venue-map");

        page.on_load("http://localhost:5000/");
        page.log_activity_and_navigate("get_tickets_clicked");
        page.on_unload();
        assert!(reporter.settle(Duration::from_secs(5)).await);

        let summary = context.summary();
        assert_eq!(summary.session_id, context.session_id());
        let actions: Vec<&str> = summary.activities.iter().map(|a| a.action.as_str()).collect();
        assert_eq!(actions, vec!["page_loaded", "get_tickets_clicked", "page_unload"]);

        let dumped = serde_json::to_value(&summary).unwrap();
        assert_eq!(dumped["activities"].as_array().unwrap().len(), 3);
        assert!(dumped["pageLoadTime"].is_string());

        server.verify().await;
    }
}
