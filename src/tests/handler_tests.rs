//! tests/handler_tests.rs
//! Pruebas de los endpoints HTTP con `actix_web::test`.

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test, web, App};
    use serde_json::{json, Value};

    use crate::app::init_app;
    use crate::config::worker_config::WorkerConfig;
    use crate::services::scheduler_service::MediaWorkerScheduler;
    use crate::tests::{test_env, TestEnv};

    fn app_config() -> WorkerConfig {
        WorkerConfig {
            interval_minutes: 60.0,
            ..WorkerConfig::default()
        }
    }

    macro_rules! init_test_app {
        ($env:expr, $scheduler:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new($env.ad_service.clone()))
                    .app_data(web::Data::new($scheduler.clone()))
                    .app_data(web::Data::new(app_config()))
                    .configure(init_app),
            )
            .await
        };
    }

    fn scheduler_for(env: &TestEnv) -> MediaWorkerScheduler {
        MediaWorkerScheduler::new(env.worker(3, true))
    }

    #[actix_rt::test]
    async fn test_worker_start_status_stop() {
        let env = test_env().await;
        let scheduler = scheduler_for(&env);
        let app = init_test_app!(env, scheduler);

        let req = test::TestRequest::post()
            .uri("/api/media-worker")
            .set_json(json!({ "intervalMinutes": 60 }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["running"], json!(true));
        assert_eq!(body["intervalMinutes"], json!(60.0));

        let req = test::TestRequest::get().uri("/api/media-worker").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["running"], json!(true));

        let req = test::TestRequest::delete().uri("/api/media-worker").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["running"], json!(false));

        let req = test::TestRequest::get().uri("/api/media-worker").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["running"], json!(false));

        scheduler.shutdown().await;
    }

    #[actix_rt::test]
    async fn test_worker_start_without_body_uses_defaults() {
        let env = test_env().await;
        let scheduler = scheduler_for(&env);
        let app = init_test_app!(env, scheduler);

        let req = test::TestRequest::post().uri("/api/media-worker").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["running"], json!(true));
        assert_eq!(body["batchSize"], json!(5));

        scheduler.shutdown().await;
    }

    #[actix_rt::test]
    async fn test_worker_start_invalid_interval() {
        let env = test_env().await;
        let scheduler = scheduler_for(&env);
        let app = init_test_app!(env, scheduler);

        let req = test::TestRequest::post()
            .uri("/api/media-worker")
            .set_json(json!({ "intervalMinutes": 0 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(!scheduler.is_running().await);
    }

    #[actix_rt::test]
    async fn test_worker_health_endpoint() {
        let env = test_env().await;
        let scheduler = scheduler_for(&env);
        let app = init_test_app!(env, scheduler);

        let req = test::TestRequest::get()
            .uri("/api/media-worker/health")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_rt::test]
    async fn test_run_batch_endpoint() {
        let env = test_env().await;
        let scheduler = scheduler_for(&env);
        let app = init_test_app!(env, scheduler);

        env.create_image_ad("http://127.0.0.1:1/ad.jpg").await;

        let req = test::TestRequest::post()
            .uri("/api/media-worker/run")
            .set_json(json!({ "batchSize": 5 }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["outcome"], json!("completed"));
        assert_eq!(body["selected"], json!(1));
        assert_eq!(body["failed"], json!(1));
    }

    #[actix_rt::test]
    async fn test_ads_crud_and_retry() {
        let env = test_env().await;
        let scheduler = scheduler_for(&env);
        let app = init_test_app!(env, scheduler);

        // Sin URLs -> 400
        let req = test::TestRequest::post()
            .uri("/api/ads")
            .set_json(json!({}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::post()
            .uri("/api/ads")
            .set_json(json!({ "remoteImageUrl": "https://cdn.example.com/a.jpg" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created: Value = test::read_body_json(resp).await;
        let id = created["id"].as_str().unwrap().to_string();

        let req = test::TestRequest::get()
            .uri(&format!("/api/ads/{}", id))
            .to_request();
        let ad: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(ad["mediaStatus"], json!("pending"));
        assert_eq!(ad["mediaRetryCount"], json!(0));

        let req = test::TestRequest::get()
            .uri("/api/ads?status=pending")
            .to_request();
        let list: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(list["total"], json!(1));

        // Solo se reintentan los 'failed'
        let req = test::TestRequest::post()
            .uri(&format!("/api/ads/{}/retry", id))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        env.ad_service.mark_failed(&id, "HTTP 404").await.unwrap();
        let req = test::TestRequest::post()
            .uri(&format!("/api/ads/{}/retry", id))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let req = test::TestRequest::get()
            .uri("/api/ads/no-existe")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_rt::test]
    async fn test_worker_start_rejects_malformed_body() {
        let env = test_env().await;
        let scheduler = scheduler_for(&env);
        let app = init_test_app!(env, scheduler);

        let req = test::TestRequest::post()
            .uri("/api/media-worker")
            .set_json(json!({ "intervalMinutes": "abc" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::post()
            .uri("/api/media-worker")
            .insert_header(("content-type", "application/json"))
            .set_payload("{not json")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::get().uri("/api/media-worker").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["running"], json!(false));
        assert!(!scheduler.is_running().await);
    }

    #[actix_rt::test]
    async fn test_run_batch_rejects_malformed_body() {
        let env = test_env().await;
        let scheduler = scheduler_for(&env);
        let app = init_test_app!(env, scheduler);

        env.create_image_ad("http://127.0.0.1:1/ad.jpg").await;

        let req = test::TestRequest::post()
            .uri("/api/media-worker/run")
            .set_json(json!({ "batchSize": "muchos" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        // No se procesó nada
        let counts = env.ad_service.count_by_status().await.unwrap();
        assert_eq!(counts.pending, 1);
    }

    #[actix_rt::test]
    async fn test_worker_health_endpoint_dead_task() {
        let env = test_env().await;
        let scheduler = scheduler_for(&env);
        let app = init_test_app!(env, scheduler);

        scheduler.start(60.0, 5).await.unwrap();
        scheduler.abort_task().await;

        let req = test::TestRequest::get()
            .uri("/api/media-worker/health")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["healthy"], json!(false));

        scheduler.shutdown().await;
    }

    #[actix_rt::test]
    async fn test_list_ads_page_out_of_range() {
        let env = test_env().await;
        let scheduler = scheduler_for(&env);
        let app = init_test_app!(env, scheduler);

        let req = test::TestRequest::get()
            .uri(&format!("/api/ads?page={}&page_size=100", u64::MAX))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        // Una página grande pero representable devuelve vacío
        let req = test::TestRequest::get()
            .uri("/api/ads?page=1000000&page_size=100")
            .to_request();
        let list: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(list["items"], json!([]));
    }
}
