use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderName, HeaderValue},
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::error::AppError;
use crate::middleware::AuthenticatedSubject;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

tokio::task_local! {
    static REQUEST_ID: String;
}

/// Id of the request currently being served, if it passed through `LoggerMiddleware`
pub fn current_request_id() -> Option<String> {
    REQUEST_ID.try_with(|id| id.clone()).ok()
}

/// Request logging middleware
///
/// Assigns every request one id, used for the log line, the `x-request-id`
/// response header and the `error_id` of error bodies. Logs method, path,
/// status and latency, plus the admitted subject on protected routes.
/// Never logs headers or bodies. Requests running longer than the timeout
/// are abandoned with a 503.
pub struct LoggerMiddleware {
    request_timeout: Duration,
}

impl LoggerMiddleware {
    pub fn new(request_timeout: Duration) -> Self {
        Self { request_timeout }
    }
}

impl<S, B> Transform<S, ServiceRequest> for LoggerMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = LoggerMiddlewareService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(LoggerMiddlewareService {
            service: Rc::new(service),
            request_timeout: self.request_timeout,
        }))
    }
}

pub struct LoggerMiddlewareService<S> {
    service: Rc<S>,
    request_timeout: Duration,
}

impl<S, B> Service<ServiceRequest> for LoggerMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let start_time = Instant::now();
        let request_id = uuid::Uuid::new_v4().to_string();
        let method = req.method().to_string();
        let path = req.path().to_string();
        let http_req = req.request().clone();
        let request_timeout = self.request_timeout;

        tracing::debug!(request_id = %request_id, method = %method, path = %path, "Request started");

        let service = self.service.clone();

        Box::pin(REQUEST_ID.scope(request_id.clone(), async move {
            // Errors are rendered inside the scope so their bodies carry this request's id
            let mut res = match tokio::time::timeout(request_timeout, service.call(req)).await {
                Ok(Ok(res)) => res.map_into_left_body(),
                Ok(Err(e)) => ServiceResponse::from_err(e, http_req).map_into_right_body(),
                Err(_) => {
                    let e = AppError::Timeout(request_timeout.as_secs());
                    ServiceResponse::from_err(e, http_req).map_into_right_body()
                }
            };

            if let Ok(value) = HeaderValue::from_str(&request_id) {
                res.headers_mut()
                    .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
            }

            let subject = res
                .request()
                .extensions()
                .get::<AuthenticatedSubject>()
                .map(|s| s.subject.clone());

            tracing::info!(
                request_id = %request_id,
                method = %method,
                path = %path,
                status = res.status().as_u16(),
                elapsed_ms = start_time.elapsed().as_millis() as u64,
                subject = subject.as_deref().unwrap_or("-"),
                "Request completed"
            );

            Ok(res)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, web, App, HttpResponse};

    async fn slow() -> HttpResponse {
        tokio::time::sleep(Duration::from_millis(500)).await;
        HttpResponse::Ok().finish()
    }

    async fn failing() -> Result<HttpResponse, AppError> {
        Err(AppError::Forbidden("not yours".to_string()))
    }

    async fn echo_request_id() -> HttpResponse {
        HttpResponse::Ok().body(current_request_id().unwrap_or_default())
    }

    #[actix_web::test]
    async fn test_slow_request_times_out() {
        let app = test::init_service(
            App::new()
                .wrap(LoggerMiddleware::new(Duration::from_millis(50)))
                .route("/slow", web::get().to(slow)),
        )
        .await;

        let res = test::call_service(&app, test::TestRequest::get().uri("/slow").to_request()).await;

        assert_eq!(res.status().as_u16(), 503);
        let body: serde_json::Value = test::read_body_json(res).await;
        assert_eq!(body["code"], "SERVICE_UNAVAILABLE");
    }

    #[actix_web::test]
    async fn test_error_id_matches_request_id_header() {
        let app = test::init_service(
            App::new()
                .wrap(LoggerMiddleware::new(Duration::from_secs(5)))
                .route("/failing", web::get().to(failing)),
        )
        .await;

        let res =
            test::call_service(&app, test::TestRequest::get().uri("/failing").to_request()).await;

        assert_eq!(res.status().as_u16(), 403);
        let header = res.headers().get(REQUEST_ID_HEADER).unwrap().to_str().unwrap().to_string();
        let body: serde_json::Value = test::read_body_json(res).await;
        assert_eq!(body["error_id"], header.as_str());
    }

    #[actix_web::test]
    async fn test_handlers_see_the_request_id() {
        let app = test::init_service(
            App::new()
                .wrap(LoggerMiddleware::new(Duration::from_secs(5)))
                .route("/id", web::get().to(echo_request_id)),
        )
        .await;

        let res = test::call_service(&app, test::TestRequest::get().uri("/id").to_request()).await;

        let header = res.headers().get(REQUEST_ID_HEADER).unwrap().to_str().unwrap().to_string();
        let body = test::read_body(res).await;
        assert!(!header.is_empty());
        assert_eq!(body, header.as_bytes());
        assert!(current_request_id().is_none());
    }
}
