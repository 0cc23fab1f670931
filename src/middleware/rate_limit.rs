//! Per-client-IP rate limiting for reservation writes.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread::JoinHandle;
use std::time::Duration;

use axum::body::Body;
use governor::middleware::NoOpMiddleware;
use http::{HeaderValue, Response, StatusCode};
use tower_governor::governor::{GovernorConfig, GovernorConfigBuilder};
use tower_governor::key_extractor::SmartIpKeyExtractor;
use tower_governor::{GovernorError, GovernorLayer};

use crate::config::RateLimitConfig;

pub type WriteGovernorConfig = GovernorConfig<SmartIpKeyExtractor, NoOpMiddleware>;

const CLEANUP_INTERVAL_SECS: u64 = 60;

/// Time after which one more request is allowed. `None` for a zero rate.
fn replenish_interval(per_second: u32) -> Option<Duration> {
    (per_second > 0).then(|| Duration::from_secs(1) / per_second)
}

fn json_error(status: StatusCode, body: serde_json::Value) -> Response<Body> {
    let mut resp = Response::new(Body::from(body.to_string()));
    *resp.status_mut() = status;
    resp.headers_mut().insert(
        http::header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    resp
}

/// Render limiter rejections with the same JSON error shape as `AppError`.
fn rate_limit_error(error: GovernorError) -> Response<Body> {
    match error {
        GovernorError::TooManyRequests { wait_time, headers } => {
            let mut resp = json_error(
                StatusCode::TOO_MANY_REQUESTS,
                serde_json::json!({
                    "error": {
                        "code": "RATE_LIMITED",
                        "message": "Rate limit exceeded",
                        "details": { "retryAfterSeconds": wait_time }
                    }
                }),
            );
            if let Some(hmap) = headers {
                for (name, value) in hmap.iter() {
                    resp.headers_mut().append(name.clone(), value.clone());
                }
            }
            resp.headers_mut()
                .insert(http::header::RETRY_AFTER, HeaderValue::from(wait_time));
            resp
        }
        GovernorError::UnableToExtractKey => json_error(
            StatusCode::BAD_REQUEST,
            serde_json::json!({
                "error": {
                    "code": "BAD_REQUEST",
                    "message": "Unable to determine client IP for rate limiting"
                }
            }),
        ),
        GovernorError::Other { code, msg, headers } => {
            let mut resp = json_error(
                code,
                serde_json::json!({
                    "error": {
                        "code": "RATE_LIMIT_ERROR",
                        "message": msg.unwrap_or_else(|| "Rate limiting error".to_string())
                    }
                }),
            );
            if let Some(hmap) = headers {
                for (name, value) in hmap.iter() {
                    resp.headers_mut().append(name.clone(), value.clone());
                }
            }
            resp
        }
    }
}

/// Limiter for reservation writes: `write_burst` requests up front, then
/// `write_per_second` more every second, keyed by client IP.
pub fn write_governor(config: &RateLimitConfig) -> anyhow::Result<Arc<WriteGovernorConfig>> {
    let period = replenish_interval(config.write_per_second).ok_or_else(|| {
        anyhow::anyhow!("RATE_LIMIT_WRITE_PER_SECOND must be greater than zero")
    })?;

    // `key_extractor` returns a new builder; keep that one.
    let mut builder = GovernorConfigBuilder::default().key_extractor(SmartIpKeyExtractor);
    builder.period(period);
    builder.burst_size(config.write_burst);
    builder.error_handler(rate_limit_error);

    let governor = builder.finish().ok_or_else(|| {
        anyhow::anyhow!("Failed to build reservation write governor config (burst must be > 0)")
    })?;
    Ok(Arc::new(governor))
}

pub fn layer(governor: &Arc<WriteGovernorConfig>) -> GovernorLayer<SmartIpKeyExtractor, NoOpMiddleware> {
    GovernorLayer {
        config: governor.clone(),
    }
}

/// Background cleanup of per-IP limiter state. Exits within a second of
/// `shutdown` being set.
pub fn spawn_cleaner(governor: &Arc<WriteGovernorConfig>, shutdown: Arc<AtomicBool>) -> JoinHandle<()> {
    let limiter = governor.limiter().clone();
    std::thread::spawn(move || {
        let tick = Duration::from_secs(1);
        loop {
            for _ in 0..CLEANUP_INTERVAL_SECS {
                if shutdown.load(Ordering::SeqCst) {
                    tracing::info!("Rate limiter cleanup thread exiting");
                    return;
                }
                std::thread::sleep(tick);
            }
            tracing::debug!("reservation write limiter size: {}", limiter.len());
            limiter.retain_recent();
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::routes::reservations::write_router;
    use crate::routes::test_support::{json, state_with};
    use axum::Router;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    #[test]
    fn rate_is_requests_per_second() {
        assert_eq!(replenish_interval(5), Some(Duration::from_millis(200)));
        assert_eq!(replenish_interval(1), Some(Duration::from_secs(1)));
        assert_eq!(replenish_interval(0), None);
    }

    #[test]
    fn zero_rate_or_burst_is_rejected() {
        let zero_rate = RateLimitConfig {
            write_per_second: 0,
            write_burst: 20,
        };
        assert!(write_governor(&zero_rate).is_err());

        let zero_burst = RateLimitConfig {
            write_per_second: 5,
            write_burst: 0,
        };
        assert!(write_governor(&zero_burst).is_err());
    }

    async fn post_from(app: &Router, ip: &'static str) -> Response<Body> {
        let mut request = json("POST", "/api/reservations", serde_json::json!({}));
        request
            .headers_mut()
            .insert("x-forwarded-for", HeaderValue::from_static(ip));
        app.clone().oneshot(request).await.unwrap()
    }

    #[tokio::test]
    async fn writes_past_the_burst_get_429() {
        let governor = write_governor(&RateLimitConfig {
            write_per_second: 1,
            write_burst: 2,
        })
        .unwrap();
        let app = crate::app_router(
            state_with(Config::default()),
            write_router().layer(layer(&governor)),
        );

        // Within the burst the request reaches the handler (and fails validation).
        for _ in 0..2 {
            let resp = post_from(&app, "203.0.113.7").await;
            assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        }

        let limited = post_from(&app, "203.0.113.7").await;
        assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(limited.headers().contains_key(http::header::RETRY_AFTER));
        assert_eq!(limited.headers()[http::header::CONTENT_TYPE], "application/json");
        let bytes = limited.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["code"], "RATE_LIMITED");

        // Other clients keep their own quota.
        let other = post_from(&app, "198.51.100.1").await;
        assert_eq!(other.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn reads_are_not_limited() {
        let governor = write_governor(&RateLimitConfig {
            write_per_second: 1,
            write_burst: 1,
        })
        .unwrap();
        let app = crate::app_router(
            state_with(Config::default()),
            write_router().layer(layer(&governor)),
        );

        for _ in 0..5 {
            let resp = app
                .clone()
                .oneshot(crate::routes::test_support::get("/api/reservations"))
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::OK);
        }
    }
}
