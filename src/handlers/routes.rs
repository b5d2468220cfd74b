// API route handlers for the gateway
//
// Each handler validates its query parameters, makes exactly one upstream
// call and reshapes the result. Adapter failures come back as values and are
// mapped to a status code by `GatewayError`.

use std::future::Future;
use std::time::Instant;

use actix_web::error::QueryPayloadError;
use actix_web::{get, web, HttpRequest, HttpResponse, ResponseError};
use log::{debug, error, warn};

use crate::error::GatewayError;
use crate::handlers::params::QueryParams;
use crate::metrics::Metrics;
use crate::models::{
    HealthResponse, ThumbnailResponse, TitleResponse, TranscriptInfo, TranscriptListResponse,
    TranscriptResponse,
};
use crate::upstream::{UpstreamError, Upstreams};

/// Language list used when a request names none
pub const DEFAULT_LANGUAGES: [&str; 1] = ["en"];

const METADATA_PROVIDER: &str = "youtube_data";
const TRANSCRIPT_PROVIDER: &str = "youtube_transcripts";

type Query = web::Query<Vec<(String, String)>>;

/// Await one adapter call and count its outcome
async fn observe_upstream<T, F>(metrics: &Metrics, provider: &str, call: F) -> Result<T, UpstreamError>
where
    F: Future<Output = Result<T, UpstreamError>>,
{
    let result = call.await;
    let outcome = match &result {
        Ok(_) => "ok",
        Err(e) => e.kind(),
    };
    metrics.record_upstream_call(provider, outcome).await;
    result
}

/// Log and record the outcome of one request
async fn finish(
    metrics: &Metrics,
    endpoint: &str,
    start_time: Instant,
    result: Result<HttpResponse, GatewayError>,
) -> Result<HttpResponse, GatewayError> {
    let status = match &result {
        Ok(response) => response.status(),
        Err(e) => {
            let status = e.status_code();
            if status.is_server_error() {
                error!("{} failed: {}", endpoint, e);
            } else {
                warn!("{} rejected: {}", endpoint, e);
            }
            status
        }
    };

    let duration = start_time.elapsed().as_secs_f64();
    metrics
        .record_http_request(endpoint, "GET", status.as_str(), duration)
        .await;
    result
}

/// Liveness endpoint, served without an API key
#[get("/health")]
pub async fn health(metrics: web::Data<Metrics>) -> HttpResponse {
    let start_time = Instant::now();
    let response = HttpResponse::Ok().json(HealthResponse::default());
    finish(&metrics, "/health", start_time, Ok(response))
        .await
        .unwrap_or_else(|e| e.error_response())
}

/// Title of a video
#[get("/get_title")]
pub async fn get_title(
    query: Query,
    upstreams: web::Data<Upstreams>,
    metrics: web::Data<Metrics>,
) -> Result<HttpResponse, GatewayError> {
    let start_time = Instant::now();
    let result = async {
        let params = QueryParams::from(query.into_inner());
        let video_id = params.required("video_id")?;

        let snippet = observe_upstream(
            &metrics,
            METADATA_PROVIDER,
            upstreams.metadata.video_snippet(&video_id),
        )
        .await?;

        Ok::<_, GatewayError>(HttpResponse::Ok().json(TitleResponse {
            title: snippet.title,
        }))
    }
    .await;

    finish(&metrics, "/get_title", start_time, result).await
}

/// Thumbnail set of a video, passed through from the provider
#[get("/get_thumbnail")]
pub async fn get_thumbnail(
    query: Query,
    upstreams: web::Data<Upstreams>,
    metrics: web::Data<Metrics>,
) -> Result<HttpResponse, GatewayError> {
    let start_time = Instant::now();
    let result = async {
        let params = QueryParams::from(query.into_inner());
        let video_id = params.required("video_id")?;

        let snippet = observe_upstream(
            &metrics,
            METADATA_PROVIDER,
            upstreams.metadata.video_snippet(&video_id),
        )
        .await?;

        Ok::<_, GatewayError>(HttpResponse::Ok().json(ThumbnailResponse {
            thumbnails: snippet.thumbnails,
        }))
    }
    .await;

    finish(&metrics, "/get_thumbnail", start_time, result).await
}

/// Transcript in the first available language of `languages`
///
/// Query: `video_id` (required), `languages` (repeatable, default `en`),
/// `preserve_formatting` (default false).
#[get("/get_transcript")]
pub async fn get_transcript(
    query: Query,
    upstreams: web::Data<Upstreams>,
    metrics: web::Data<Metrics>,
) -> Result<HttpResponse, GatewayError> {
    let start_time = Instant::now();
    let result = async {
        let params = QueryParams::from(query.into_inner());
        let video_id = params.required("video_id")?;
        let languages = params.list_or("languages", &DEFAULT_LANGUAGES);
        let preserve_formatting = params.flag_or("preserve_formatting", false)?;

        debug!(
            "Fetching transcript for {} in {:?} (preserve_formatting={})",
            video_id, languages, preserve_formatting
        );

        let fetched = observe_upstream(
            &metrics,
            TRANSCRIPT_PROVIDER,
            upstreams
                .transcripts
                .fetch(&video_id, &languages, preserve_formatting),
        )
        .await?;

        Ok::<_, GatewayError>(HttpResponse::Ok().json(TranscriptResponse::from(fetched)))
    }
    .await;

    finish(&metrics, "/get_transcript", start_time, result).await
}

/// Every transcript available for a video
#[get("/list_transcripts")]
pub async fn list_transcripts(
    query: Query,
    upstreams: web::Data<Upstreams>,
    metrics: web::Data<Metrics>,
) -> Result<HttpResponse, GatewayError> {
    let start_time = Instant::now();
    let result = async {
        let params = QueryParams::from(query.into_inner());
        let video_id = params.required("video_id")?;

        let list = observe_upstream(
            &metrics,
            TRANSCRIPT_PROVIDER,
            upstreams.transcripts.list_transcripts(&video_id),
        )
        .await?;

        let transcripts = list.iter().map(TranscriptInfo::from).collect();
        Ok::<_, GatewayError>(HttpResponse::Ok().json(TranscriptListResponse { transcripts }))
    }
    .await;

    finish(&metrics, "/list_transcripts", start_time, result).await
}

/// Machine translation of the first available source transcript
///
/// Query: `video_id` and `target_language` (required), `source_languages`
/// (repeatable, default `en`).
#[get("/translate_transcript")]
pub async fn translate_transcript(
    query: Query,
    upstreams: web::Data<Upstreams>,
    metrics: web::Data<Metrics>,
) -> Result<HttpResponse, GatewayError> {
    let start_time = Instant::now();
    let result = async {
        let params = QueryParams::from(query.into_inner());
        let video_id = params.required("video_id")?;
        let target_language = params.required("target_language")?;
        let source_languages = params.list_or("source_languages", &DEFAULT_LANGUAGES);

        let fetched = observe_upstream(
            &metrics,
            TRANSCRIPT_PROVIDER,
            upstreams
                .transcripts
                .translate(&video_id, &source_languages, &target_language),
        )
        .await?;

        Ok::<_, GatewayError>(HttpResponse::Ok().json(TranscriptResponse::from(fetched)))
    }
    .await;

    finish(&metrics, "/translate_transcript", start_time, result).await
}

/// Metrics in the exporter's text format
#[get("/metrics")]
pub async fn metrics_endpoint(metrics: web::Data<Metrics>) -> Result<HttpResponse, GatewayError> {
    let data = metrics.export().await?;
    Ok(HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4; charset=utf-8")
        .body(data))
}

fn query_error_handler(err: QueryPayloadError, req: &HttpRequest) -> actix_web::Error {
    warn!("Malformed query string on {}: {}", req.path(), err);
    GatewayError::invalid_request(format!("Invalid query string: {}", err)).into()
}

/// Register every route and the shared query extractor settings
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::QueryConfig::default().error_handler(query_error_handler))
        .service(health)
        .service(get_title)
        .service(get_thumbnail)
        .service(get_transcript)
        .service(list_transcripts)
        .service(translate_transcript)
        .service(metrics_endpoint);
}
