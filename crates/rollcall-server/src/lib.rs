//! Server wiring for Rollcall: configuration, service assembly and the
//! top-level router.

use std::{fmt, path::PathBuf, sync::Arc};

use axum::{Router, routing::get};
use rollcall_core::calendar::ServiceCalendar;
use rollcall_service::{Backend, CheckInService, api_router};
use rollcall_token::TokenCodec;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `ROLLCALL_*` environment variables.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                   String,
  #[serde(default = "default_port")]
  pub port:                   u16,
  pub store_path:             PathBuf,
  /// Signs newly issued tokens.
  pub token_secret:           String,
  /// Retired secrets whose tokens must keep verifying.
  #[serde(default)]
  pub previous_token_secrets: Vec<String>,
  /// Offset of the canonical service time zone, e.g. `+02:00`.
  #[serde(default = "default_utc_offset")]
  pub utc_offset:             String,
}

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 8080 }

fn default_utc_offset() -> String { "Z".to_string() }

impl fmt::Debug for ServerConfig {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ServerConfig")
      .field("host", &self.host)
      .field("port", &self.port)
      .field("store_path", &self.store_path)
      .field("token_secret", &"<redacted>")
      .field("previous_token_secrets", &self.previous_token_secrets.len())
      .field("utc_offset", &self.utc_offset)
      .finish()
  }
}

impl ServerConfig {
  /// Codec signing with `token_secret` and still accepting the previous ones.
  pub fn codec(&self) -> rollcall_token::Result<TokenCodec> {
    self
      .previous_token_secrets
      .iter()
      .try_fold(TokenCodec::new(&self.token_secret)?, |codec, old| {
        codec.with_previous(old)
      })
  }

  pub fn calendar(&self) -> rollcall_core::Result<ServiceCalendar> {
    ServiceCalendar::parse(&self.utc_offset)
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// The API under `/api`, a liveness probe, and request tracing.
pub fn router<S: Backend>(service: Arc<CheckInService<S>>) -> Router {
  Router::new()
    .route("/healthz", get(|| async { "ok" }))
    .nest("/api", api_router(service))
    .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
  use axum::{
    body::Body,
    http::{Request, StatusCode},
  };
  use config::{Config, File, FileFormat};
  use rollcall_store_sqlite::SqliteStore;
  use tower::ServiceExt as _;

  use super::*;

  fn parse(toml: &str) -> ServerConfig {
    Config::builder()
      .add_source(File::from_str(toml, FileFormat::Toml))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap()
  }

  #[test]
  fn defaults_fill_in_optional_fields() {
    let cfg = parse(
      r#"
        store_path   = "~/rollcall.db"
        token_secret = "0123456789abcdef0123"
      "#,
    );
    assert_eq!(cfg.host, "127.0.0.1");
    assert_eq!(cfg.port, 8080);
    assert!(cfg.previous_token_secrets.is_empty());
    assert_eq!(cfg.calendar().unwrap(), ServiceCalendar::utc());
    assert!(!format!("{cfg:?}").contains("0123456789abcdef0123"));
  }

  #[test]
  fn rotated_secrets_still_verify() {
    let old = parse(
      r#"
        store_path   = "rollcall.db"
        token_secret = "old-secret-0123456789"
      "#,
    );
    let new = parse(
      r#"
        store_path             = "rollcall.db"
        token_secret           = "new-secret-0123456789"
        previous_token_secrets = ["old-secret-0123456789"]
        utc_offset             = "+02:00"
      "#,
    );

    let fields = rollcall_token::DescriptiveFields {
      full_name:  "Ada".into(),
      email:      None,
      university: None,
    };
    let student = rollcall_core::id::StudentKey::new();
    let issued = old
      .codec()
      .unwrap()
      .encode(student, &fields, chrono::Utc::now())
      .unwrap();

    let claims = new.codec().unwrap().verify(&issued).unwrap();
    assert_eq!(claims.sub, student);
    assert_eq!(new.calendar().unwrap().offset().local_minus_utc(), 2 * 3600);
  }

  #[test]
  fn short_secrets_are_refused() {
    let cfg = parse(
      r#"
        store_path   = "rollcall.db"
        token_secret = "short"
      "#,
    );
    assert!(cfg.codec().is_err());
  }

  #[tokio::test]
  async fn api_is_nested_and_health_is_open() {
    let cfg = parse(
      r#"
        store_path   = ":memory:"
        token_secret = "0123456789abcdef0123"
      "#,
    );
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    let service = Arc::new(CheckInService::new(
      store,
      cfg.codec().unwrap(),
      cfg.calendar().unwrap(),
    ));

    let health = router(Arc::clone(&service))
      .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
      .await
      .unwrap();
    assert_eq!(health.status(), StatusCode::OK);

    let shift = router(service)
      .oneshot(
        Request::post("/api/shifts")
          .header("x-supervisor-id", "alice")
          .body(Body::empty())
          .unwrap(),
      )
      .await
      .unwrap();
    assert_eq!(shift.status(), StatusCode::CREATED);
  }
}
