use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use hls_bridge::{BridgeRequest, PlaylistBridge};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::error::Result;

const MPEGURL: &str = "application/vnd.apple.mpegurl";

pub fn router(bridge: Arc<PlaylistBridge>) -> Router {
    Router::new()
        .route("/playlist/{name}", get(playlist))
        .with_state(bridge)
}

/// Serves the bridge until Ctrl-C.
pub async fn run(bridge: Arc<PlaylistBridge>, addr: SocketAddr) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("Playlist bridge listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(bridge))
        .with_graceful_shutdown(shutdown_signal(tokio::signal::ctrl_c()))
        .await?;

    Ok(())
}

/// Resolves once `signal` fires. If the handler cannot be installed the
/// server keeps running until the process is killed.
async fn shutdown_signal<F>(signal: F)
where
    F: Future<Output = io::Result<()>>,
{
    match signal.await {
        Ok(()) => info!("Shutting down playlist bridge"),
        Err(e) => {
            warn!("Failed to install Ctrl-C handler, serving until killed: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

async fn playlist(
    State(bridge): State<Arc<PlaylistBridge>>,
    Path(name): Path<String>,
) -> Response {
    let Some(request) = BridgeRequest::from_name(&name) else {
        debug!("Not a bridge playlist: {}", name);
        return StatusCode::NOT_FOUND.into_response();
    };

    match bridge.serve(request).await {
        Ok(body) => ([(header::CONTENT_TYPE, MPEGURL)], body).into_response(),
        Err(e) => (StatusCode::BAD_GATEWAY, e.to_string()).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bilivod_resolver::media::StreamFormat;
    use bilivod_resolver::{ByteRange, PlayableMedia, PlayableSource, StreamRep};
    use hls_bridge::{BridgeConfig, HttpRangeFetcher};
    use std::time::Duration;

    fn rep(url: &str, codecs: &str) -> StreamRep {
        StreamRep {
            id: 80,
            bandwidth: 1_000_000,
            codecs: codecs.to_string(),
            mime_type: "video/mp4".to_string(),
            width: None,
            height: None,
            frame_rate: None,
            url: url.to_string(),
            mirrors: vec![],
            initialization: ByteRange::new(0, 999).unwrap(),
            index_range: ByteRange::new(1000, 1999).unwrap(),
        }
    }

    async fn spawn_server() -> SocketAddr {
        let source = PlayableSource {
            media: PlayableMedia::SegmentedPair {
                video: rep("http://127.0.0.1:9/v.m4s", "avc1.640032"),
                audio: rep("http://127.0.0.1:9/a.m4s", "mp4a.40.2"),
            },
            quality: 80,
            format: "flv".to_string(),
            stream_format: StreamFormat::Dash,
            tier_index: 0,
            duration_ms: None,
        };

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let config = BridgeConfig::default().with_base_uri(format!("http://{addr}/playlist"));
        let fetcher = HttpRangeFetcher::new(reqwest::Client::new(), &config).unwrap();
        let bridge = PlaylistBridge::new(&source, Arc::new(fetcher), config).unwrap();

        tokio::spawn(async move {
            axum::serve(listener, router(Arc::new(bridge))).await.unwrap();
        });
        addr
    }

    #[tokio::test]
    async fn test_shutdown_waits_when_signal_handler_fails() {
        let failed = shutdown_signal(async { Err(io::Error::other("no signal driver")) });
        assert!(
            tokio::time::timeout(Duration::from_millis(50), failed)
                .await
                .is_err()
        );

        let fired = shutdown_signal(async { Ok(()) });
        assert!(
            tokio::time::timeout(Duration::from_millis(50), fired)
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_serves_master_playlist() {
        let addr = spawn_server().await;
        let response = reqwest::get(format!("http://{addr}/playlist/master.m3u8"))
            .await
            .unwrap();

        assert_eq!(response.status(), reqwest::StatusCode::OK);
        assert_eq!(
            response.headers()[reqwest::header::CONTENT_TYPE],
            MPEGURL
        );
        let body = response.text().await.unwrap();
        assert!(body.contains(&format!("URI=\"http://{addr}/playlist/audio.m3u8\"")));
        assert!(body.trim_end().ends_with(&format!("http://{addr}/playlist/video.m3u8")));
    }

    #[tokio::test]
    async fn test_unknown_and_failing_playlists() {
        let addr = spawn_server().await;

        let response = reqwest::get(format!("http://{addr}/playlist/other.m3u8"))
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);

        // nothing listens on port 9, so the index fetch fails
        let response = reqwest::get(format!("http://{addr}/playlist/video.m3u8"))
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::BAD_GATEWAY);
    }
}
