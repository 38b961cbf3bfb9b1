//! Optional ConnectInfo extractor so handlers also run under `oneshot` in tests.

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use std::convert::Infallible;
use std::net::SocketAddr;

/// Peer address, or `None` when the router was not served with connect info.
#[derive(Debug, Clone, Copy)]
pub struct MaybeConnectInfo(pub Option<SocketAddr>);

impl<S> FromRequestParts<S> for MaybeConnectInfo
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeConnectInfo(
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|info| info.0),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[tokio::test]
    async fn test_missing_connect_info_yields_none() {
        let (mut parts, _) = Request::new(()).into_parts();
        let MaybeConnectInfo(addr) = MaybeConnectInfo::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert!(addr.is_none());
    }

    #[tokio::test]
    async fn test_connect_info_present() {
        let peer: SocketAddr = "10.0.0.7:4321".parse().unwrap();
        let (mut parts, _) = Request::new(()).into_parts();
        parts.extensions.insert(ConnectInfo(peer));
        let MaybeConnectInfo(addr) = MaybeConnectInfo::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(addr, Some(peer));
    }
}
