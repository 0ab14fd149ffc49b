use std::convert::Infallible;
use std::str::FromStr;

use bytes::Bytes;
use http::header::{CONNECTION, HOST, UPGRADE};
use http::uri::PathAndQuery;
use http::{HeaderMap, HeaderValue, Request, Response, StatusCode, Uri};
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Empty, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioIo;
use tokio::io::{copy_bidirectional, AsyncWriteExt};
use tokio::sync::oneshot;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{info, warn};
use vhost_mux::{ListenerClosed, VirtualListener};

use crate::host::Host;
use crate::shutdown::ShutdownGroup;

type BoxError = Box<dyn std::error::Error + Send + Sync>;
type ProxyBody = BoxBody<Bytes, BoxError>;
type ProxyClient = Client<HttpConnector, ProxyBody>;

const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailers",
    "transfer-encoding",
    "upgrade",
];

fn empty_body() -> ProxyBody {
    Empty::<Bytes>::new()
        .map_err(|never: Infallible| match never {})
        .boxed()
}

fn full_body(data: impl Into<Bytes>) -> ProxyBody {
    Full::new(data.into())
        .map_err(|never: Infallible| match never {})
        .boxed()
}

fn incoming_body(body: Incoming) -> ProxyBody {
    body.map_err(|e| -> BoxError { Box::new(e) }).boxed()
}

fn text_response(status: StatusCode, msg: &'static str) -> Response<ProxyBody> {
    Response::builder()
        .status(status)
        .header("content-type", "text/plain; charset=utf-8")
        .body(full_body(msg))
        .expect("static response is well-formed")
}

fn strip_hop_by_hop_headers(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP_HEADERS {
        headers.remove(*name);
    }
    if let Some(listed) = headers
        .get(CONNECTION)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
    {
        for token in listed.split(',') {
            let name = token.trim().to_ascii_lowercase();
            if !name.is_empty() {
                headers.remove(&name);
            }
        }
    }
}

fn build_upstream_uri(base: &Uri, orig: &Uri) -> Result<Uri, Response<ProxyBody>> {
    let path_and_query = orig
        .path_and_query()
        .cloned()
        .unwrap_or_else(|| PathAndQuery::from_static("/"));
    Uri::builder()
        .scheme(base.scheme().cloned().unwrap_or(http::uri::Scheme::HTTP))
        .authority(base.authority().cloned().ok_or_else(|| {
            text_response(StatusCode::BAD_GATEWAY, "upstream uri is missing a host")
        })?)
        .path_and_query(path_and_query)
        .build()
        .map_err(|_| text_response(StatusCode::BAD_GATEWAY, "invalid upstream uri"))
}

fn is_upgrade_request(headers: &HeaderMap) -> bool {
    let has_connection_upgrade = headers
        .get(CONNECTION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_ascii_lowercase().contains("upgrade"))
        .unwrap_or(false);
    has_connection_upgrade && headers.contains_key(UPGRADE)
}

async fn handle(
    client: ProxyClient,
    upstream: Uri,
    req: Request<Incoming>,
) -> Result<Response<ProxyBody>, Infallible> {
    let result = if is_upgrade_request(req.headers()) {
        handle_upgrade(client, upstream, req).await
    } else {
        handle_http(client, upstream, req).await
    };
    Ok(result.unwrap_or_else(|resp| resp))
}

async fn handle_http(
    client: ProxyClient,
    upstream: Uri,
    req: Request<Incoming>,
) -> Result<Response<ProxyBody>, Response<ProxyBody>> {
    let (mut parts, incoming) = req.into_parts();
    parts.uri = build_upstream_uri(&upstream, &parts.uri)?;
    strip_hop_by_hop_headers(&mut parts.headers);

    let new_req = Request::from_parts(parts, incoming_body(incoming));
    let upstream_resp = client
        .request(new_req)
        .await
        .map_err(|e| {
            warn!(error = %e, "upstream request failed");
            text_response(StatusCode::BAD_GATEWAY, "upstream request failed")
        })?;

    let (mut parts, body) = upstream_resp.into_parts();
    strip_hop_by_hop_headers(&mut parts.headers);
    Ok(Response::from_parts(parts, incoming_body(body)))
}

async fn handle_upgrade(
    client: ProxyClient,
    upstream: Uri,
    req: Request<Incoming>,
) -> Result<Response<ProxyBody>, Response<ProxyBody>> {
    let upstream_uri = build_upstream_uri(&upstream, req.uri())?;
    let (parts, incoming) = req.into_parts();

    let mut upstream_req_builder = Request::builder()
        .method(parts.method.clone())
        .uri(upstream_uri)
        .version(parts.version);
    for (name, value) in parts.headers.iter() {
        upstream_req_builder = upstream_req_builder.header(name, value);
    }
    let upstream_req = upstream_req_builder
        .body(incoming_body(incoming))
        .map_err(|_| text_response(StatusCode::INTERNAL_SERVER_ERROR, "failed to build upstream request"))?;

    let client_req = Request::from_parts(parts, ());

    let upstream_resp = client
        .request(upstream_req)
        .await
        .map_err(|_| text_response(StatusCode::BAD_GATEWAY, "upstream upgrade request failed"))?;

    if upstream_resp.status() != StatusCode::SWITCHING_PROTOCOLS {
        let (parts, body) = upstream_resp.into_parts();
        return Ok(Response::from_parts(parts, incoming_body(body)));
    }

    let mut client_resp_builder = Response::builder().status(StatusCode::SWITCHING_PROTOCOLS);
    {
        let headers = client_resp_builder.headers_mut().expect("builder in progress");
        for (name, value) in upstream_resp.headers() {
            headers.insert(name, value.clone());
        }
        headers.insert(CONNECTION, HeaderValue::from_static("upgrade"));
    }
    let client_resp = client_resp_builder
        .body(empty_body())
        .map_err(|_| text_response(StatusCode::INTERNAL_SERVER_ERROR, "failed to build upgrade response"))?;

    tokio::spawn(async move {
        match futures_util::future::try_join(
            hyper::upgrade::on(client_req),
            hyper::upgrade::on(upstream_resp),
        )
        .await
        {
            Ok((client_upgraded, upstream_upgraded)) => {
                let mut client_io = TokioIo::new(client_upgraded);
                let mut upstream_io = TokioIo::new(upstream_upgraded);
                if let Err(e) = copy_bidirectional(&mut client_io, &mut upstream_io).await {
                    warn!(error = %e, "upgrade tunnel error");
                }
                let _ = client_io.shutdown().await;
                let _ = upstream_io.shutdown().await;
            }
            Err(e) => warn!(error = %e, "upgrade handshake error"),
        }
    });

    Ok(client_resp)
}

/// Per-vhost bundle of {virtual listener, serving task, reverse-proxy
/// handler, shared shutdown bookkeeping}.
pub(crate) struct ProxyWrapper {
    host: Host,
    close_tx: Option<oneshot::Sender<()>>,
    worker: JoinHandle<()>,
}

impl ProxyWrapper {
    pub(crate) fn spawn(host: Host, listener: VirtualListener, group: ShutdownGroup) -> Self {
        group.enter();
        let (close_tx, close_rx) = oneshot::channel();
        let upstream = host.uri.as_uri().clone();
        let worker = tokio::spawn(serve_vhost(host.clone(), upstream, listener, close_rx, group));
        Self {
            host,
            close_tx: Some(close_tx),
            worker,
        }
    }

    pub(crate) fn host(&self) -> &Host {
        &self.host
    }

    /// Closes the virtual listener, waits for in-flight requests to drain,
    /// and decrements the shared shutdown counter. Always returns
    /// successfully from the registry's point of view.
    pub(crate) async fn close(mut self) {
        if let Some(tx) = self.close_tx.take() {
            let _ = tx.send(());
        }
        if let Err(e) = self.worker.await {
            warn!(vhost = %self.host.name, error = %e, "serve worker panicked");
        }
    }
}

async fn serve_vhost(
    host: Host,
    upstream: Uri,
    mut listener: VirtualListener,
    mut close_rx: oneshot::Receiver<()>,
    group: ShutdownGroup,
) {
    let client: ProxyClient = Client::builder(hyper_util::rt::TokioExecutor::new()).build(HttpConnector::new());
    let mut requests: JoinSet<()> = JoinSet::new();

    loop {
        tokio::select! {
            biased;
            _ = &mut close_rx => {
                listener.close().await;
                break;
            }
            accepted = listener.accept() => {
                match accepted {
                    Ok(conn) => {
                        let client = client.clone();
                        let upstream = upstream.clone();
                        let vhost_name = host.name.clone();
                        requests.spawn(async move {
                            let io = TokioIo::new(conn);
                            let service = service_fn(move |req| handle(client.clone(), upstream.clone(), req));
                            if let Err(e) = http1::Builder::new()
                                .serve_connection(io, service)
                                .with_upgrades()
                                .await
                            {
                                warn!(vhost = %vhost_name, error = %e, "connection error");
                            }
                        });
                    }
                    Err(ListenerClosed(_)) => break,
                }
            }
        }
    }

    while requests.join_next().await.is_some() {}
    group.leave();
    info!(vhost = %host.name, "serve worker stopped");
}
