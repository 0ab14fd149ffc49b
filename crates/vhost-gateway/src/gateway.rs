use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tracing::info;
use vhost_mux::{BindError, Demuxer, DEFAULT_PEEK_TIMEOUT};

use crate::error::Error;
use crate::error_loop;
use crate::host::{Host, VhostUri};
use crate::proxy::ProxyWrapper;
use crate::shutdown::ShutdownGroup;
use crate::signal::OnceSignal;

/// Options accepted by [`Gateway::listen`].
#[derive(Debug, Clone, Default)]
pub struct GatewayOptions {
    /// Header-peek timeout. `None` or a non-positive duration falls back to
    /// [`vhost_mux::DEFAULT_PEEK_TIMEOUT`].
    pub timeout: Option<Duration>,
    /// Hosts to register before `listen` returns. If any fails, the whole
    /// call fails and any partial state is torn down.
    pub hosts: Vec<Host>,
}

struct Inner {
    demuxer: Demuxer,
    accept_task: JoinHandle<()>,
    proxies: AsyncMutex<HashMap<String, ProxyWrapper>>,
    group: ShutdownGroup,
    done: OnceSignal,
    local_addr: SocketAddr,
}

/// The vhost registry: the public facade over the demuxer and the
/// name→proxy-wrapper mapping, plus the lifecycle operations that keep both
/// in sync.
#[derive(Clone)]
pub struct Gateway(Arc<Inner>);

impl Gateway {
    /// Binds `addr`, starts the demuxer and the error-handling loop, and
    /// pre-registers `options.hosts`.
    pub async fn listen(
        addr: impl tokio::net::ToSocketAddrs,
        options: GatewayOptions,
    ) -> Result<Self, Error> {
        let timeout = options
            .timeout
            .filter(|d| !d.is_zero())
            .unwrap_or(DEFAULT_PEEK_TIMEOUT);

        let (demuxer, local_addr, accept_task) = Demuxer::listen(addr, timeout).await?;

        let gateway = Gateway(Arc::new(Inner {
            demuxer,
            accept_task,
            proxies: AsyncMutex::new(HashMap::new()),
            group: ShutdownGroup::new(),
            done: OnceSignal::new(),
            local_addr,
        }));

        tokio::spawn(error_loop::run(gateway.clone()));

        for host in options.hosts {
            if let Err(e) = gateway.add(host.name, host.uri).await {
                let _ = gateway.close().await;
                return Err(e);
            }
        }

        info!(addr = %local_addr, "gateway listening");
        Ok(gateway)
    }

    /// The actual bound address of the public listener.
    pub fn local_addr(&self) -> SocketAddr {
        self.0.local_addr
    }

    pub(crate) fn demuxer(&self) -> &Demuxer {
        &self.0.demuxer
    }

    pub(crate) fn done_signal(&self) -> &OnceSignal {
        &self.0.done
    }

    /// Registers `name` → `uri`. Fails with [`Error::AlreadyExists`] if
    /// `name` is already bound; state is unchanged on any failure.
    pub async fn add(&self, name: impl Into<String>, uri: VhostUri) -> Result<(), Error> {
        let mut proxies = self.0.proxies.lock().await;
        self.add_locked(&mut proxies, name.into(), uri).await
    }

    async fn add_locked(
        &self,
        proxies: &mut HashMap<String, ProxyWrapper>,
        name: String,
        uri: VhostUri,
    ) -> Result<(), Error> {
        if self.0.done.is_fired() {
            return Err(Error::AlreadyClosed);
        }
        if proxies.contains_key(&name) {
            return Err(Error::AlreadyExists);
        }
        let listener = self.0.demuxer.bind(&name).await.map_err(|e| match e {
            BindError::AlreadyBound(_) => Error::AlreadyExists,
            BindError::Closed => Error::AlreadyClosed,
        })?;
        let host = Host::new(name.clone(), uri);
        info!(vhost = %host.name, upstream = %host.uri, "registering vhost");
        let wrapper = ProxyWrapper::spawn(host, listener, self.0.group.clone());
        proxies.insert(name, wrapper);
        Ok(())
    }

    /// Removes `name`. Fails with [`Error::NotFound`] if it isn't bound.
    pub async fn remove(&self, name: &str) -> Result<(), Error> {
        let mut proxies = self.0.proxies.lock().await;
        match proxies.remove(name) {
            Some(wrapper) => {
                wrapper.close().await;
                Ok(())
            }
            None => Err(Error::NotFound),
        }
    }

    /// Removes the first binding whose upstream stringifies to `uri`.
    pub async fn remove_by_uri(&self, uri: &VhostUri) -> Result<(), Error> {
        let mut proxies = self.0.proxies.lock().await;
        let name = proxies
            .values()
            .find(|w| &w.host().uri == uri)
            .map(|w| w.host().name.clone());
        match name {
            Some(name) => {
                let wrapper = proxies.remove(&name).expect("just located by name");
                wrapper.close().await;
                Ok(())
            }
            None => Err(Error::NotFound),
        }
    }

    /// Atomically becomes the single binding for `name`. Tolerates `name`
    /// being previously absent (never fails solely because of that).
    pub async fn replace(&self, name: &str, uri: VhostUri) -> Result<(), Error> {
        let mut proxies = self.0.proxies.lock().await;
        if let Some(wrapper) = proxies.remove(name) {
            wrapper.close().await;
        }
        self.add_locked(&mut proxies, name.to_string(), uri).await
    }

    /// Snapshot of current bindings, order unspecified.
    pub async fn list(&self) -> Vec<Host> {
        let proxies = self.0.proxies.lock().await;
        proxies.values().map(|w| w.host().clone()).collect()
    }

    /// Whether `name` is currently bound.
    pub async fn exists(&self, name: &str) -> bool {
        self.0.proxies.lock().await.contains_key(name)
    }

    /// Removes every binding, stops the public listener and demuxer, and
    /// signals [`Gateway::wait`]. Calling this a second time returns
    /// [`Error::AlreadyClosed`] rather than re-running teardown.
    pub async fn close(&self) -> Result<(), Error> {
        if self.0.done.is_fired() {
            return Err(Error::AlreadyClosed);
        }

        let mut proxies = self.0.proxies.lock().await;
        let wrappers: Vec<ProxyWrapper> = proxies.drain().map(|(_, w)| w).collect();
        futures_util::future::join_all(wrappers.into_iter().map(|w| w.close())).await;
        self.0.group.wait_until_zero().await;

        self.0.demuxer.close().await;
        self.0.accept_task.abort();
        self.0.done.fire();
        info!("gateway closed");
        Ok(())
    }

    /// Blocks until [`Gateway::close`] has run.
    pub async fn wait(&self) {
        self.0.done.wait().await;
    }
}
