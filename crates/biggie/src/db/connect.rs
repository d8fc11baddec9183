use biggie_core::{Driver, Error, Result};

use std::sync::Arc;
use url::Url;

/// Open a driver from a connection URL.
///
/// `memory:` selects the in-process store, `redis://host:port/db` a Redis
/// server. Each needs its cargo feature.
pub async fn connect(url: &str) -> Result<Arc<dyn Driver>> {
    let url = Url::parse(url)?;

    match url.scheme() {
        "memory" => connect_memory(&url),
        "redis" => connect_redis(&url).await,
        scheme => Err(Error::invalid_argument(format!(
            "unsupported store; scheme={scheme}; url={url}"
        ))),
    }
}

#[cfg(feature = "memory")]
fn connect_memory(_url: &Url) -> Result<Arc<dyn Driver>> {
    Ok(Arc::new(biggie_driver_memory::Memory::new()))
}

#[cfg(not(feature = "memory"))]
fn connect_memory(_url: &Url) -> Result<Arc<dyn Driver>> {
    Err(Error::invalid_argument("`memory` feature not enabled"))
}

#[cfg(feature = "redis")]
async fn connect_redis(url: &Url) -> Result<Arc<dyn Driver>> {
    let driver = biggie_driver_redis::Redis::connect(url.as_str()).await?;
    Ok(Arc::new(driver))
}

#[cfg(not(feature = "redis"))]
async fn connect_redis(_url: &Url) -> Result<Arc<dyn Driver>> {
    Err(Error::invalid_argument("`redis` feature not enabled"))
}
