//! Rotating pool of free HTTP proxies for scraping. State lives on the pool
//! object, including the rotation index; callers create one, `refresh` it,
//! and hand out proxies via `next`.

use anyhow::Context as _;

const PROXY_LIST_URL: &str = "https://api.proxyscrape.com/v2/?request=displayproxies&protocol=http&timeout=10000&country=all&ssl=all&anonymity=all";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proxy {
    pub ip: String,
    pub port: u16,
}

impl Proxy {
    pub fn url(&self) -> String {
        format!("http://{}:{}", self.ip, self.port)
    }
}

#[derive(Debug, Default)]
pub struct ProxyPool {
    proxies: Vec<Proxy>,
    next_index: usize,
}

impl ProxyPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }

    /// Replaces the pool with a freshly fetched list and resets rotation.
    /// Falls back to a small built-in list when the fetch fails, so a pool
    /// that has been refreshed is never empty.
    pub async fn refresh(&mut self, client: &reqwest::Client) -> anyhow::Result<()> {
        let proxies = match fetch_proxy_list(client).await {
            Ok(proxies) if !proxies.is_empty() => proxies,
            Ok(_) => {
                tracing::warn!("proxy list endpoint returned no proxies; using fallback list");
                fallback_proxies()
            }
            Err(err) => {
                tracing::warn!(?err, "failed to fetch proxy list; using fallback list");
                fallback_proxies()
            }
        };

        tracing::info!(count = proxies.len(), "loaded proxy list");
        self.proxies = proxies;
        self.next_index = 0;
        Ok(())
    }

    /// Round-robin pick; `None` until the pool has been refreshed.
    pub fn next(&mut self) -> Option<&Proxy> {
        if self.proxies.is_empty() {
            return None;
        }
        let index = self.next_index;
        self.next_index = (self.next_index + 1) % self.proxies.len();
        Some(&self.proxies[index])
    }
}

async fn fetch_proxy_list(client: &reqwest::Client) -> anyhow::Result<Vec<Proxy>> {
    let response = client
        .get(PROXY_LIST_URL)
        .send()
        .await
        .context("request proxy list")?;
    let status = response.status();
    if !status.is_success() {
        anyhow::bail!("proxy list request failed ({status})");
    }
    let body = response.text().await.context("read proxy list body")?;
    Ok(parse_proxy_list(&body))
}

fn parse_proxy_list(body: &str) -> Vec<Proxy> {
    body.lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() {
                return None;
            }
            let (ip, port) = line.split_once(':')?;
            let port: u16 = port.trim().parse().ok()?;
            Some(Proxy {
                ip: ip.trim().to_owned(),
                port,
            })
        })
        .collect()
}

fn fallback_proxies() -> Vec<Proxy> {
    [
        ("103.149.130.38", 80),
        ("103.152.112.234", 80),
        ("103.152.112.162", 80),
    ]
    .into_iter()
    .map(|(ip, port)| Proxy {
        ip: ip.to_owned(),
        port,
    })
    .collect()
}
