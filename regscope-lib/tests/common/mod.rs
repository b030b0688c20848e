//! Shared fixtures: a scripted WHOIS server and IANA payloads.

#![allow(dead_code)]

use regscope_lib::{ClientConfig, IanaSources};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

/// A local WHOIS server answering from a fixed table.
pub struct WhoisServer {
    pub port: u16,
    queries: Arc<Mutex<Vec<String>>>,
}

impl WhoisServer {
    /// Queries received so far, lowercased, in arrival order.
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

/// Spawn a WHOIS server. Unknown queries get an empty response.
pub async fn spawn_whois_server(responses: &[(&str, &str)]) -> WhoisServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let table: HashMap<String, String> = responses
        .iter()
        .map(|(q, r)| (q.to_lowercase(), r.to_string()))
        .collect();
    let queries = Arc::new(Mutex::new(Vec::new()));

    let seen = Arc::clone(&queries);
    tokio::spawn(async move {
        loop {
            let Ok((socket, _)) = listener.accept().await else {
                break;
            };
            let table = table.clone();
            let seen = Arc::clone(&seen);
            tokio::spawn(async move {
                let (read, mut write) = socket.into_split();
                let mut line = String::new();
                if BufReader::new(read).read_line(&mut line).await.is_err() {
                    return;
                }
                let query = line.trim().to_lowercase();
                seen.lock().unwrap().push(query.clone());
                let body = table.get(&query).cloned().unwrap_or_default();
                let _ = write.write_all(body.as_bytes()).await;
                let _ = write.shutdown().await;
            });
        }
    });

    WhoisServer { port, queries }
}

pub fn client_config() -> ClientConfig {
    ClientConfig::default()
        .with_rdap_timeout(Duration::from_secs(5))
        .with_whois_timeout(Duration::from_secs(5))
        .with_iana_timeout(Duration::from_secs(5))
}

/// IANA sources pointing at a mock HTTP server and a local WHOIS port.
pub fn iana_sources(http_base: &str, whois_port: u16) -> IanaSources {
    IanaSources {
        bootstrap_url: format!("{}/rdap/dns.json", http_base),
        tld_list_url: format!("{}/TLD/tlds-alpha-by-domain.txt", http_base),
        root_db_base_url: format!("{}/domains/root/db", http_base),
        whois_host: "127.0.0.1".to_string(),
        whois_port,
    }
}

/// A bootstrap registry mapping each `(tlds, url)` service.
pub fn bootstrap_body(publication: &str, services: &[(&[&str], &str)]) -> String {
    let services: Vec<serde_json::Value> = services
        .iter()
        .map(|(tlds, url)| serde_json::json!([tlds, [url]]))
        .collect();
    serde_json::json!({
        "description": "RDAP bootstrap file for Domain Name System registrations",
        "publication": publication,
        "version": "1.0",
        "services": services,
    })
    .to_string()
}

/// A `whois.iana.org` answer naming `server` as the TLD's WHOIS server.
pub fn iana_whois_answer(tld: &str, server: &str) -> String {
    format!(
        "% IANA WHOIS server\n\
         \n\
         domain:       {}\n\
         \n\
         whois:        {}\n\
         \n\
         status:       ACTIVE\n\
         remarks:      Registration information: https://nic.{}/\n\
         \n\
         created:      1985-01-01\n\
         changed:      2023-12-07\n",
        tld.to_uppercase(),
        server,
        tld
    )
}
