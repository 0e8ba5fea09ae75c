pub mod geocoder;
pub mod tile_retriever;

use std::time::Duration;

use crate::error::Result;

/// Shared HTTP client. Public tile and geocoding services require a user agent.
pub fn http_client(user_agent: &str) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(20))
        .build()?)
}
