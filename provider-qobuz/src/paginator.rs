//! Paged collection assembly
//!
//! Paged endpoints answer `{ <key>: { "items": [...], "total": n } }`.
//! Listings are best effort: a page that fails ends the loop and whatever was
//! gathered so far is returned.

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::client::{CachingClient, RequestOptions};
use crate::error::Result;
use crate::types::Params;

pub struct Paginator {
    client: Arc<CachingClient>,
    page_size: u32,
}

impl Paginator {
    pub fn new(client: Arc<CachingClient>, page_size: u32) -> Self {
        Self {
            client,
            page_size: page_size.max(1),
        }
    }

    /// Raw items of the collection stored under `key`.
    ///
    /// With `limit == 0` every page is fetched; otherwise exactly one request
    /// for `limit` items from `offset` is made. Without a `checksum` the
    /// collection total is read live first and used as the freshness token,
    /// so a change in size invalidates cached pages.
    pub async fn fetch_all(
        &self,
        endpoint: &str,
        params: Params,
        key: &str,
        limit: u32,
        offset: u32,
        checksum: Option<String>,
    ) -> Result<Vec<Value>> {
        let checksum = match checksum {
            Some(checksum) => checksum,
            None => match self.probe_total(endpoint, &params, key).await? {
                Some(total) => total.to_string(),
                None => {
                    warn!(endpoint, key, "Could not read collection total, returning no items");
                    return Ok(Vec::new());
                }
            },
        };
        let options = RequestOptions::cached().with_checksum(checksum);

        if limit > 0 {
            let payload = self
                .client
                .get(endpoint, with_window(&params, limit, offset), &options)
                .await?;
            return Ok(payload
                .as_ref()
                .and_then(|p| page(p, key))
                .map(|(items, _)| items)
                .unwrap_or_default());
        }

        let mut items = Vec::new();
        let mut total: u64 = 1;
        let mut offset = 0u32;

        while (items.len() as u64) < total {
            let payload = self
                .client
                .get(endpoint, with_window(&params, self.page_size, offset), &options)
                .await?;

            let Some((page_items, page_total)) = payload.as_ref().and_then(|p| page(p, key)) else {
                error!(endpoint, key, offset, fetched = items.len(), "Failed to retrieve page, returning partial listing");
                break;
            };

            total = page_total;
            if page_items.is_empty() {
                debug!(endpoint, offset, total, "Empty page before reaching total");
                break;
            }

            items.extend(page_items);
            offset += self.page_size;
        }

        debug!(endpoint, key, count = items.len(), "Listing complete");
        Ok(items)
    }

    async fn probe_total(&self, endpoint: &str, params: &Params, key: &str) -> Result<Option<u64>> {
        let payload = self
            .client
            .get(endpoint, with_window(params, 1, 0), &RequestOptions::live())
            .await?;

        Ok(payload.as_ref().and_then(|p| p.get(key)?.get("total")?.as_u64()))
    }
}

fn with_window(params: &Params, limit: u32, offset: u32) -> Params {
    let mut params = params.clone();
    params.insert("limit".to_string(), limit.to_string());
    params.insert("offset".to_string(), offset.to_string());
    params
}

/// Items and reported total of one page; `None` when the key is absent
fn page(payload: &Value, key: &str) -> Option<(Vec<Value>, u64)> {
    let collection = payload.get(key)?;
    let items = collection
        .get("items")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let total = collection
        .get("total")
        .and_then(Value::as_u64)
        .unwrap_or(items.len() as u64);
    Some((items, total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::params;
    use serde_json::json;

    #[test]
    fn test_with_window_overrides_paging() {
        let base = params([("type", "albums"), ("limit", "5")]);
        let paged = with_window(&base, 200, 400);

        assert_eq!(paged["limit"], "200");
        assert_eq!(paged["offset"], "400");
        assert_eq!(paged["type"], "albums");
        assert_eq!(base["limit"], "5");
    }

    #[test]
    fn test_page_reads_items_and_total() {
        let payload = json!({"albums": {"items": [{"id": "a"}, {"id": "b"}], "total": 7}});
        let (items, total) = page(&payload, "albums").unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(total, 7);
    }

    #[test]
    fn test_page_missing_key() {
        assert!(page(&json!({"tracks": {}}), "albums").is_none());
    }

    #[test]
    fn test_page_without_total_uses_item_count() {
        let payload = json!({"tracks": {"items": [{"id": 1}]}});
        assert_eq!(page(&payload, "tracks").unwrap().1, 1);
    }
}
