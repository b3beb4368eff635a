use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

/// One KV pair in Consul's wire shape.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KvPair {
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(rename = "CreateIndex")]
    pub create_index: u64,
    #[serde(rename = "ModifyIndex")]
    pub modify_index: u64,
    #[serde(rename = "LockIndex")]
    pub lock_index: u64,
    #[serde(rename = "Flags")]
    pub flags: u64,
    #[serde(rename = "Value")]
    pub value: Option<String>,
}

#[derive(Deserialize)]
pub struct TokenQuery {
    pub token: Option<String>,
}

#[derive(Clone, Default)]
pub struct KvStore {
    entries: Arc<RwLock<HashMap<String, KvPair>>>,
    index: Arc<AtomicU64>,
    acl_token: Option<Uuid>,
}

impl KvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `?token=<acl_token>` on every KV request.
    pub fn with_acl(acl_token: Uuid) -> Self {
        Self {
            acl_token: Some(acl_token),
            ..Self::default()
        }
    }

    /// Store `value` under `key` as a PUT would.
    pub async fn insert(&self, key: &str, value: &[u8]) {
        let index = self.index.fetch_add(1, Ordering::SeqCst) + 1;
        let mut entries = self.entries.write().await;
        let create_index = entries.get(key).map_or(index, |e| e.create_index);
        let value = (!value.is_empty()).then(|| STANDARD.encode(value));
        entries.insert(
            key.to_string(),
            KvPair {
                key: key.to_string(),
                create_index,
                modify_index: index,
                lock_index: 0,
                flags: 0,
                value,
            },
        );
    }

    fn authorize(&self, query: &TokenQuery) -> Result<(), Response> {
        match self.acl_token {
            None => Ok(()),
            Some(expected) if query.token.as_deref() == Some(expected.to_string().as_str()) => Ok(()),
            Some(_) => Err((StatusCode::FORBIDDEN, "Permission denied").into_response()),
        }
    }
}

pub fn app() -> Router {
    app_with_store(KvStore::new())
}

pub fn app_with_store(store: KvStore) -> Router {
    Router::new()
        .route("/v1/kv/{*key}", get(get_key).put(put_key).delete(delete_key))
        .route("/v1/status/leader", get(leader))
        .with_state(store)
}

pub async fn run_with_store(listener: TcpListener, store: KvStore) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_store(store)).await
}

async fn leader() -> Json<&'static str> {
    Json("127.0.0.1:8300")
}

async fn get_key(
    State(store): State<KvStore>,
    Path(key): Path<String>,
    Query(query): Query<TokenQuery>,
) -> Result<Json<Vec<KvPair>>, Response> {
    store.authorize(&query)?;
    let entries = store.entries.read().await;
    entries
        .get(&key)
        .cloned()
        .map(|pair| Json(vec![pair]))
        .ok_or_else(|| StatusCode::NOT_FOUND.into_response())
}

async fn put_key(
    State(store): State<KvStore>,
    Path(key): Path<String>,
    Query(query): Query<TokenQuery>,
    body: Bytes,
) -> Result<Json<bool>, Response> {
    store.authorize(&query)?;
    store.insert(&key, &body).await;
    Ok(Json(true))
}

async fn delete_key(
    State(store): State<KvStore>,
    Path(key): Path<String>,
    Query(query): Query<TokenQuery>,
) -> Result<Json<bool>, Response> {
    store.authorize(&query)?;
    store.entries.write().await.remove(&key);
    Ok(Json(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kv_pair_serializes_with_consul_field_names() {
        let pair = KvPair {
            key: "test/test-key".to_string(),
            create_index: 1,
            modify_index: 2,
            lock_index: 0,
            flags: 0,
            value: Some("dGVzdC12YWx1ZQ==".to_string()),
        };
        let json = serde_json::to_value(&pair).unwrap();
        assert_eq!(json["Key"], "test/test-key");
        assert_eq!(json["ModifyIndex"], 2);
        assert_eq!(json["Value"], "dGVzdC12YWx1ZQ==");
    }

    #[test]
    fn empty_value_serializes_as_null() {
        let pair = KvPair {
            key: "k".to_string(),
            create_index: 1,
            modify_index: 1,
            lock_index: 0,
            flags: 0,
            value: None,
        };
        let json = serde_json::to_value(&pair).unwrap();
        assert!(json["Value"].is_null());
    }

    #[tokio::test]
    async fn insert_encodes_and_tracks_indexes() {
        let store = KvStore::new();
        store.insert("a", b"test-value").await;
        store.insert("a", b"second").await;
        let entries = store.entries.read().await;
        let pair = &entries["a"];
        assert_eq!(pair.value.as_deref(), Some("c2Vjb25k"));
        assert_eq!(pair.create_index, 1);
        assert_eq!(pair.modify_index, 2);
    }

    #[test]
    fn acl_rejects_wrong_token() {
        let token = Uuid::new_v4();
        let store = KvStore::with_acl(token);
        assert!(store.authorize(&TokenQuery { token: None }).is_err());
        assert!(store
            .authorize(&TokenQuery {
                token: Some("nope".to_string())
            })
            .is_err());
        assert!(store
            .authorize(&TokenQuery {
                token: Some(token.to_string())
            })
            .is_ok());
    }
}
