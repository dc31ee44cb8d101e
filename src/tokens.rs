//! ERC-20 metadata cache

use crate::abi;
use crate::common::traits::{CasinoClient, ContractCall};
use crate::common::types::{ChainId, Token};
use crate::config::ChainConfig;
use crate::errors::{DecodeError, EngineError, EngineResult};
use ethers::types::Address;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use tracing::debug;

/// Token metadata per `(chain, address)`; entries never change once fetched
pub struct TokenCache {
    entries: Mutex<LruCache<(ChainId, Address), Token>>,
}

impl TokenCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn get(&self, chain_id: ChainId, address: Address) -> Option<Token> {
        self.entries
            .lock()
            .ok()
            .and_then(|mut entries| entries.get(&(chain_id, address)).cloned())
    }

    pub fn insert(&self, chain_id: ChainId, token: Token) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.put((chain_id, token.address), token);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cached metadata, or one batched `symbol()` + `decimals()` read
    pub async fn resolve<C: CasinoClient + ?Sized>(
        &self,
        client: &C,
        chain: &ChainConfig,
        address: Address,
    ) -> EngineResult<Token> {
        if address.is_zero() {
            return Ok(Token::native(chain.native_symbol.clone(), chain.native_decimals));
        }
        if let Some(token) = self.get(chain.chain_id, address) {
            return Ok(token);
        }

        debug!(chain_id = chain.chain_id, token = ?address, "Fetching token metadata");
        let answers = client
            .read_contracts(vec![
                ContractCall::new(address, abi::encode_symbol()),
                ContractCall::new(address, abi::encode_decimals()),
            ])
            .await?;
        let [symbol, decimals] = answers.as_slice() else {
            return Err(EngineError::Decode(DecodeError::Abi(
                "token metadata batch returned the wrong number of answers".to_string(),
            )));
        };
        let token = abi::decode_token_metadata(address, symbol, decimals)?;
        self.insert(chain.chain_id, token.clone());
        Ok(token)
    }
}

impl std::fmt::Debug for TokenCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCache").field("len", &self.len()).finish()
    }
}
