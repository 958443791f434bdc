//! Property tests for token shape dispatch and caching.

mod common;

use std::sync::Arc;

use common::{CountingTokenProvider, SpyCache};
use proptest::prelude::*;
use sso_client::{SsoClient, SsoConfig};

fn client(provider: Arc<CountingTokenProvider>, cache: Arc<SpyCache>) -> SsoClient {
    SsoClient::builder(SsoConfig::from_server_url("https://sso.example.com"))
        .token_provider(provider)
        .cache_provider(cache)
        .build()
}

/// Non-empty tokens without a `.`.
fn arb_opaque_token() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_~+/=-]{1,64}"
}

/// Tokens with at least one `.` somewhere.
fn arb_jwt_shaped_token() -> impl Strategy<Value = String> {
    ("[A-Za-z0-9_=-]{0,32}", "[A-Za-z0-9_.=-]{0,32}")
        .prop_map(|(head, tail)| format!("{head}.{tail}"))
}

/// *For any* token containing `.`, `verify_access_token` SHALL take the JWT path
/// and never the bearer path; a token without `.` SHALL take the bearer path.
mod prop_shape_dispatch {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn jwt_shaped_tokens_use_jwt_path(token in arb_jwt_shaped_token()) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let provider = Arc::new(CountingTokenProvider::new(300));
            let sso = client(provider.clone(), Arc::new(SpyCache::default()));

            rt.block_on(sso.verify_access_token(&token)).unwrap();

            prop_assert_eq!(provider.jwt_calls(), 1);
            prop_assert_eq!(provider.bearer_calls(), 0);
        }

        #[test]
        fn opaque_tokens_use_bearer_path(token in arb_opaque_token()) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let provider = Arc::new(CountingTokenProvider::new(300));
            let sso = client(provider.clone(), Arc::new(SpyCache::default()));

            rt.block_on(sso.verify_access_token(&token)).unwrap();

            prop_assert_eq!(provider.bearer_calls(), 1);
            prop_assert_eq!(provider.jwt_calls(), 0);
        }

        #[test]
        fn opaque_id_tokens_are_rejected_before_provider(token in arb_opaque_token()) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let provider = Arc::new(CountingTokenProvider::new(300));
            let cache = Arc::new(SpyCache::default());
            let sso = client(provider.clone(), cache.clone());

            let err = rt.block_on(sso.verify_id_token(&token)).unwrap_err();

            prop_assert!(err.is_invalid_token());
            prop_assert_eq!(provider.total_verifications(), 0);
            prop_assert_eq!(cache.puts(), 0);
        }
    }
}

/// *For any* token, a second `verify_access_token` within the validity window
/// SHALL return the identical record without another provider call.
mod prop_cache_idempotence {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn repeated_verification_hits_cache(
            token in prop_oneof![arb_opaque_token(), arb_jwt_shaped_token()],
            repeats in 2usize..6,
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let provider = Arc::new(CountingTokenProvider::new(300));
            let sso = client(provider.clone(), Arc::new(SpyCache::default()));

            let first = rt.block_on(sso.verify_access_token(&token)).unwrap();
            for _ in 1..repeats {
                let again = rt.block_on(sso.verify_access_token(&token)).unwrap();
                prop_assert_eq!(&again, &first);
            }

            prop_assert_eq!(provider.total_verifications(), 1);
        }
    }
}
