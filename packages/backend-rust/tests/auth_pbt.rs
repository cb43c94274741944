//! Property-based checks for the HS256 token helpers.

use proptest::prelude::*;

use adaptiq_backend_rust::auth::{sign_jwt_for_user, verify_request_token};

proptest! {
    #[test]
    fn prop_jwt_roundtrip(
        user_id in "[a-zA-Z0-9_-]{1,32}",
        role in "(user|admin|teacher)",
    ) {
        std::env::set_var("JWT_SECRET", "pbt-secret");
        let token = sign_jwt_for_user(&user_id, &role).unwrap();
        let verified = verify_request_token(&token).unwrap();
        prop_assert_eq!(verified.id, user_id);
        prop_assert_eq!(verified.role, role);
    }

    #[test]
    fn prop_truncated_token_rejected(
        user_id in "[a-z0-9]{1,16}",
        cut in 1usize..20,
    ) {
        std::env::set_var("JWT_SECRET", "pbt-secret");
        let token = sign_jwt_for_user(&user_id, "user").unwrap();
        let truncated = &token[..token.len().saturating_sub(cut)];
        prop_assert!(verify_request_token(truncated).is_err());
    }
}
