use auth::*;
use keyring::mock;
use mocks::token_server;
use serial_test::serial;

fn clear_env() {
    for var in [
        ACCESS_TOKEN_ENV,
        REFRESH_TOKEN_ENV,
        CLIENT_ID_ENV,
        CLIENT_SECRET_ENV,
        TOKEN_URL_ENV,
    ] {
        std::env::remove_var(var);
    }
}

#[tokio::test]
#[serial]
async fn test_env_access_token_wins() {
    clear_env();
    std::env::set_var(ACCESS_TOKEN_ENV, "from_env");
    let token = obtain_access_token(1).await.unwrap();
    assert_eq!(token, "from_env");
    clear_env();
}

#[tokio::test]
#[serial]
async fn test_refresh_access_token() {
    clear_env();
    keyring::set_default_credential_builder(mock::default_credential_builder());
    std::env::set_var(REFRESH_TOKEN_ENV, "refresh");
    std::env::set_var(CLIENT_ID_ENV, "id");
    std::env::set_var(CLIENT_SECRET_ENV, "secret");

    let server = token_server("new_token");
    std::env::set_var(TOKEN_URL_ENV, server.url_str("/token"));

    let result = refresh_access_token().await;
    assert!(result.is_ok(), "Refresh token failed: {:?}", result.err());
    assert_eq!(result.unwrap(), "new_token");
    clear_env();
}

#[tokio::test]
#[serial]
async fn test_obtain_prefers_refresh_over_consent() {
    clear_env();
    keyring::set_default_credential_builder(mock::default_credential_builder());
    std::env::set_var(REFRESH_TOKEN_ENV, "refresh");
    std::env::set_var(CLIENT_ID_ENV, "id");
    std::env::set_var(CLIENT_SECRET_ENV, "secret");

    let server = token_server("refreshed");
    std::env::set_var(TOKEN_URL_ENV, server.url_str("/token"));

    assert_eq!(obtain_access_token(1).await.unwrap(), "refreshed");
    clear_env();
}

#[tokio::test]
#[serial]
async fn test_missing_client_credentials() {
    clear_env();
    std::env::set_var(REFRESH_TOKEN_ENV, "refresh");
    let err = refresh_access_token().await.unwrap_err();
    assert!(matches!(err, AuthError::MissingCredentials(_)));
    clear_env();
}
